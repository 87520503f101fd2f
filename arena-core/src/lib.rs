//! # arena-core
//!
//! The engine behind the arena tournament system: judging submitted scores,
//! tallying duel series, pairing parties into single elimination rounds and
//! advancing winners until a champion remains.
//!
//! Important types:
//! - [`Party`]: a single bracket entry, either a lone player or a team.
//! - [`MatchFormat`]: the best-of-N format and the win count it requires.
//! - [`Outcome`]: the judgement of a single submitted score pair.
//! - [`SeriesTally`]: the running game-win tally of a two-party series.
//! - [`SeedPlan`] and [`Advance`]: the opening round of a tournament and the
//!   transition from a finished round to the next one.
//!
//! The crate is pure: it never touches storage or the clock. Callers feed it
//! the current round and persist whatever it returns.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to the id and party types.

pub mod bracket;
pub mod format;
pub mod resolve;

pub use bracket::{advance, seed, Advance, Pair, RoundMatch, RoundName, SeedPlan};
pub use format::MatchFormat;
pub use resolve::{game_point, judge, parse_score, Outcome, SeriesTally, Side};

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A `Result` with [`enum@Error`] as its error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The error returned when an engine rule is violated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A submitted score was not a non-negative integer.
    #[error("invalid score `{0}`: expected a non-negative integer")]
    InvalidScore(String),
    /// A round cannot be built from fewer than two parties.
    #[error("not enough parties: found {0}, need at least 2")]
    NotEnoughParties(usize),
    /// A round cannot advance while some of its matches are unfinished.
    #[error("{0} matches in the round are still unfinished")]
    UnfinishedMatches(usize),
}

macro_rules! id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[repr(transparent)]
        pub struct $name(pub i64);

        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl PartialEq<i64> for $name {
            #[inline]
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl FromStr for $name {
            type Err = <i64 as FromStr>::Err;

            #[inline]
            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

id! {
    /// The unique id of a player.
    PlayerId
}

id! {
    /// The unique id of a team within a tournament.
    TeamId
}

id! {
    /// The unique id of a tournament.
    TournamentId
}

id! {
    /// The unique id of a single match.
    MatchId
}

/// A single competing entry in a tournament.
///
/// A tournament only ever fields one of the two variants: individual
/// tournaments contain [`Player`] parties, team tournaments contain [`Team`]
/// parties. All engine operations consume parties uniformly and never care
/// which variant they hold.
///
/// [`Player`]: Party::Player
/// [`Team`]: Party::Team
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Party {
    Player(PlayerId),
    Team(TeamId),
}

impl Party {
    /// Returns the raw id of the player or team behind this party.
    #[inline]
    pub fn id(&self) -> i64 {
        match self {
            Self::Player(id) => id.0,
            Self::Team(id) => id.0,
        }
    }

    /// Returns the player id if this party is a player.
    #[inline]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Player(id) => Some(*id),
            Self::Team(_) => None,
        }
    }

    /// Splits the party into a storable `(kind, id)` pair.
    #[inline]
    pub fn into_parts(self) -> (u8, i64) {
        match self {
            Self::Player(id) => (0, id.0),
            Self::Team(id) => (1, id.0),
        }
    }

    /// Rebuilds a party from a stored `(kind, id)` pair.
    ///
    /// Returns `None` if `kind` is not a known party kind.
    #[inline]
    pub fn from_parts(kind: u8, id: i64) -> Option<Self> {
        match kind {
            0 => Some(Self::Player(PlayerId(id))),
            1 => Some(Self::Team(TeamId(id))),
            _ => None,
        }
    }
}

impl Display for Party {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(id) => write!(f, "player {}", id),
            Self::Team(id) => write!(f, "team {}", id),
        }
    }
}
