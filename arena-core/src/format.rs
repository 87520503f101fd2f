//! Match formats and the win counts they require.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The best-of-N format of a tournament.
///
/// The format decides how many game wins a party needs before a match (or a
/// duel series) is over: best-of-N is taken at `(N + 1) / 2` game wins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchFormat {
    BestOf1,
    BestOf3,
    BestOf5,
    BestOf7,
}

impl MatchFormat {
    /// Returns the number of game wins required to take the match.
    #[inline]
    pub const fn wins_needed(self) -> u32 {
        match self {
            Self::BestOf1 => 1,
            Self::BestOf3 => 2,
            Self::BestOf5 => 3,
            Self::BestOf7 => 4,
        }
    }

    /// Returns the maximum number of games a series of this format can span.
    #[inline]
    pub const fn series_len(self) -> u32 {
        self.wins_needed() * 2 - 1
    }

    /// Returns `true` if the format takes more than one game to decide.
    #[inline]
    pub const fn is_series(self) -> bool {
        !matches!(self, Self::BestOf1)
    }

    /// Returns the storable representation of the format.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::BestOf1 => 1,
            Self::BestOf3 => 3,
            Self::BestOf5 => 5,
            Self::BestOf7 => 7,
        }
    }

    /// Rebuilds a format from its stored representation.
    ///
    /// Returns `None` if `value` does not name a known format.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::BestOf1),
            3 => Some(Self::BestOf3),
            5 => Some(Self::BestOf5),
            7 => Some(Self::BestOf7),
            _ => None,
        }
    }
}

impl Display for MatchFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BO{}", self.to_u8())
    }
}

/// The error returned when parsing an unknown match format.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown match format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for MatchFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BO1" => Ok(Self::BestOf1),
            "BO3" => Ok(Self::BestOf3),
            "BO5" => Ok(Self::BestOf5),
            "BO7" => Ok(Self::BestOf7),
            _ => Err(UnknownFormat(s.to_owned())),
        }
    }
}
