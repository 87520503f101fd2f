//! Record types shared across the service modules.

use arena_core::{MatchFormat, MatchId, Party, PlayerId, RoundMatch, TeamId, TournamentId};
use chrono::{DateTime, Utc};

/// The two enrollment models a tournament can use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TournamentKind {
    /// Lone players fill the bracket.
    Individual,
    /// Two fixed-size teams face each other.
    Team,
}

impl TournamentKind {
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Individual => 0,
            Self::Team => 1,
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Individual),
            1 => Some(Self::Team),
            _ => None,
        }
    }
}

/// The lifecycle state of a tournament.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TournamentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    InProgress,
    Completed,
}

impl TournamentStatus {
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
            Self::Cancelled => 3,
            Self::InProgress => 4,
            Self::Completed => 5,
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            3 => Some(Self::Cancelled),
            4 => Some(Self::InProgress),
            5 => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns `true` if the state is terminal and the tournament can no
    /// longer change.
    #[inline]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        };

        f.write_str(s)
    }
}

/// A tournament row.
#[derive(Clone, Debug)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub kind: TournamentKind,
    /// The game or discipline played; achievement evaluation matches on it.
    pub discipline: Option<String>,
    /// Free-form rule text.
    pub rules: Option<String>,
    pub format: MatchFormat,
    pub entry_fee: u32,
    /// Maximum players for individual tournaments; players per side for team
    /// tournaments, which always field exactly two sides.
    pub capacity: u32,
    pub scheduled_at: DateTime<Utc>,
    pub created_by: PlayerId,
    pub status: TournamentStatus,
    /// The reason recorded when the tournament was rejected or cancelled.
    pub status_reason: Option<String>,
    pub approved_by: Option<PlayerId>,
    pub winner: Option<Party>,
    pub started: bool,
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

/// The fields required to create a tournament. The row starts out pending.
#[derive(Clone, Debug)]
pub struct NewTournament {
    pub name: String,
    pub kind: TournamentKind,
    pub discipline: Option<String>,
    pub rules: Option<String>,
    pub format: MatchFormat,
    pub entry_fee: u32,
    pub capacity: u32,
    pub scheduled_at: DateTime<Utc>,
    pub created_by: PlayerId,
}

/// A single match row.
#[derive(Clone, Debug)]
pub struct Match {
    pub id: MatchId,
    pub tournament: TournamentId,
    pub round: u32,
    /// The parties in the two slots. A single occupied slot is a bye.
    pub slots: [Option<Party>; 2],
    pub score: Option<(u32, u32)>,
    pub completed: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Returns `true` if this match is a bye record.
    #[inline]
    pub fn is_bye(&self) -> bool {
        matches!(self.slots, [Some(_), None] | [None, Some(_)])
    }

    /// Returns the engine view of this match.
    #[inline]
    pub fn to_round_match(&self) -> RoundMatch {
        RoundMatch {
            slots: self.slots,
            score: self.score,
            completed: self.completed,
        }
    }
}

/// The fields required to create a match row. Scores are always absent at
/// creation; bye records are created already completed.
#[derive(Clone, Debug)]
pub struct NewMatch {
    pub round: u32,
    pub slots: [Option<Party>; 2],
    pub completed: bool,
}

/// A player row with lifetime aggregates.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
}

/// A player identity as the chat adapter supplies it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub name: String,
}

impl PlayerProfile {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A team within one tournament.
#[derive(Clone, Debug)]
pub struct Team {
    pub id: TeamId,
    pub tournament: TournamentId,
    pub name: String,
    pub captain: PlayerId,
    pub members: Vec<PlayerId>,
    pub created_at: DateTime<Utc>,
}

/// A final placement of a party in a tournament.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub tournament: TournamentId,
    pub party: Party,
    pub place: u8,
}

/// An entry of the achievement catalog.
#[derive(Clone, Debug)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// An achievement a player holds, with the grant date.
#[derive(Clone, Debug)]
pub struct EarnedAchievement {
    pub name: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
}

/// A disciplinary record against a player.
#[derive(Clone, Debug)]
pub struct Penalty {
    pub reason: String,
    pub issued_by: PlayerId,
    pub created_at: DateTime<Utc>,
}
