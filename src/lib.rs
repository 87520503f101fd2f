//! # arena-bot
//!
//! The service side of the arena tournament system. The pure rules live in
//! [`arena_core`]; this crate wires them to storage, the clock and the
//! outside world:
//!
//! - [`lifecycle`]: the tournament state machine and the scheduled sweep.
//! - [`registry`]: enrollment of players and teams.
//! - [`results`]: score submission and tournament resolution.
//! - [`rollback`]: undoing a result, cascading over later rounds.
//! - [`stats`] and [`achievements`]: aggregate player records.
//! - [`store`]: the SQLite persistence layer.
//! - [`announce`]: dispatch of structured announcements to the rendering
//!   collaborator.
//!
//! The chat platform adapter is not part of this crate. It calls into the
//! modules above with the actor's identity and pre-computed [`auth::Role`],
//! and receives [`announce::Announcement`] values to render.

pub mod achievements;
pub mod announce;
pub mod auth;
pub mod config;
pub mod ledger;
pub mod lifecycle;
pub mod logger;
pub mod model;
pub mod registry;
pub mod results;
pub mod rollback;
pub mod state;
pub mod stats;
pub mod store;

pub use config::Config;
pub use state::State;

use arena_core::{MatchId, TournamentId};

use thiserror::Error;

/// A `Result` with [`enum@Error`] as its error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type of all service operations.
///
/// The variants separate what the caller should do with the failure: report
/// bad input, report an unmet precondition, or treat it as an internal
/// fault and log the cause.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is unacceptable as such; nothing was written.
    #[error("{0}")]
    Validation(String),
    /// The system is not in a state that allows the operation.
    #[error("{0}")]
    Precondition(String),
    /// The actor lacks the role the operation requires.
    #[error("you are not allowed to perform this action")]
    PermissionDenied,
    /// The action id was already processed; the operation did nothing.
    #[error("this action was already processed")]
    Duplicate,
    #[error("tournament {0} does not exist")]
    TournamentNotFound(TournamentId),
    #[error("match {0} does not exist")]
    MatchNotFound(MatchId),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Returns `true` if the error is an answer for the requesting actor
    /// rather than an internal fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Precondition(_)
                | Self::PermissionDenied
                | Self::Duplicate
                | Self::TournamentNotFound(_)
                | Self::MatchNotFound(_)
        )
    }
}

impl From<arena_core::Error> for Error {
    fn from(err: arena_core::Error) -> Self {
        match err {
            arena_core::Error::InvalidScore(_) => Self::Validation(err.to_string()),
            arena_core::Error::NotEnoughParties(_) | arena_core::Error::UnfinishedMatches(_) => {
                Self::Precondition(err.to_string())
            }
        }
    }
}
