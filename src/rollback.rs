//! Undoing recorded results.
//!
//! An undo resets the match and deletes every later-round match, since
//! those were drawn from a winner that no longer stands. Counter effects of
//! everything deleted or reset are reversed; placements and the champion are
//! cleared when the tournament had already resolved. Achievements stay
//! granted.

use arena_core::{game_point, judge, MatchFormat, MatchId, Side};

use crate::announce::Announcement;
use crate::auth::{Actor, Role};
use crate::model::{Match, TournamentStatus};
use crate::state::State;
use crate::store::{CounterDelta, UndoUpdate};
use crate::{registry, Error};

/// The outcome of an undo request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Undo {
    /// The result was voided. `deleted` later-round matches went with it;
    /// `reopened` is set when the tournament returned to in progress.
    Voided { deleted: usize, reopened: bool },
    /// Later rounds exist and `confirmed` was not set; nothing changed.
    /// Repeating the call confirmed deletes the later matches as well.
    ConfirmationRequired { later_matches: usize },
}

/// Undoes the recorded result of a match.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the match has nothing to undo or an
/// database error occured.
pub async fn undo(
    state: &State,
    actor: &Actor,
    match_id: MatchId,
    confirmed: bool,
) -> Result<Undo, Error> {
    actor.require(Role::Admin)?;

    let m = state
        .store
        .matches()
        .get(match_id)
        .await?
        .ok_or(Error::MatchNotFound(match_id))?;

    if !m.completed {
        return Err(Error::precondition("the match has no recorded result"));
    }

    if m.to_round_match().is_bye() {
        return Err(Error::precondition("a bye has no result to undo"));
    }

    let tournament = state
        .store
        .tournaments()
        .get(m.tournament)
        .await?
        .ok_or(Error::TournamentNotFound(m.tournament))?;

    match tournament.status {
        TournamentStatus::InProgress | TournamentStatus::Completed => (),
        _ => return Err(Error::precondition("the tournament is closed")),
    }

    let all = state.store.matches().list(m.tournament).await?;
    let later: Vec<&Match> = all.iter().filter(|other| other.round > m.round).collect();

    if !later.is_empty() && !confirmed {
        return Ok(Undo::ConfirmationRequired {
            later_matches: later.len(),
        });
    }

    let series = tournament.format.is_series()
        && registry::enrollment_count(state, &tournament).await? == 2;

    // The reset match and every deleted match give back what they counted.
    let mut reversals = Vec::new();
    for target in later.iter().copied().chain([&m]) {
        if let Some(delta) = reversal(target, tournament.format, series) {
            reversals.push(delta);
        }
    }

    let reopen = tournament.status == TournamentStatus::Completed;

    let update = UndoUpdate {
        match_id,
        tournament: m.tournament,
        round: m.round,
        reversals,
        reopen,
    };

    state.store.apply_undo(&update).await?;

    log::info!(
        "Result of match {} undone, {} later matches deleted",
        match_id,
        later.len()
    );

    state
        .announcer
        .send(Announcement::ResultVoided {
            tournament: m.tournament,
            match_id,
        })
        .await;

    Ok(Undo::Voided {
        deleted: later.len(),
        reopened: reopen,
    })
}

/// Recomputes the counter effect a match had when it was recorded.
///
/// Series games count their plain game winner, bracket matches their
/// decisive side; team matches and undecided results counted nothing.
fn reversal(m: &Match, format: MatchFormat, series: bool) -> Option<CounterDelta> {
    if !m.completed {
        return None;
    }

    let (home_party, away_party) = match m.slots {
        [Some(home), Some(away)] => (home, away),
        _ => return None,
    };

    let (home, away) = m.score?;

    let side = if series {
        game_point(home, away)?
    } else {
        judge(format, home, away).winner()?
    };

    let (winner, loser) = match side {
        Side::Home => (home_party, away_party),
        Side::Away => (away_party, home_party),
    };

    Some(CounterDelta {
        winner: winner.player()?,
        loser: loser.player()?,
    })
}
