//! Score submission and tournament resolution.
//!
//! A submission writes the match row, the per-player counters and, when it
//! settles the tournament, the terminal effects, all in one transaction.
//! Announcements and achievement evaluation happen after the commit and are
//! best effort.

use arena_core::{game_point, judge, parse_score, MatchId, Outcome, Party, SeriesTally, Side};
use chrono::Utc;

use crate::announce::{self, Announcement};
use crate::auth::{Actor, Role};
use crate::ledger::ActionId;
use crate::model::{Match, Placement, Tournament, TournamentStatus};
use crate::state::State;
use crate::store::{CounterDelta, Resolution, ResultUpdate};
use crate::{achievements, Error};

/// What a recorded result amounted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    /// The result stands; the round waits for its other matches.
    Recorded,
    /// The series game stands and the series continues.
    SeriesContinues { tally: (u32, u32), needed: u32 },
    /// The result settled the tournament.
    Finished { winner: String },
}

/// Records the result of a match from free-text scores.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the scores are unacceptable, the match
/// cannot take a result or an database error occured.
pub async fn submit_result(
    state: &State,
    actor: &Actor,
    action: ActionId,
    match_id: MatchId,
    score_home: &str,
    score_away: &str,
    notes: Option<&str>,
) -> Result<Submission, Error> {
    actor.require(Role::Manager)?;

    if !state.ledger.try_claim(action) {
        return Err(Error::Duplicate);
    }

    match submit_inner(state, match_id, score_home, score_away, notes).await {
        Ok(submission) => Ok(submission),
        Err(err) => {
            state.ledger.release(action);
            Err(err)
        }
    }
}

async fn submit_inner(
    state: &State,
    match_id: MatchId,
    score_home: &str,
    score_away: &str,
    notes: Option<&str>,
) -> Result<Submission, Error> {
    let m = state
        .store
        .matches()
        .get(match_id)
        .await?
        .ok_or(Error::MatchNotFound(match_id))?;

    let tournament = state
        .store
        .tournaments()
        .get(m.tournament)
        .await?
        .ok_or(Error::TournamentNotFound(m.tournament))?;

    match tournament.status {
        TournamentStatus::InProgress => (),
        status if status.is_closed() => {
            return Err(Error::precondition(format!("the tournament is {}", status)));
        }
        _ => return Err(Error::precondition("the tournament is not running")),
    }

    if m.completed {
        return Err(Error::precondition("the match is already completed"));
    }

    let (home_party, away_party) = match m.slots {
        [Some(home), Some(away)] => (home, away),
        _ => return Err(Error::precondition("a bye has no result to record")),
    };

    let notes = match notes.map(str::trim) {
        Some(notes) if notes.len() > 1000 => {
            return Err(Error::validation(
                "the notes must be at most 1000 characters",
            ));
        }
        Some(notes) if !notes.is_empty() => Some(notes.to_owned()),
        _ => None,
    };

    let home = parse_score(score_home)?;
    let away = parse_score(score_away)?;

    let series = tournament.format.is_series()
        && crate::registry::enrollment_count(state, &tournament).await? == 2;

    if series {
        submit_series(state, &tournament, &m, home_party, away_party, (home, away), notes).await
    } else {
        submit_bracket(state, &tournament, &m, home_party, away_party, (home, away), notes).await
    }
}

/// Records one game of a duel series. The series tally is recomputed across
/// all completed games and settles the tournament at the needed cumulative
/// wins, whatever this game's own score was.
async fn submit_series(
    state: &State,
    tournament: &Tournament,
    m: &Match,
    home_party: Party,
    away_party: Party,
    score: (u32, u32),
    notes: Option<String>,
) -> Result<Submission, Error> {
    let mut tally = SeriesTally::new(tournament.format);

    let matches = state.store.matches().list(tournament.id).await?;
    for other in matches.iter().filter(|o| o.completed && o.id != m.id) {
        if let Some((home, away)) = other.score {
            tally.record_game(home, away);
        }
    }
    tally.record_game(score.0, score.1);

    let counters = game_point(score.0, score.1).and_then(|side| match side {
        Side::Home => counter_delta(home_party, away_party),
        Side::Away => counter_delta(away_party, home_party),
    });

    let decided = tally.winner().map(|side| match side {
        Side::Home => (home_party, away_party),
        Side::Away => (away_party, home_party),
    });

    let update = ResultUpdate {
        match_id: m.id,
        score,
        notes,
        counters,
        resolution: decided
            .map(|(winner, runner_up)| build_resolution(tournament, winner, Some(runner_up))),
    };

    state.store.apply_result(&update, Utc::now()).await?;

    match decided {
        Some((winner, _)) => {
            let winner = after_finish(state, tournament, winner).await;

            Ok(Submission::Finished { winner })
        }
        None => {
            let names = state.store.party_names(tournament.id).await?;

            state
                .announcer
                .send(Announcement::SeriesScore {
                    tournament: tournament.id,
                    home: announce::display_party(&names, home_party),
                    away: announce::display_party(&names, away_party),
                    tally: (tally.wins(Side::Home), tally.wins(Side::Away)),
                    needed: tally.needed(),
                })
                .await;

            Ok(Submission::SeriesContinues {
                tally: (tally.wins(Side::Home), tally.wins(Side::Away)),
                needed: tally.needed(),
            })
        }
    }
}

/// Records the result of a bracket match. A decisive result in a
/// single-match round is the final and settles the tournament.
async fn submit_bracket(
    state: &State,
    tournament: &Tournament,
    m: &Match,
    home_party: Party,
    away_party: Party,
    score: (u32, u32),
    notes: Option<String>,
) -> Result<Submission, Error> {
    let outcome = judge(tournament.format, score.0, score.1);

    let (counters, winner) = match outcome {
        Outcome::Decisive(Side::Home) => {
            (counter_delta(home_party, away_party), Some(home_party))
        }
        Outcome::Decisive(Side::Away) => {
            (counter_delta(away_party, home_party), Some(away_party))
        }
        Outcome::Undecided => (None, None),
    };

    let round_size = state
        .store
        .matches()
        .list_round(tournament.id, m.round)
        .await?
        .len();

    // A single-match round is the final by construction.
    let resolution = match winner {
        Some(winner) if round_size == 1 => {
            let runner_up = if winner == home_party {
                away_party
            } else {
                home_party
            };

            Some(build_resolution(tournament, winner, Some(runner_up)))
        }
        _ => None,
    };

    let resolved = resolution.as_ref().map(|resolution| resolution.winner);

    let update = ResultUpdate {
        match_id: m.id,
        score,
        notes,
        counters,
        resolution,
    };

    state.store.apply_result(&update, Utc::now()).await?;

    let names = state.store.party_names(tournament.id).await?;

    state
        .announcer
        .send(Announcement::ResultRecorded {
            tournament: tournament.id,
            match_id: m.id,
            home: announce::display_party(&names, home_party),
            away: announce::display_party(&names, away_party),
            score,
        })
        .await;

    match resolved {
        Some(winner) => {
            let winner = after_finish(state, tournament, winner).await;

            Ok(Submission::Finished { winner })
        }
        None => Ok(Submission::Recorded),
    }
}

/// Settles a tournament outside a result submission; used by the
/// round-advance path. Returns the winner's display name.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub(crate) async fn finish(
    state: &State,
    tournament: &Tournament,
    winner: Party,
    runner_up: Option<Party>,
) -> Result<String, Error> {
    let resolution = build_resolution(tournament, winner, runner_up);
    state.store.apply_resolution(&resolution).await?;

    Ok(after_finish(state, tournament, winner).await)
}

fn build_resolution(tournament: &Tournament, winner: Party, runner_up: Option<Party>) -> Resolution {
    let mut placements = vec![Placement {
        tournament: tournament.id,
        party: winner,
        place: 1,
    }];

    if let Some(runner_up) = runner_up {
        placements.push(Placement {
            tournament: tournament.id,
            party: runner_up,
            place: 2,
        });
    }

    Resolution {
        tournament: tournament.id,
        winner,
        placements,
    }
}

/// Post-commit effects of a settled tournament: the completion announcement
/// and achievement evaluation. Best effort, failures are logged. Returns
/// the winner's display name.
async fn after_finish(state: &State, tournament: &Tournament, winner: Party) -> String {
    log::info!("Tournament {} completed, winner: {}", tournament.id, winner);

    let display = match state.store.party_names(tournament.id).await {
        Ok(names) => announce::display_party(&names, winner),
        Err(err) => {
            log::error!("Failed to resolve display names: {}", err);
            winner.to_string()
        }
    };

    state
        .announcer
        .send(Announcement::Completed {
            tournament: tournament.id,
            name: tournament.name.clone(),
            winner: display.clone(),
        })
        .await;

    if let Party::Player(player) = winner {
        if let Err(err) = achievements::evaluate(state, player).await {
            log::error!(
                "Failed to evaluate achievements for player {}: {}",
                player,
                err
            );
        }
    }

    display
}

fn counter_delta(winner: Party, loser: Party) -> Option<CounterDelta> {
    Some(CounterDelta {
        winner: winner.player()?,
        loser: loser.player()?,
    })
}
