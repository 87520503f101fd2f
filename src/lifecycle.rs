//! The tournament state machine and the scheduled sweep.
//!
//! A tournament moves `Pending -> Approved -> InProgress -> Completed`, with
//! the side exits `Pending -> Rejected` and `* -> Cancelled` for anything
//! not yet completed. Play itself is driven by [`next_match`] and by the
//! sweep, which auto-starts due tournaments and cancels under-enrolled
//! ones.

use arena_core::{advance, seed, Advance, MatchFormat, SeedPlan, SeriesTally, Side, TournamentId};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

use crate::announce::{self, Announcement, BracketView, PairingView};
use crate::auth::{Actor, Role};
use crate::ledger::ActionId;
use crate::model::{Match, NewMatch, NewTournament, Tournament, TournamentKind, TournamentStatus};
use crate::state::State;
use crate::{registry, results, Error};

/// Upper bound on the bracket of an individual tournament.
pub const MAX_BRACKET_CAPACITY: u32 = 128;

/// Upper bound on the roster of one team tournament side.
pub const MAX_TEAM_SIZE: u32 = 16;

/// A tournament proposal as submitted by a member.
#[derive(Clone, Debug)]
pub struct Proposal {
    pub name: String,
    pub kind: ProposalKind,
    pub discipline: Option<String>,
    pub rules: Option<String>,
    pub format: MatchFormat,
    pub entry_fee: u32,
    pub scheduled_at: DateTime<Utc>,
}

/// The enrollment model of a proposal with its size parameter.
#[derive(Copy, Clone, Debug)]
pub enum ProposalKind {
    /// Up to `capacity` lone players fill the bracket.
    Individual { capacity: u32 },
    /// Two teams of exactly `players_per_side` players each.
    Team { players_per_side: u32 },
}

/// What a successful draw produced.
#[derive(Clone, Debug)]
pub enum Progress {
    /// The tournament started and the opening round was drawn.
    Started(BracketView),
    /// A finished round produced the next one.
    Round {
        label: String,
        pairings: Vec<PairingView>,
    },
    /// A single winner remained and the tournament resolved.
    Finished { winner: String },
}

/// Submits a new tournament for moderation and returns its id.
///
/// The creator is registered as a player as a side effect.
///
/// # Errors
///
/// Returns an [`enum@Error`] when validation fails or an database error
/// occured.
pub async fn propose(
    state: &State,
    actor: &Actor,
    action: ActionId,
    proposal: Proposal,
) -> Result<TournamentId, Error> {
    if !state.ledger.try_claim(action) {
        return Err(Error::Duplicate);
    }

    match propose_inner(state, actor, proposal).await {
        Ok(id) => Ok(id),
        Err(err) => {
            state.ledger.release(action);
            Err(err)
        }
    }
}

async fn propose_inner(
    state: &State,
    actor: &Actor,
    proposal: Proposal,
) -> Result<TournamentId, Error> {
    let now = Utc::now();

    let name = proposal.name.trim();
    if name.len() < 3 || name.len() > 100 {
        return Err(Error::validation(
            "the name must be between 3 and 100 characters",
        ));
    }

    let discipline = match proposal.discipline.as_deref().map(str::trim) {
        Some(discipline) if discipline.len() < 2 || discipline.len() > 50 => {
            return Err(Error::validation(
                "the discipline must be between 2 and 50 characters",
            ));
        }
        Some(discipline) => Some(discipline.to_owned()),
        None => None,
    };

    let rules = match proposal.rules.as_deref().map(str::trim) {
        Some(rules) if rules.len() < 10 || rules.len() > 1000 => {
            return Err(Error::validation(
                "the rules must be between 10 and 1000 characters",
            ));
        }
        Some(rules) => Some(rules.to_owned()),
        None => None,
    };

    let (kind, capacity) = match proposal.kind {
        ProposalKind::Individual { capacity } => {
            if !(2..=MAX_BRACKET_CAPACITY).contains(&capacity) {
                return Err(Error::validation(format!(
                    "the capacity must be between 2 and {} players",
                    MAX_BRACKET_CAPACITY
                )));
            }

            (TournamentKind::Individual, capacity)
        }
        ProposalKind::Team { players_per_side } => {
            if !(1..=MAX_TEAM_SIZE).contains(&players_per_side) {
                return Err(Error::validation(format!(
                    "a side must have between 1 and {} players",
                    MAX_TEAM_SIZE
                )));
            }

            (TournamentKind::Team, players_per_side)
        }
    };

    if proposal.scheduled_at <= now {
        return Err(Error::validation("the start must lie in the future"));
    }

    state.store.players().ensure(&actor.profile).await?;

    let id = state
        .store
        .tournaments()
        .insert(
            &NewTournament {
                name: name.to_owned(),
                kind,
                discipline,
                rules,
                format: proposal.format,
                entry_fee: proposal.entry_fee,
                capacity,
                scheduled_at: proposal.scheduled_at,
                created_by: actor.profile.id,
            },
            now,
        )
        .await?;

    log::info!("Tournament {} proposed by {}", id, actor.profile.name);

    state
        .announcer
        .send(Announcement::ReviewRequested {
            tournament: id,
            name: name.to_owned(),
        })
        .await;

    Ok(id)
}

/// Approves a pending tournament and opens it for enrollment.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the tournament is not pending or an
/// database error occured.
pub async fn approve(state: &State, actor: &Actor, id: TournamentId) -> Result<(), Error> {
    actor.require(Role::Manager)?;

    let tournament = fetch(state, id).await?;

    match tournament.status {
        TournamentStatus::Pending => (),
        TournamentStatus::Approved => {
            return Err(Error::precondition("the tournament is already approved"));
        }
        _ => {
            return Err(Error::precondition(
                "only pending tournaments can be approved",
            ));
        }
    }

    state.store.tournaments().approve(id, actor.profile.id).await?;

    state
        .announcer
        .send(Announcement::Published {
            tournament: id,
            name: tournament.name,
            scheduled_at: tournament.scheduled_at,
        })
        .await;

    Ok(())
}

/// Rejects a pending tournament with a reason.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the tournament is not pending, the reason
/// is unacceptable or an database error occured.
pub async fn reject(
    state: &State,
    actor: &Actor,
    id: TournamentId,
    reason: &str,
) -> Result<(), Error> {
    actor.require(Role::Manager)?;

    let reason = validate_reason(reason)?;
    let tournament = fetch(state, id).await?;

    if tournament.status != TournamentStatus::Pending {
        return Err(Error::precondition(
            "only pending tournaments can be rejected",
        ));
    }

    state
        .store
        .tournaments()
        .close(id, TournamentStatus::Rejected, reason)
        .await?;

    state
        .announcer
        .send(Announcement::Rejected {
            tournament: id,
            name: tournament.name,
            reason: reason.to_owned(),
        })
        .await;

    Ok(())
}

/// Cancels a tournament that has not completed yet.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the tournament is already closed, the
/// reason is unacceptable or an database error occured.
pub async fn cancel(
    state: &State,
    actor: &Actor,
    id: TournamentId,
    reason: &str,
) -> Result<(), Error> {
    actor.require(Role::Manager)?;

    let reason = validate_reason(reason)?;
    let tournament = fetch(state, id).await?;

    match tournament.status {
        TournamentStatus::Completed => {
            return Err(Error::precondition(
                "a completed tournament cannot be cancelled",
            ));
        }
        TournamentStatus::Cancelled | TournamentStatus::Rejected => {
            return Err(Error::precondition("the tournament is already closed"));
        }
        _ => (),
    }

    state
        .store
        .tournaments()
        .close(id, TournamentStatus::Cancelled, reason)
        .await?;

    log::info!("Tournament {} cancelled: {}", id, reason);

    state
        .announcer
        .send(Announcement::Cancelled {
            tournament: id,
            name: tournament.name,
            reason: reason.to_owned(),
        })
        .await;

    Ok(())
}

/// Moves the scheduled start of a tournament that has not started yet.
///
/// Re-arms the starting-soon notice for the new time.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the tournament already started or closed,
/// the date is not in the future or an database error occured.
pub async fn reschedule(
    state: &State,
    actor: &Actor,
    id: TournamentId,
    date: DateTime<Utc>,
) -> Result<(), Error> {
    actor.require(Role::Manager)?;

    if date <= Utc::now() {
        return Err(Error::validation("the new start must lie in the future"));
    }

    let tournament = fetch(state, id).await?;

    match tournament.status {
        TournamentStatus::Pending | TournamentStatus::Approved => (),
        TournamentStatus::InProgress => {
            return Err(Error::precondition("the tournament has already started"));
        }
        _ => return Err(Error::precondition("the tournament is closed")),
    }

    state.store.tournaments().reschedule(id, date).await?;

    state
        .announcer
        .send(Announcement::Rescheduled {
            tournament: id,
            name: tournament.name,
            scheduled_at: date,
        })
        .await;

    Ok(())
}

/// Draws the next round of the tournament.
///
/// On a tournament that never started this is the start itself. On a
/// running bracket the current round must be fully completed; its winners
/// pair into the next round, or resolve the tournament when one winner
/// remains. On a running duel series this reports the outstanding games
/// instead.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the draw is not possible yet or an
/// database error occured.
pub async fn next_match(
    state: &State,
    actor: &Actor,
    action: ActionId,
    id: TournamentId,
) -> Result<Progress, Error> {
    actor.require(Role::Manager)?;

    if !state.ledger.try_claim(action) {
        return Err(Error::Duplicate);
    }

    match next_match_inner(state, id).await {
        Ok(progress) => Ok(progress),
        Err(err) => {
            state.ledger.release(action);
            Err(err)
        }
    }
}

async fn next_match_inner(state: &State, id: TournamentId) -> Result<Progress, Error> {
    let tournament = fetch(state, id).await?;
    let now = Utc::now();

    match tournament.status {
        // Drawing the first round doubles as the start.
        TournamentStatus::Approved => {
            let bracket = start(state, &tournament, now).await?;
            return Ok(Progress::Started(bracket));
        }
        TournamentStatus::InProgress => (),
        TournamentStatus::Pending => {
            return Err(Error::precondition(
                "the tournament has not been approved yet",
            ));
        }
        _ => return Err(Error::precondition("the tournament is closed")),
    }

    if tournament.format.is_series() && registry::enrollment_count(state, &tournament).await? == 2 {
        return next_series(state, &tournament).await;
    }

    let round = state.store.matches().max_round(id).await?;
    let matches = state.store.matches().list_round(id, round).await?;
    let round_matches: Vec<_> = matches.iter().map(Match::to_round_match).collect();

    match advance(&round_matches, tournament.format)? {
        Advance::NextRound(pairs) => {
            let entries: Vec<NewMatch> = pairs
                .into_iter()
                .map(|pair| NewMatch {
                    round: round + 1,
                    completed: pair.is_bye(),
                    slots: [Some(pair.home), pair.away],
                })
                .collect();

            state.store.apply_round(id, &entries, false, now).await?;

            let names = state.store.party_names(id).await?;
            let all = state.store.matches().list(id).await?;

            let view = match announce::round_views(&all, &names).pop() {
                Some(view) => view,
                None => return Err(Error::precondition("there is nothing to draw")),
            };

            state
                .announcer
                .send(Announcement::RoundAdvanced {
                    tournament: id,
                    name: tournament.name.clone(),
                    round: view.label.clone(),
                    pairings: view.pairings.clone(),
                })
                .await;

            Ok(Progress::Round {
                label: view.label,
                pairings: view.pairings,
            })
        }
        Advance::Complete(winner) => {
            let winner = results::finish(state, &tournament, winner, None).await?;

            Ok(Progress::Finished { winner })
        }
        Advance::NoWinners => Err(Error::precondition(
            "no match of the current round produced a winner",
        )),
    }
}

/// Checks a running duel series instead of advancing rounds: all games live
/// in round 1 and the series ends at the needed cumulative wins.
async fn next_series(state: &State, tournament: &Tournament) -> Result<Progress, Error> {
    let matches = state.store.matches().list(tournament.id).await?;

    let (home, away) = match matches.first().map(|m| m.slots) {
        Some([Some(home), Some(away)]) => (home, away),
        _ => return Err(Error::precondition("the series has no games")),
    };

    let mut tally = SeriesTally::new(tournament.format);
    for m in matches.iter().filter(|m| m.completed) {
        if let Some((home, away)) = m.score {
            tally.record_game(home, away);
        }
    }

    match tally.winner() {
        Some(side) => {
            // Submission normally resolves the series; finishing here picks
            // up a series left decided but unresolved.
            let (winner, runner_up) = match side {
                Side::Home => (home, away),
                Side::Away => (away, home),
            };

            let winner = results::finish(state, tournament, winner, Some(runner_up)).await?;

            Ok(Progress::Finished { winner })
        }
        None => {
            let remaining = matches.iter().filter(|m| !m.completed).count();

            Err(Error::precondition(format!(
                "the {} series is still undecided, {} games remain",
                tournament.format, remaining
            )))
        }
    }
}

/// Seeds round 1 from the enrolled parties and flips the tournament to in
/// progress. The enrolled order is shuffled before pairing.
async fn start(
    state: &State,
    tournament: &Tournament,
    now: DateTime<Utc>,
) -> Result<BracketView, Error> {
    let mut parties = registry::parties(state, tournament).await?;
    parties.shuffle(&mut OsRng);

    let entries: Vec<NewMatch> = match seed(&parties, tournament.format)? {
        SeedPlan::Bracket(pairs) => pairs
            .into_iter()
            .map(|pair| NewMatch {
                round: 1,
                completed: pair.is_bye(),
                slots: [Some(pair.home), pair.away],
            })
            .collect(),
        SeedPlan::Series { home, away, games } => (0..games)
            .map(|_| NewMatch {
                round: 1,
                completed: false,
                slots: [Some(home), Some(away)],
            })
            .collect(),
    };

    state
        .store
        .apply_round(tournament.id, &entries, true, now)
        .await?;

    log::info!(
        "Tournament {} started with {} parties",
        tournament.id,
        parties.len()
    );

    let bracket = announce::bracket_view(&state.store, tournament).await?;

    state
        .announcer
        .send(Announcement::Started {
            bracket: bracket.clone(),
        })
        .await;

    Ok(bracket)
}

/// Spawns the periodic sweep task.
pub fn spawn_sweeper(state: State) {
    tokio::task::spawn(async move {
        let mut interval = tokio::time::interval(state.config.scheduler.interval());

        loop {
            interval.tick().await;
            sweep(&state, Utc::now()).await;
        }
    });
}

/// One sweep tick over all approved tournaments.
///
/// Failures are logged per tournament and never stop the sweep.
pub async fn sweep(state: &State, now: DateTime<Utc>) {
    let tournaments = match state.store.tournaments().list_approved().await {
        Ok(tournaments) => tournaments,
        Err(err) => {
            log::error!("Failed to list tournaments for the sweep: {}", err);
            return;
        }
    };

    for tournament in &tournaments {
        if let Err(err) = sweep_one(state, tournament, now).await {
            log::error!("Failed to sweep tournament {}: {}", tournament.id, err);
        }
    }
}

/// The checks of one sweep tick for one tournament, in priority order. At
/// most one action fires per tick.
async fn sweep_one(state: &State, tournament: &Tournament, now: DateTime<Utc>) -> Result<(), Error> {
    if tournament.started {
        return Ok(());
    }

    // Close under-enrolled tournaments early instead of waiting for a start
    // that cannot happen.
    if now >= tournament.scheduled_at - state.config.scheduler.cancel_lead()
        && registry::enrollment_count(state, tournament).await? < 2
    {
        return cancel_underenrolled(state, tournament).await;
    }

    if !tournament.notified
        && now < tournament.scheduled_at
        && now >= tournament.scheduled_at - state.config.scheduler.notify_lead()
    {
        // Flag first: a crash after the flag loses one notice, the other
        // order would repeat it every tick.
        state.store.tournaments().set_notified(tournament.id).await?;

        state
            .announcer
            .send(Announcement::StartingSoon {
                tournament: tournament.id,
                name: tournament.name.clone(),
                scheduled_at: tournament.scheduled_at,
            })
            .await;

        return Ok(());
    }

    if now >= tournament.scheduled_at {
        if registry::enrollment_count(state, tournament).await? < 2 {
            return cancel_underenrolled(state, tournament).await;
        }

        start(state, tournament, now).await?;
    }

    Ok(())
}

async fn cancel_underenrolled(state: &State, tournament: &Tournament) -> Result<(), Error> {
    let reason = "insufficient participants";

    state
        .store
        .tournaments()
        .close(tournament.id, TournamentStatus::Cancelled, reason)
        .await?;

    log::info!("Tournament {} cancelled: {}", tournament.id, reason);

    state
        .announcer
        .send(Announcement::Cancelled {
            tournament: tournament.id,
            name: tournament.name.clone(),
            reason: reason.to_owned(),
        })
        .await;

    Ok(())
}

fn validate_reason(reason: &str) -> Result<&str, Error> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(Error::validation("a reason is required"));
    }

    if reason.len() > 1000 {
        return Err(Error::validation(
            "the reason must be at most 1000 characters",
        ));
    }

    Ok(reason)
}

async fn fetch(state: &State, id: TournamentId) -> Result<Tournament, Error> {
    state
        .store
        .tournaments()
        .get(id)
        .await?
        .ok_or(Error::TournamentNotFound(id))
}
