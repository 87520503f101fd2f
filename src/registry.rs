//! Enrollment of players and teams into approved tournaments.

use arena_core::{Party, TournamentId};
use chrono::Utc;

use crate::ledger::ActionId;
use crate::model::{PlayerProfile, Tournament, TournamentKind, TournamentStatus};
use crate::state::State;
use crate::Error;

/// Enrolls a single player into an individual tournament.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the tournament does not accept the
/// enrollment or an database error occured.
pub async fn enroll_player(
    state: &State,
    action: ActionId,
    tournament: TournamentId,
    profile: &PlayerProfile,
) -> Result<(), Error> {
    if !state.ledger.try_claim(action) {
        return Err(Error::Duplicate);
    }

    match enroll_player_inner(state, tournament, profile).await {
        Ok(()) => Ok(()),
        Err(err) => {
            state.ledger.release(action);
            Err(err)
        }
    }
}

async fn enroll_player_inner(
    state: &State,
    tournament: TournamentId,
    profile: &PlayerProfile,
) -> Result<(), Error> {
    let tournament = fetch_open(state, tournament).await?;

    if tournament.kind != TournamentKind::Individual {
        return Err(Error::precondition(
            "this is a team tournament, enroll a team instead",
        ));
    }

    let participants = state.store.participants(tournament.id);

    if participants.contains(profile.id).await? {
        return Err(Error::precondition("you are already enrolled"));
    }

    if participants.count().await? >= tournament.capacity {
        return Err(Error::precondition("the tournament is full"));
    }

    state
        .store
        .enroll_player(tournament.id, profile, Utc::now())
        .await
}

/// Fields a team into a team tournament. `members` is the full roster and
/// must contain the captain.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the tournament does not accept the team or
/// an database error occured.
pub async fn enroll_team(
    state: &State,
    action: ActionId,
    tournament: TournamentId,
    captain: &PlayerProfile,
    name: &str,
    members: &[PlayerProfile],
) -> Result<(), Error> {
    if !state.ledger.try_claim(action) {
        return Err(Error::Duplicate);
    }

    match enroll_team_inner(state, tournament, captain, name, members).await {
        Ok(()) => Ok(()),
        Err(err) => {
            state.ledger.release(action);
            Err(err)
        }
    }
}

async fn enroll_team_inner(
    state: &State,
    tournament: TournamentId,
    captain: &PlayerProfile,
    name: &str,
    members: &[PlayerProfile],
) -> Result<(), Error> {
    let tournament = fetch_open(state, tournament).await?;

    if tournament.kind != TournamentKind::Team {
        return Err(Error::precondition(
            "this is an individual tournament, enroll yourself instead",
        ));
    }

    let name = name.trim();
    if name.len() < 2 || name.len() > 50 {
        return Err(Error::validation(
            "the team name must be between 2 and 50 characters",
        ));
    }

    if members.len() as u32 != tournament.capacity {
        return Err(Error::validation(format!(
            "the roster must have exactly {} players",
            tournament.capacity
        )));
    }

    if !members.iter().any(|member| member.id == captain.id) {
        return Err(Error::validation("the captain must be on the roster"));
    }

    for (index, member) in members.iter().enumerate() {
        if members[..index].iter().any(|other| other.id == member.id) {
            return Err(Error::validation(format!("{} is listed twice", member.name)));
        }
    }

    let teams = state.store.teams(tournament.id);

    if teams.count().await? >= 2 {
        return Err(Error::precondition("both sides are already fielded"));
    }

    if teams.contains_name(name).await? {
        return Err(Error::precondition(
            "a team with this name is already fielded",
        ));
    }

    if teams.contains_captain(captain.id).await? {
        return Err(Error::precondition("you already field a team here"));
    }

    let participants = state.store.participants(tournament.id);
    for member in members {
        if participants.contains(member.id).await? {
            return Err(Error::precondition(format!(
                "{} is already enrolled",
                member.name
            )));
        }
    }

    state
        .store
        .enroll_team(tournament.id, name, captain.id, members, Utc::now())
        .await
        .map(|_| ())
}

/// Returns the number of enrolled sides, players or teams according to the
/// tournament kind.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn enrollment_count(state: &State, tournament: &Tournament) -> Result<u32, Error> {
    match tournament.kind {
        TournamentKind::Individual => state.store.participants(tournament.id).count().await,
        TournamentKind::Team => state.store.teams(tournament.id).count().await,
    }
}

/// Returns the enrolled parties in join order, ready for seeding.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn parties(state: &State, tournament: &Tournament) -> Result<Vec<Party>, Error> {
    match tournament.kind {
        TournamentKind::Individual => {
            let players = state.store.participants(tournament.id).players().await?;
            Ok(players.into_iter().map(Party::Player).collect())
        }
        TournamentKind::Team => {
            let teams = state.store.teams(tournament.id).list().await?;
            Ok(teams.into_iter().map(|team| Party::Team(team.id)).collect())
        }
    }
}

async fn fetch_open(state: &State, id: TournamentId) -> Result<Tournament, Error> {
    let tournament = state
        .store
        .tournaments()
        .get(id)
        .await?
        .ok_or(Error::TournamentNotFound(id))?;

    match tournament.status {
        TournamentStatus::Approved => Ok(tournament),
        TournamentStatus::Pending => Err(Error::precondition(
            "the tournament has not been approved yet",
        )),
        TournamentStatus::InProgress => {
            Err(Error::precondition("the tournament has already started"))
        }
        _ => Err(Error::precondition("enrollment is closed")),
    }
}
