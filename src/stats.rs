//! Aggregate player records: stats, the leaderboard and penalties.

use arena_core::PlayerId;
use chrono::Utc;

use crate::auth::{Actor, Role};
use crate::model::{Penalty, Player};
use crate::state::State;
use crate::Error;

/// The aggregate view of one player.
#[derive(Clone, Debug)]
pub struct PlayerStats {
    pub player: Player,
    /// Wins over decided matches, `0.0` for a blank record.
    pub win_rate: f64,
    pub first_places: u32,
    pub second_places: u32,
    /// Recent placements as (tournament name, place), newest first.
    pub history: Vec<(String, u8)>,
    pub penalties: u32,
}

/// Builds the stats view of a player.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the player was never registered or an
/// database error occured.
pub async fn player_stats(state: &State, player: PlayerId) -> Result<PlayerStats, Error> {
    let record = state
        .store
        .players()
        .get(player)
        .await?
        .ok_or_else(|| Error::precondition("the player has never been registered"))?;

    let total = record.wins + record.losses;
    let win_rate = if total == 0 {
        0.0
    } else {
        f64::from(record.wins) / f64::from(total)
    };

    let placements = state.store.placements();
    let first_places = placements.count_for_player(player, 1).await?;
    let second_places = placements.count_for_player(player, 2).await?;
    let history = placements.history(player, 10).await?;

    let penalties = state.store.penalties().count(player).await?;

    Ok(PlayerStats {
        player: record,
        win_rate,
        first_places,
        second_places,
        history,
        penalties,
    })
}

/// Returns the leaderboard: most wins first, fewest losses on ties.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn top_players(state: &State, limit: u32) -> Result<Vec<Player>, Error> {
    state.store.players().top(limit).await
}

/// Records a penalty against a player.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the reason is unacceptable, the player is
/// unknown or an database error occured.
pub async fn penalize(
    state: &State,
    actor: &Actor,
    player: PlayerId,
    reason: &str,
) -> Result<(), Error> {
    actor.require(Role::Manager)?;

    let reason = reason.trim();
    if reason.is_empty() || reason.len() > 500 {
        return Err(Error::validation(
            "the reason must be between 1 and 500 characters",
        ));
    }

    if state.store.players().get(player).await?.is_none() {
        return Err(Error::precondition("the player has never been registered"));
    }

    state
        .store
        .penalties()
        .insert(player, reason, actor.profile.id, Utc::now())
        .await
}

/// Returns the player's penalties, newest first.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn penalties(state: &State, player: PlayerId) -> Result<Vec<Penalty>, Error> {
    state.store.penalties().list(player).await
}
