//! The achievement catalog and its evaluation.
//!
//! Grants are append-only: once earned, an achievement survives undone
//! results. Evaluation runs after every tournament resolution for the
//! winner.

use arena_core::PlayerId;
use chrono::Utc;

use crate::announce::Announcement;
use crate::auth::{Actor, Role};
use crate::model::{Achievement, EarnedAchievement};
use crate::state::State;
use crate::Error;

/// Catalog ids of the seeded achievements. Fixed so grants stay stable
/// across restarts.
const REVOLVER_KING: i64 = 1;
const SHARPSHOOTER: i64 = 2;
const UNSTOPPABLE: i64 = 3;

/// Seeds the built-in catalog entries if they are missing.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn install_defaults(state: &State) -> Result<(), Error> {
    let achievements = state.store.achievements();

    achievements
        .ensure(
            REVOLVER_KING,
            "Revolver King",
            "Win three tournaments in the revolver discipline",
        )
        .await?;

    achievements
        .ensure(
            SHARPSHOOTER,
            "Sharpshooter",
            "Win a tournament in the sniper discipline",
        )
        .await?;

    achievements
        .ensure(
            UNSTOPPABLE,
            "Unstoppable",
            "Take first place in five tournaments in a row",
        )
        .await?;

    Ok(())
}

/// Adds a new catalog entry and returns its id.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the entry is unacceptable or an database
/// error occured.
pub async fn add(
    state: &State,
    actor: &Actor,
    name: &str,
    description: &str,
) -> Result<i64, Error> {
    actor.require(Role::Admin)?;

    let name = name.trim();
    if name.len() < 3 || name.len() > 50 {
        return Err(Error::validation(
            "the name must be between 3 and 50 characters",
        ));
    }

    let description = description.trim();
    if description.len() < 5 || description.len() > 200 {
        return Err(Error::validation(
            "the description must be between 5 and 200 characters",
        ));
    }

    if state.store.achievements().contains_name(name).await? {
        return Err(Error::precondition(
            "an achievement with this name already exists",
        ));
    }

    state.store.achievements().insert(name, description).await
}

/// Grants a catalog achievement to a player by hand. Returns `false` if the
/// player already held it.
///
/// # Errors
///
/// Returns an [`enum@Error`] when the achievement or player is unknown or
/// an database error occured.
pub async fn grant(
    state: &State,
    actor: &Actor,
    player: PlayerId,
    achievement: i64,
) -> Result<bool, Error> {
    actor.require(Role::Admin)?;

    let entry = state
        .store
        .achievements()
        .get(achievement)
        .await?
        .ok_or_else(|| Error::precondition("the achievement does not exist"))?;

    if state.store.players().get(player).await?.is_none() {
        return Err(Error::precondition("the player has never been registered"));
    }

    let granted = state
        .store
        .achievements()
        .grant(player, achievement, Utc::now())
        .await?;

    if granted {
        state
            .announcer
            .send(Announcement::AchievementUnlocked {
                player,
                name: entry.name,
            })
            .await;
    }

    Ok(granted)
}

/// Returns the whole catalog.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn catalog(state: &State) -> Result<Vec<Achievement>, Error> {
    state.store.achievements().all().await
}

/// Returns everything the player has earned.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn earned(state: &State, player: PlayerId) -> Result<Vec<EarnedAchievement>, Error> {
    state.store.achievements().earned(player).await
}

/// Checks the seeded predicates for a tournament winner and grants whatever
/// is newly earned.
///
/// # Errors
///
/// Returns an [`enum@Error`] if an database error occured.
pub async fn evaluate(state: &State, player: PlayerId) -> Result<(), Error> {
    let placements = state.store.placements();

    if placements.wins_in_discipline(player, "%revolver%").await? >= 3 {
        grant_if_new(state, player, REVOLVER_KING).await?;
    }

    if placements.wins_in_discipline(player, "%sniper%").await? >= 1 {
        grant_if_new(state, player, SHARPSHOOTER).await?;
    }

    let recent = placements.recent_places(player, 5).await?;
    if recent.len() == 5 && recent.iter().all(|place| *place == 1) {
        grant_if_new(state, player, UNSTOPPABLE).await?;
    }

    Ok(())
}

async fn grant_if_new(state: &State, player: PlayerId, id: i64) -> Result<(), Error> {
    if !state.store.achievements().grant(player, id, Utc::now()).await? {
        return Ok(());
    }

    let name = match state.store.achievements().get(id).await? {
        Some(achievement) => achievement.name,
        None => return Ok(()),
    };

    log::info!("Player {} earned achievement {:?}", player, name);

    state
        .announcer
        .send(Announcement::AchievementUnlocked { player, name })
        .await;

    Ok(())
}
