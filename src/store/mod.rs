use std::collections::HashMap;

use arena_core::{MatchFormat, MatchId, Party, PlayerId, TeamId, TournamentId};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};

use crate::model::{
    Achievement, EarnedAchievement, Match, NewMatch, NewTournament, Penalty, Placement, Player,
    PlayerProfile, Team, Tournament, TournamentKind, TournamentStatus,
};
use crate::Error;

mod tables;

pub use tables::TABLES;

/// The SQLite store behind all service state.
///
/// Cheap to clone; all clones share one pool.
#[derive(Clone, Debug)]
pub struct Store {
    pub pool: SqlitePool,
    pub table_prefix: String,
}

macro_rules! get_one {
    ($query:expr) => {
        match $query {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        }
    };
}

impl Store {
    /// Creates all tables the service needs, if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn create_tables(&self) -> Result<(), Error> {
        for table in TABLES {
            let sql = table.replace("{prefix}", &self.table_prefix);

            sqlx::query(&sql).execute(&self.pool).await?;
        }

        Ok(())
    }

    #[inline]
    pub fn tournaments(&self) -> TournamentsClient<'_> {
        TournamentsClient { store: self }
    }

    #[inline]
    pub fn players(&self) -> PlayersClient<'_> {
        PlayersClient { store: self }
    }

    #[inline]
    pub fn participants(&self, id: TournamentId) -> ParticipantsClient<'_> {
        ParticipantsClient { store: self, id }
    }

    #[inline]
    pub fn teams(&self, id: TournamentId) -> TeamsClient<'_> {
        TeamsClient { store: self, id }
    }

    #[inline]
    pub fn matches(&self) -> MatchesClient<'_> {
        MatchesClient { store: self }
    }

    #[inline]
    pub fn placements(&self) -> PlacementsClient<'_> {
        PlacementsClient { store: self }
    }

    #[inline]
    pub fn achievements(&self) -> AchievementsClient<'_> {
        AchievementsClient { store: self }
    }

    #[inline]
    pub fn penalties(&self) -> PenaltiesClient<'_> {
        PenaltiesClient { store: self }
    }

    /// Registers the player if unknown and enrolls them in the tournament,
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn enroll_player(
        &self,
        tournament: TournamentId,
        profile: &PlayerProfile,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        self.ensure_player(&mut tx, profile).await?;

        sqlx::query(&format!(
            "INSERT INTO {}participants (tournament_id, player_id, joined_at) VALUES (?, ?, ?)",
            self.table_prefix
        ))
        .bind(tournament.0)
        .bind(profile.id.0)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Creates a team with its full roster and enrolls every member,
    /// atomically. `members` includes the captain.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn enroll_team(
        &self,
        tournament: TournamentId,
        name: &str,
        captain: PlayerId,
        members: &[PlayerProfile],
        now: DateTime<Utc>,
    ) -> Result<TeamId, Error> {
        let roster: Vec<PlayerId> = members.iter().map(|m| m.id).collect();

        let mut tx = self.pool.begin().await?;

        for member in members {
            self.ensure_player(&mut tx, member).await?;
        }

        let res = sqlx::query(&format!(
            "INSERT INTO {}teams (tournament_id, name, captain_id, members, created_at) \
             VALUES (?, ?, ?, ?, ?)",
            self.table_prefix
        ))
        .bind(tournament.0)
        .bind(name)
        .bind(captain.0)
        .bind(serde_json::to_string(&roster)?)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = TeamId(res.last_insert_rowid());

        for member in members {
            sqlx::query(&format!(
                "INSERT INTO {}participants (tournament_id, player_id, joined_at) VALUES (?, ?, ?)",
                self.table_prefix
            ))
            .bind(tournament.0)
            .bind(member.id.0)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(id)
    }

    /// Inserts a full round of matches and, when `transition` is set, flips
    /// the tournament to started and in progress, atomically.
    ///
    /// Returns the created rows in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn apply_round(
        &self,
        tournament: TournamentId,
        entries: &[NewMatch],
        transition: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Match>, Error> {
        let mut tx = self.pool.begin().await?;

        if transition {
            sqlx::query(&format!(
                "UPDATE {}tournaments SET started = 1, status = ? WHERE id = ?",
                self.table_prefix
            ))
            .bind(TournamentStatus::InProgress.to_u8())
            .bind(tournament.0)
            .execute(&mut *tx)
            .await?;
        }

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let (home_kind, home_id) = party_columns(entry.slots[0]);
            let (away_kind, away_id) = party_columns(entry.slots[1]);

            let res = sqlx::query(&format!(
                "INSERT INTO {}matches \
                 (tournament_id, round, home_kind, home_id, away_kind, away_id, completed, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                self.table_prefix
            ))
            .bind(tournament.0)
            .bind(entry.round)
            .bind(home_kind)
            .bind(home_id)
            .bind(away_kind)
            .bind(away_id)
            .bind(entry.completed)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            created.push(Match {
                id: MatchId(res.last_insert_rowid()),
                tournament,
                round: entry.round,
                slots: entry.slots,
                score: None,
                completed: entry.completed,
                notes: None,
                created_at: now,
                completed_at: None,
            });
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Records a match result together with its counter and resolution side
    /// effects, atomically.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn apply_result(&self, update: &ResultUpdate, now: DateTime<Utc>) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "UPDATE {}matches SET home_score = ?, away_score = ?, notes = ?, completed = 1, \
             completed_at = ? WHERE id = ?",
            self.table_prefix
        ))
        .bind(update.score.0)
        .bind(update.score.1)
        .bind(&update.notes)
        .bind(now)
        .bind(update.match_id.0)
        .execute(&mut *tx)
        .await?;

        if let Some(counters) = &update.counters {
            self.bump_counters(&mut tx, counters).await?;
        }

        if let Some(resolution) = &update.resolution {
            self.resolve_in_tx(&mut tx, resolution).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Resolves a tournament without touching any match row. Used when a
    /// round advance finds a single remaining winner.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn apply_resolution(&self, resolution: &Resolution) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        self.resolve_in_tx(&mut tx, resolution).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Unwinds a completed match: drops all later rounds, resets the match
    /// row, reverses counter effects and reopens the tournament if it had
    /// resolved, atomically.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn apply_undo(&self, undo: &UndoUpdate) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "DELETE FROM {}matches WHERE tournament_id = ? AND round > ?",
            self.table_prefix
        ))
        .bind(undo.tournament.0)
        .bind(undo.round)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "UPDATE {}matches SET home_score = NULL, away_score = NULL, completed = 0, \
             notes = NULL, completed_at = NULL WHERE id = ?",
            self.table_prefix
        ))
        .bind(undo.match_id.0)
        .execute(&mut *tx)
        .await?;

        for delta in &undo.reversals {
            // Floored at zero, counters never go negative.
            sqlx::query(&format!(
                "UPDATE {}players SET wins = wins - 1 WHERE id = ? AND wins > 0",
                self.table_prefix
            ))
            .bind(delta.winner.0)
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "UPDATE {}players SET losses = losses - 1 WHERE id = ? AND losses > 0",
                self.table_prefix
            ))
            .bind(delta.loser.0)
            .execute(&mut *tx)
            .await?;
        }

        if undo.reopen {
            sqlx::query(&format!(
                "UPDATE {}tournaments SET winner_kind = NULL, winner_id = NULL, status = ? \
                 WHERE id = ?",
                self.table_prefix
            ))
            .bind(TournamentStatus::InProgress.to_u8())
            .bind(undo.tournament.0)
            .execute(&mut *tx)
            .await?;

            sqlx::query(&format!(
                "DELETE FROM {}placements WHERE tournament_id = ?",
                self.table_prefix
            ))
            .bind(undo.tournament.0)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Returns the display names of every party enrolled in the tournament.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn party_names(
        &self,
        tournament: TournamentId,
    ) -> Result<HashMap<Party, String>, Error> {
        let mut names = HashMap::new();

        let sql = format!(
            "SELECT p.id, p.name FROM {0}participants pa \
             JOIN {0}players p ON p.id = pa.player_id WHERE pa.tournament_id = ?",
            self.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(tournament.0).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let id: i64 = row.try_get("id")?;
            let name: String = row.try_get("name")?;

            names.insert(Party::Player(PlayerId(id)), name);
        }
        drop(rows);

        let sql = format!(
            "SELECT id, name FROM {}teams WHERE tournament_id = ?",
            self.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(tournament.0).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let id: i64 = row.try_get("id")?;
            let name: String = row.try_get("name")?;

            names.insert(Party::Team(TeamId(id)), name);
        }

        Ok(names)
    }

    async fn ensure_player(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        profile: &PlayerProfile,
    ) -> Result<(), Error> {
        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {}players (id, name, wins, losses) VALUES (?, ?, 0, 0)",
            self.table_prefix
        ))
        .bind(profile.id.0)
        .bind(&profile.name)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn bump_counters(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        delta: &CounterDelta,
    ) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}players SET wins = wins + 1 WHERE id = ?",
            self.table_prefix
        ))
        .bind(delta.winner.0)
        .execute(&mut **tx)
        .await?;

        sqlx::query(&format!(
            "UPDATE {}players SET losses = losses + 1 WHERE id = ?",
            self.table_prefix
        ))
        .bind(delta.loser.0)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn resolve_in_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        resolution: &Resolution,
    ) -> Result<(), Error> {
        let (winner_kind, winner_id) = party_columns(Some(resolution.winner));

        sqlx::query(&format!(
            "UPDATE {}tournaments SET winner_kind = ?, winner_id = ?, status = ? WHERE id = ?",
            self.table_prefix
        ))
        .bind(winner_kind)
        .bind(winner_id)
        .bind(TournamentStatus::Completed.to_u8())
        .bind(resolution.tournament.0)
        .execute(&mut **tx)
        .await?;

        for placement in &resolution.placements {
            let (kind, id) = placement.party.into_parts();

            sqlx::query(&format!(
                "INSERT INTO {}placements (tournament_id, party_kind, party_id, place) \
                 VALUES (?, ?, ?, ?)",
                self.table_prefix
            ))
            .bind(placement.tournament.0)
            .bind(kind)
            .bind(id)
            .bind(placement.place)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

/// The winner and loser of one decisive player match.
#[derive(Clone, Debug)]
pub struct CounterDelta {
    pub winner: PlayerId,
    pub loser: PlayerId,
}

/// The terminal effects of a resolved tournament.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub tournament: TournamentId,
    pub winner: Party,
    pub placements: Vec<Placement>,
}

/// Everything one result submission writes.
#[derive(Clone, Debug)]
pub struct ResultUpdate {
    pub match_id: MatchId,
    pub score: (u32, u32),
    pub notes: Option<String>,
    pub counters: Option<CounterDelta>,
    pub resolution: Option<Resolution>,
}

/// Everything one undo writes.
#[derive(Clone, Debug)]
pub struct UndoUpdate {
    pub match_id: MatchId,
    pub tournament: TournamentId,
    pub round: u32,
    /// Counter effects of the reset match and of every deleted decisive
    /// match, to be reversed.
    pub reversals: Vec<CounterDelta>,
    /// Set when the tournament had resolved and must return to in progress.
    pub reopen: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct TournamentsClient<'a> {
    store: &'a Store,
}

impl<'a> TournamentsClient<'a> {
    /// Inserts a new pending tournament and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn insert(
        &self,
        tournament: &NewTournament,
        now: DateTime<Utc>,
    ) -> Result<TournamentId, Error> {
        let res = sqlx::query(&format!(
            "INSERT INTO {}tournaments \
             (name, kind, discipline, rules, format, entry_fee, capacity, scheduled_at, \
              created_by, status, started, notified, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)",
            self.store.table_prefix
        ))
        .bind(&tournament.name)
        .bind(tournament.kind.to_u8())
        .bind(&tournament.discipline)
        .bind(&tournament.rules)
        .bind(tournament.format.to_u8())
        .bind(tournament.entry_fee)
        .bind(tournament.capacity)
        .bind(tournament.scheduled_at)
        .bind(tournament.created_by.0)
        .bind(TournamentStatus::Pending.to_u8())
        .bind(now)
        .execute(&self.store.pool)
        .await?;

        Ok(TournamentId(res.last_insert_rowid()))
    }

    /// Returns the [`Tournament`] with the given `id`, or `None` if it does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get(&self, id: TournamentId) -> Result<Option<Tournament>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, name, kind, discipline, rules, format, entry_fee, capacity, \
                 scheduled_at, created_by, status, status_reason, approved_by, winner_kind, \
                 winner_id, started, notified, created_at FROM {}tournaments WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(tournament_from_row(&row)?))
    }

    /// Returns all tournaments currently in the approved state.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list_approved(&self) -> Result<Vec<Tournament>, Error> {
        let sql = format!(
            "SELECT id, name, kind, discipline, rules, format, entry_fee, capacity, \
             scheduled_at, created_by, status, status_reason, approved_by, winner_kind, \
             winner_id, started, notified, created_at FROM {}tournaments WHERE status = ?",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql)
            .bind(TournamentStatus::Approved.to_u8())
            .fetch(&self.store.pool);

        let mut tournaments = Vec::new();
        while let Some(row) = rows.try_next().await? {
            tournaments.push(tournament_from_row(&row)?);
        }

        Ok(tournaments)
    }

    /// Marks the tournament approved and records the moderator.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn approve(&self, id: TournamentId, moderator: PlayerId) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}tournaments SET status = ?, approved_by = ? WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(TournamentStatus::Approved.to_u8())
        .bind(moderator.0)
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Moves the tournament into a closed state with the given reason.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn close(
        &self,
        id: TournamentId,
        status: TournamentStatus,
        reason: &str,
    ) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}tournaments SET status = ?, status_reason = ? WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(status.to_u8())
        .bind(reason)
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Moves the scheduled start and re-arms the starting-soon notice.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn reschedule(&self, id: TournamentId, date: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}tournaments SET scheduled_at = ?, notified = 0 WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(date)
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Marks the starting-soon notice as sent.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn set_notified(&self, id: TournamentId) -> Result<(), Error> {
        sqlx::query(&format!(
            "UPDATE {}tournaments SET notified = 1 WHERE id = ?",
            self.store.table_prefix
        ))
        .bind(id.0)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }
}

#[derive(Copy, Clone, Debug)]
pub struct PlayersClient<'a> {
    store: &'a Store,
}

impl<'a> PlayersClient<'a> {
    /// Registers the player if unknown. An existing row keeps its name and
    /// counters.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn ensure(&self, profile: &PlayerProfile) -> Result<(), Error> {
        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {}players (id, name, wins, losses) VALUES (?, ?, 0, 0)",
            self.store.table_prefix
        ))
        .bind(profile.id.0)
        .bind(&profile.name)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Returns the [`Player`] with the given `id`, or `None` if the player
    /// was never registered.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get(&self, id: PlayerId) -> Result<Option<Player>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, name, wins, losses FROM {}players WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(player_from_row(&row)?))
    }

    /// Returns up to `limit` players ordered by wins, fewest losses first on
    /// ties.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn top(&self, limit: u32) -> Result<Vec<Player>, Error> {
        let sql = format!(
            "SELECT id, name, wins, losses FROM {}players \
             WHERE wins > 0 OR losses > 0 ORDER BY wins DESC, losses ASC LIMIT ?",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(limit).fetch(&self.store.pool);

        let mut players = Vec::new();
        while let Some(row) = rows.try_next().await? {
            players.push(player_from_row(&row)?);
        }

        Ok(players)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ParticipantsClient<'a> {
    store: &'a Store,
    id: TournamentId,
}

impl<'a> ParticipantsClient<'a> {
    /// Returns the number of enrolled players.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn count(&self) -> Result<u32, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}participants WHERE tournament_id = ?",
            self.store.table_prefix
        ))
        .bind(self.id.0)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n as u32)
    }

    /// Returns `true` if the player is enrolled in the tournament.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn contains(&self, player: PlayerId) -> Result<bool, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}participants WHERE tournament_id = ? AND player_id = ?",
            self.store.table_prefix
        ))
        .bind(self.id.0)
        .bind(player.0)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n > 0)
    }

    /// Returns the ids of all enrolled players, in join order.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn players(&self) -> Result<Vec<PlayerId>, Error> {
        let sql = format!(
            "SELECT player_id FROM {}participants WHERE tournament_id = ? ORDER BY joined_at ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(self.id.0).fetch(&self.store.pool);

        let mut players = Vec::new();
        while let Some(row) = rows.try_next().await? {
            players.push(PlayerId(row.try_get("player_id")?));
        }

        Ok(players)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TeamsClient<'a> {
    store: &'a Store,
    id: TournamentId,
}

impl<'a> TeamsClient<'a> {
    /// Returns the number of teams fielded in the tournament.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn count(&self) -> Result<u32, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}teams WHERE tournament_id = ?",
            self.store.table_prefix
        ))
        .bind(self.id.0)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n as u32)
    }

    /// Returns `true` if a team with the given name is already fielded.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn contains_name(&self, name: &str) -> Result<bool, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}teams WHERE tournament_id = ? AND name = ?",
            self.store.table_prefix
        ))
        .bind(self.id.0)
        .bind(name)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n > 0)
    }

    /// Returns `true` if the player already captains a team in the
    /// tournament.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn contains_captain(&self, captain: PlayerId) -> Result<bool, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}teams WHERE tournament_id = ? AND captain_id = ?",
            self.store.table_prefix
        ))
        .bind(self.id.0)
        .bind(captain.0)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n > 0)
    }

    /// Returns all teams of the tournament, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list(&self) -> Result<Vec<Team>, Error> {
        let sql = format!(
            "SELECT id, name, captain_id, members, created_at FROM {}teams \
             WHERE tournament_id = ? ORDER BY id ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(self.id.0).fetch(&self.store.pool);

        let mut teams = Vec::new();
        while let Some(row) = rows.try_next().await? {
            let members: String = row.try_get("members")?;

            teams.push(Team {
                id: TeamId(row.try_get("id")?),
                tournament: self.id,
                name: row.try_get("name")?,
                captain: PlayerId(row.try_get("captain_id")?),
                members: serde_json::from_str(&members)?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(teams)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MatchesClient<'a> {
    store: &'a Store,
}

impl<'a> MatchesClient<'a> {
    /// Returns the [`Match`] with the given `id`, or `None` if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get(&self, id: MatchId) -> Result<Option<Match>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, tournament_id, round, home_kind, home_id, away_kind, away_id, \
                 home_score, away_score, completed, notes, created_at, completed_at \
                 FROM {}matches WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id.0)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(match_from_row(&row)?))
    }

    /// Returns all matches of the tournament ordered by round, then id.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list(&self, tournament: TournamentId) -> Result<Vec<Match>, Error> {
        let sql = format!(
            "SELECT id, tournament_id, round, home_kind, home_id, away_kind, away_id, \
             home_score, away_score, completed, notes, created_at, completed_at \
             FROM {}matches WHERE tournament_id = ? ORDER BY round ASC, id ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(tournament.0).fetch(&self.store.pool);

        let mut matches = Vec::new();
        while let Some(row) = rows.try_next().await? {
            matches.push(match_from_row(&row)?);
        }

        Ok(matches)
    }

    /// Returns all matches of one round of the tournament, in id order.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list_round(
        &self,
        tournament: TournamentId,
        round: u32,
    ) -> Result<Vec<Match>, Error> {
        let sql = format!(
            "SELECT id, tournament_id, round, home_kind, home_id, away_kind, away_id, \
             home_score, away_score, completed, notes, created_at, completed_at \
             FROM {}matches WHERE tournament_id = ? AND round = ? ORDER BY id ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql)
            .bind(tournament.0)
            .bind(round)
            .fetch(&self.store.pool);

        let mut matches = Vec::new();
        while let Some(row) = rows.try_next().await? {
            matches.push(match_from_row(&row)?);
        }

        Ok(matches)
    }

    /// Returns the highest round of the tournament, or 0 if no match exists.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn max_round(&self, tournament: TournamentId) -> Result<u32, Error> {
        let row = sqlx::query(&format!(
            "SELECT COALESCE(MAX(round), 0) AS round FROM {}matches WHERE tournament_id = ?",
            self.store.table_prefix
        ))
        .bind(tournament.0)
        .fetch_one(&self.store.pool)
        .await?;

        let round: i64 = row.try_get("round")?;

        Ok(round as u32)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct PlacementsClient<'a> {
    store: &'a Store,
}

impl<'a> PlacementsClient<'a> {
    /// Returns how many times the player finished at `place`.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn count_for_player(&self, player: PlayerId, place: u8) -> Result<u32, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}placements \
             WHERE party_kind = 0 AND party_id = ? AND place = ?",
            self.store.table_prefix
        ))
        .bind(player.0)
        .bind(place)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n as u32)
    }

    /// Returns how many first places the player took in tournaments whose
    /// discipline matches `pattern` (SQL LIKE syntax).
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn wins_in_discipline(&self, player: PlayerId, pattern: &str) -> Result<u32, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {0}placements pl \
             JOIN {0}tournaments t ON t.id = pl.tournament_id \
             WHERE pl.party_kind = 0 AND pl.party_id = ? AND pl.place = 1 \
             AND t.discipline LIKE ?",
            self.store.table_prefix
        ))
        .bind(player.0)
        .bind(pattern)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n as u32)
    }

    /// Returns the player's most recent places, newest first.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn recent_places(&self, player: PlayerId, limit: u32) -> Result<Vec<u8>, Error> {
        let sql = format!(
            "SELECT place FROM {}placements WHERE party_kind = 0 AND party_id = ? \
             ORDER BY rowid DESC LIMIT ?",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql)
            .bind(player.0)
            .bind(limit)
            .fetch(&self.store.pool);

        let mut places = Vec::new();
        while let Some(row) = rows.try_next().await? {
            places.push(row.try_get("place")?);
        }

        Ok(places)
    }

    /// Returns the player's placement history joined with tournament names,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn history(&self, player: PlayerId, limit: u32) -> Result<Vec<(String, u8)>, Error> {
        let sql = format!(
            "SELECT t.name AS name, pl.place AS place FROM {0}placements pl \
             JOIN {0}tournaments t ON t.id = pl.tournament_id \
             WHERE pl.party_kind = 0 AND pl.party_id = ? ORDER BY pl.rowid DESC LIMIT ?",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql)
            .bind(player.0)
            .bind(limit)
            .fetch(&self.store.pool);

        let mut history = Vec::new();
        while let Some(row) = rows.try_next().await? {
            history.push((row.try_get("name")?, row.try_get("place")?));
        }

        Ok(history)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct AchievementsClient<'a> {
    store: &'a Store,
}

impl<'a> AchievementsClient<'a> {
    /// Inserts a catalog entry with a fixed id if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn ensure(&self, id: i64, name: &str, description: &str) -> Result<(), Error> {
        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {}achievements (id, name, description) VALUES (?, ?, ?)",
            self.store.table_prefix
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Adds a new catalog entry and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn insert(&self, name: &str, description: &str) -> Result<i64, Error> {
        let res = sqlx::query(&format!(
            "INSERT INTO {}achievements (name, description) VALUES (?, ?)",
            self.store.table_prefix
        ))
        .bind(name)
        .bind(description)
        .execute(&self.store.pool)
        .await?;

        Ok(res.last_insert_rowid())
    }

    /// Returns the catalog entry with the given `id`, or `None` if it does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn get(&self, id: i64) -> Result<Option<Achievement>, Error> {
        let row = get_one!(
            sqlx::query(&format!(
                "SELECT id, name, description FROM {}achievements WHERE id = ?",
                self.store.table_prefix
            ))
            .bind(id)
            .fetch_one(&self.store.pool)
            .await
        );

        Ok(Some(Achievement {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
        }))
    }

    /// Returns `true` if a catalog entry with the given name exists.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn contains_name(&self, name: &str) -> Result<bool, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}achievements WHERE name = ?",
            self.store.table_prefix
        ))
        .bind(name)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n > 0)
    }

    /// Returns the whole catalog in id order.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn all(&self) -> Result<Vec<Achievement>, Error> {
        let sql = format!(
            "SELECT id, name, description FROM {}achievements ORDER BY id ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).fetch(&self.store.pool);

        let mut achievements = Vec::new();
        while let Some(row) = rows.try_next().await? {
            achievements.push(Achievement {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
            });
        }

        Ok(achievements)
    }

    /// Grants the achievement to the player. Returns `false` if the player
    /// already held it.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn grant(
        &self,
        player: PlayerId,
        achievement: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let res = sqlx::query(&format!(
            "INSERT OR IGNORE INTO {}player_achievements (player_id, achievement_id, earned_at) \
             VALUES (?, ?, ?)",
            self.store.table_prefix
        ))
        .bind(player.0)
        .bind(achievement)
        .bind(now)
        .execute(&self.store.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    /// Returns everything the player has earned, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn earned(&self, player: PlayerId) -> Result<Vec<EarnedAchievement>, Error> {
        let sql = format!(
            "SELECT a.name AS name, a.description AS description, pa.earned_at AS earned_at \
             FROM {0}player_achievements pa \
             JOIN {0}achievements a ON a.id = pa.achievement_id \
             WHERE pa.player_id = ? ORDER BY pa.earned_at ASC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(player.0).fetch(&self.store.pool);

        let mut earned = Vec::new();
        while let Some(row) = rows.try_next().await? {
            earned.push(EarnedAchievement {
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                earned_at: row.try_get("earned_at")?,
            });
        }

        Ok(earned)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct PenaltiesClient<'a> {
    store: &'a Store,
}

impl<'a> PenaltiesClient<'a> {
    /// Records a penalty against the player.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn insert(
        &self,
        player: PlayerId,
        reason: &str,
        issued_by: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query(&format!(
            "INSERT INTO {}penalties (player_id, reason, issued_by, created_at) \
             VALUES (?, ?, ?, ?)",
            self.store.table_prefix
        ))
        .bind(player.0)
        .bind(reason)
        .bind(issued_by.0)
        .bind(now)
        .execute(&self.store.pool)
        .await?;

        Ok(())
    }

    /// Returns how many penalties the player has collected.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn count(&self, player: PlayerId) -> Result<u32, Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}penalties WHERE player_id = ?",
            self.store.table_prefix
        ))
        .bind(player.0)
        .fetch_one(&self.store.pool)
        .await?;

        let n: i64 = row.try_get("n")?;

        Ok(n as u32)
    }

    /// Returns the player's penalties, newest first.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if an database error occured.
    pub async fn list(&self, player: PlayerId) -> Result<Vec<Penalty>, Error> {
        let sql = format!(
            "SELECT reason, issued_by, created_at FROM {}penalties \
             WHERE player_id = ? ORDER BY id DESC",
            self.store.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(player.0).fetch(&self.store.pool);

        let mut penalties = Vec::new();
        while let Some(row) = rows.try_next().await? {
            penalties.push(Penalty {
                reason: row.try_get("reason")?,
                issued_by: PlayerId(row.try_get("issued_by")?),
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(penalties)
    }
}

fn party_columns(party: Option<Party>) -> (Option<u8>, Option<i64>) {
    match party {
        Some(party) => {
            let (kind, id) = party.into_parts();
            (Some(kind), Some(id))
        }
        None => (None, None),
    }
}

fn party_from_columns(kind: Option<u8>, id: Option<i64>) -> Option<Party> {
    kind.zip(id).and_then(|(kind, id)| Party::from_parts(kind, id))
}

fn tournament_from_row(row: &SqliteRow) -> Result<Tournament, Error> {
    let kind: u8 = row.try_get("kind")?;
    let format: u8 = row.try_get("format")?;
    let status: u8 = row.try_get("status")?;
    let winner_kind: Option<u8> = row.try_get("winner_kind")?;
    let winner_id: Option<i64> = row.try_get("winner_id")?;
    let approved_by: Option<i64> = row.try_get("approved_by")?;

    Ok(Tournament {
        id: TournamentId(row.try_get("id")?),
        name: row.try_get("name")?,
        kind: TournamentKind::from_u8(kind).unwrap(),
        discipline: row.try_get("discipline")?,
        rules: row.try_get("rules")?,
        format: MatchFormat::from_u8(format).unwrap(),
        entry_fee: row.try_get("entry_fee")?,
        capacity: row.try_get("capacity")?,
        scheduled_at: row.try_get("scheduled_at")?,
        created_by: PlayerId(row.try_get("created_by")?),
        status: TournamentStatus::from_u8(status).unwrap(),
        status_reason: row.try_get("status_reason")?,
        approved_by: approved_by.map(PlayerId),
        winner: party_from_columns(winner_kind, winner_id),
        started: row.try_get("started")?,
        notified: row.try_get("notified")?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &SqliteRow) -> Result<Match, Error> {
    let home_kind: Option<u8> = row.try_get("home_kind")?;
    let home_id: Option<i64> = row.try_get("home_id")?;
    let away_kind: Option<u8> = row.try_get("away_kind")?;
    let away_id: Option<i64> = row.try_get("away_id")?;
    let home_score: Option<u32> = row.try_get("home_score")?;
    let away_score: Option<u32> = row.try_get("away_score")?;

    let round: i64 = row.try_get("round")?;

    Ok(Match {
        id: MatchId(row.try_get("id")?),
        tournament: TournamentId(row.try_get("tournament_id")?),
        round: round as u32,
        slots: [
            party_from_columns(home_kind, home_id),
            party_from_columns(away_kind, away_id),
        ],
        score: home_score.zip(away_score),
        completed: row.try_get("completed")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn player_from_row(row: &SqliteRow) -> Result<Player, Error> {
    Ok(Player {
        id: PlayerId(row.try_get("id")?),
        name: row.try_get("name")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
    })
}
