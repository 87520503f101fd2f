//! Table definitions. `{prefix}` is substituted with the configured table
//! prefix before execution.

pub const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS {prefix}players (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        wins INTEGER NOT NULL DEFAULT 0,
        losses INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}tournaments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        kind INTEGER NOT NULL,
        discipline TEXT,
        rules TEXT,
        format INTEGER NOT NULL,
        entry_fee INTEGER NOT NULL DEFAULT 0,
        capacity INTEGER NOT NULL,
        scheduled_at TEXT NOT NULL,
        created_by INTEGER NOT NULL,
        status INTEGER NOT NULL,
        status_reason TEXT,
        approved_by INTEGER,
        winner_kind INTEGER,
        winner_id INTEGER,
        started INTEGER NOT NULL DEFAULT 0,
        notified INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}participants (
        tournament_id INTEGER NOT NULL REFERENCES {prefix}tournaments(id),
        player_id INTEGER NOT NULL REFERENCES {prefix}players(id),
        joined_at TEXT NOT NULL,
        UNIQUE (tournament_id, player_id)
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tournament_id INTEGER NOT NULL REFERENCES {prefix}tournaments(id),
        name TEXT NOT NULL,
        captain_id INTEGER NOT NULL,
        members TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}matches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tournament_id INTEGER NOT NULL REFERENCES {prefix}tournaments(id),
        round INTEGER NOT NULL,
        home_kind INTEGER,
        home_id INTEGER,
        away_kind INTEGER,
        away_id INTEGER,
        home_score INTEGER,
        away_score INTEGER,
        completed INTEGER NOT NULL DEFAULT 0,
        notes TEXT,
        created_at TEXT NOT NULL,
        completed_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}placements (
        tournament_id INTEGER NOT NULL REFERENCES {prefix}tournaments(id),
        party_kind INTEGER NOT NULL,
        party_id INTEGER NOT NULL,
        place INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}achievements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}player_achievements (
        player_id INTEGER NOT NULL REFERENCES {prefix}players(id),
        achievement_id INTEGER NOT NULL REFERENCES {prefix}achievements(id),
        earned_at TEXT NOT NULL,
        UNIQUE (player_id, achievement_id)
    )",
    "CREATE TABLE IF NOT EXISTS {prefix}penalties (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id INTEGER NOT NULL REFERENCES {prefix}players(id),
        reason TEXT NOT NULL,
        issued_by INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
];
