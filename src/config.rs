use std::env;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    if let Ok(value) = value.parse() {
                        $config.$name = value;
                    }
                }
            }
        )*
    }};
}

macro_rules! from_environment_error {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            let value = env::var($key).map_err(|_| ConfigError::MissingField($key))?;
            $config.$name = value.parse().map_err(|_| ConfigError::MissingField($key))?;
        )*
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub database: Database,
    pub loglevel: LevelFilter,
    pub scheduler: Scheduler,
    pub ledger: Ledger,
}

impl Config {
    pub async fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        Ok(toml::from_slice(&buf)?)
    }

    /// Creates a complete [`Config`] instance from the environment.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let mut this = Self::default();

        from_environment_error!(this, "ARENA_LOGLEVEL", loglevel);

        this.database = Database::from_environment()?;
        this.scheduler = Scheduler::default().with_environment();
        this.ledger = Ledger::default().with_environment();

        Ok(this)
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "ARENA_LOGLEVEL", loglevel);
        self.database = self.database.with_environment();
        self.scheduler = self.scheduler.with_environment();
        self.ledger = self.ledger.with_environment();

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::default(),
            loglevel: LevelFilter::Info,
            scheduler: Scheduler::default(),
            ledger: Ledger::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Database {
    /// Path of the SQLite database file, or `:memory:` for a transient
    /// in-memory database.
    pub path: String,
    pub prefix: String,
    pub max_connections: u32,
}

impl Database {
    pub fn connect_string(&self) -> String {
        if self.path == ":memory:" {
            String::from("sqlite::memory:")
        } else {
            format!("sqlite://{}?mode=rwc", self.path)
        }
    }

    pub fn from_environment() -> Result<Self, ConfigError> {
        let mut this = Self::default();

        from_environment_error!(this, "ARENA_DB_PATH", path);
        from_environment!(
            this,
            "ARENA_DB_PREFIX",
            prefix,
            "ARENA_DB_MAX_CONNECTIONS",
            max_connections,
        );

        Ok(this)
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "ARENA_DB_PATH",
            path,
            "ARENA_DB_PREFIX",
            prefix,
            "ARENA_DB_MAX_CONNECTIONS",
            max_connections,
        );

        self
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: String::from("arena.db"),
            prefix: String::new(),
            max_connections: 8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scheduler {
    /// Seconds between two sweep ticks.
    pub sweep_interval: u64,
    /// Minutes before the scheduled start at which the starting-soon notice
    /// goes out.
    pub notify_lead: i64,
    /// Minutes before the scheduled start at which an under-enrolled
    /// tournament is cancelled early.
    pub cancel_lead: i64,
}

impl Scheduler {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn notify_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.notify_lead)
    }

    pub fn cancel_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cancel_lead)
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "ARENA_SWEEP_INTERVAL",
            sweep_interval,
            "ARENA_NOTIFY_LEAD",
            notify_lead,
            "ARENA_CANCEL_LEAD",
            cancel_lead,
        );

        self
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            sweep_interval: 60,
            notify_lead: 15,
            cancel_lead: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    /// Seconds a processed action id is remembered.
    pub retention: u64,
    /// Maximum number of remembered action ids.
    pub capacity: usize,
}

impl Ledger {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention)
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "ARENA_LEDGER_RETENTION",
            retention,
            "ARENA_LEDGER_CAPACITY",
            capacity,
        );

        self
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            retention: 600,
            capacity: 4096,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("missing config field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::{Config, Database};

    #[test]
    fn test_connect_string() {
        let mut database = Database::default();
        database.path = String::from("/var/lib/arena/arena.db");
        assert_eq!(
            database.connect_string(),
            "sqlite:///var/lib/arena/arena.db?mode=rwc"
        );

        database.path = String::from(":memory:");
        assert_eq!(database.connect_string(), "sqlite::memory:");
    }

    #[test]
    fn test_parse_file() {
        let input = r#"
loglevel = "debug"

[database]
path = "arena.db"
prefix = "arena_"
max_connections = 4

[scheduler]
sweep_interval = 30
notify_lead = 15
cancel_lead = 60

[ledger]
retention = 300
capacity = 1024
"#;

        let config: Config = toml::from_str(input).unwrap();
        assert_eq!(config.loglevel, log::LevelFilter::Debug);
        assert_eq!(config.database.prefix, "arena_");
        assert_eq!(config.scheduler.sweep_interval, 30);
        assert_eq!(config.ledger.capacity, 1024);
    }
}
