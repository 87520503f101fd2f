use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolOptions;
use sqlx::SqlitePool;

use crate::announce::Announcer;
use crate::ledger::ActionLedger;
use crate::store::Store;
use crate::{Config, Error};

/// Shared handle to everything the service owns. Cheap to clone.
#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    /// Creates the state from the given configuration. The database pool
    /// connects lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the connect string is malformed.
    pub fn new(config: Config, announcer: Announcer) -> Result<Self, Error> {
        let pool: SqlitePool = PoolOptions::new()
            .max_connections(config.database.max_connections)
            .max_lifetime(Duration::new(3600, 0))
            .idle_timeout(Duration::new(600, 0))
            .connect_lazy(&config.database.connect_string())?;

        let store = Store {
            pool,
            table_prefix: config.database.prefix.clone(),
        };

        let ledger = ActionLedger::new(config.ledger.capacity, config.ledger.retention());

        Ok(Self(Arc::new(StateInner {
            store,
            config,
            announcer,
            ledger,
        })))
    }

}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub store: Store,
    pub config: Config,
    pub announcer: Announcer,
    pub ledger: ActionLedger,
}
