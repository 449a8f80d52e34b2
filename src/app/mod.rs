//! Application wiring
//!
//! Loads configuration, opens the SQLite store and builds the roster and
//! ledger services the CLI commands run against.

pub mod config;
pub mod loader;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use roster_core::{Actor, Identity, Ledger, Roster, SqliteStore, Store};

pub use config::AppConfig;
pub use loader::load_config;

/// Opened store plus the services built on it
pub struct App {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub roster: Roster,
    pub ledger: Ledger,
}

impl App {
    /// Validate `config`, open (and migrate) the database, build the services
    pub async fn open(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let store = SqliteStore::open_with(
            &config.database.path,
            config.database.max_connections,
            config.database.busy_timeout(),
        )
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        let store = Arc::new(store);
        info!(path = %config.database.path, "Database ready");

        let identity = Identity::new(&config.auth.jwt_secret, config.auth.token_ttl_secs)
            .context("Invalid auth configuration")?;
        let shared: Arc<dyn Store> = store.clone();

        Ok(Self {
            roster: Roster::new(shared.clone(), identity),
            ledger: Ledger::new(shared),
            store,
            config,
        })
    }

    /// Actor described by `token`, if it is valid
    pub fn actor(&self, token: Option<&str>) -> Option<Actor> {
        self.roster.resolve(token)
    }
}
