use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{
    password::PasswordHasher,
    random::OsRandom,
    repo::{MemoryUserStore, PgUserStore, UserStore},
    services::Accounts,
};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<Accounts>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        // The login unique index lives in the migrations.
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let store = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        Self::from_parts(store, Arc::new(SystemClock), config)
    }

    pub fn from_parts(
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: Arc<AppConfig>,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.password)?;
        let accounts = Accounts::new(
            store,
            hasher,
            clock,
            Arc::new(OsRandom),
            Arc::new(config.session.clone()),
        );
        Ok(Self {
            accounts: Arc::new(accounts),
            config,
        })
    }

    /// State backed by a process-local store; nothing is persisted.
    pub fn in_memory(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        Self::from_parts(Arc::new(MemoryUserStore::new()), Arc::new(SystemClock), config)
    }
}
