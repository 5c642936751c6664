use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::crops::repo::{CropStore, PgCropStore};
use crate::hives::repo::{HiveStore, PgHiveStore};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

/// Context handed to every handler: configuration plus the three stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub hives: Arc<dyn HiveStore>,
    pub crops: Arc<dyn CropStore>,
}

impl AppState {
    /// Connects to Postgres and applies pending migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        Ok(Self::from_pool(db, Arc::new(config)))
    }

    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            config,
            users: Arc::new(PgUserStore::new(db.clone())),
            hives: Arc::new(PgHiveStore::new(db.clone())),
            crops: Arc::new(PgCropStore::new(db)),
        }
    }
}

#[cfg(test)]
impl AppState {
    pub fn in_memory(config: AppConfig) -> Self {
        use crate::auth::repo::memory::MemoryUserStore;
        use crate::crops::repo::memory::MemoryCropStore;
        use crate::hives::repo::memory::MemoryHiveStore;

        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::default()),
            hives: Arc::new(MemoryHiveStore::default()),
            crops: Arc::new(MemoryCropStore::default()),
        }
    }
}
