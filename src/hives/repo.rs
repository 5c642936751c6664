use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::StoreError;

/// Hive placement record.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HiveLog {
    pub id: Uuid,
    pub hive_id: String,
    #[serde(with = "crate::validate::iso_date")]
    #[schema(value_type = String, format = Date, example = "2025-04-08")]
    pub date_placed: Date,
    pub latitude: f64,
    pub longitude: f64,
    pub num_colonies: i32,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub date_created: OffsetDateTime,
}

/// Validated input for a new hive log.
#[derive(Debug, Clone)]
pub struct NewHive {
    pub hive_id: String,
    pub date_placed: Date,
    pub latitude: f64,
    pub longitude: f64,
    pub num_colonies: i32,
}

/// Inclusive `datePlaced` bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiveFilter {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl HiveFilter {
    pub fn matches(&self, date: Date) -> bool {
        self.start_date.map_or(true, |s| date >= s) && self.end_date.map_or(true, |e| date <= e)
    }
}

/// Hive log store. `add` reports a taken `hive_id` as `StoreError::Duplicate`.
#[async_trait]
pub trait HiveStore: Send + Sync {
    async fn exists(&self, hive_id: &str) -> Result<bool, StoreError>;
    async fn add(&self, hive: NewHive) -> Result<HiveLog, StoreError>;
    /// Matching logs, newest `date_placed` first, plus the total match count.
    async fn list(
        &self,
        filter: HiveFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<HiveLog>, i64), StoreError>;
    async fn all(&self) -> Result<Vec<HiveLog>, StoreError>;
}

#[derive(Clone)]
pub struct PgHiveStore {
    db: PgPool,
}

impl PgHiveStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HiveStore for PgHiveStore {
    async fn exists(&self, hive_id: &str) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM hive_logs WHERE hive_id = $1)"#,
        )
        .bind(hive_id)
        .fetch_one(&self.db)
        .await?;
        Ok(found)
    }

    async fn add(&self, hive: NewHive) -> Result<HiveLog, StoreError> {
        let row = sqlx::query_as::<_, HiveLog>(
            r#"
            INSERT INTO hive_logs (hive_id, date_placed, latitude, longitude, num_colonies)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, hive_id, date_placed, latitude, longitude, num_colonies, date_created
            "#,
        )
        .bind(&hive.hive_id)
        .bind(hive.date_placed)
        .bind(hive.latitude)
        .bind(hive.longitude)
        .bind(hive.num_colonies)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(
        &self,
        filter: HiveFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<HiveLog>, i64), StoreError> {
        let rows = sqlx::query_as::<_, HiveLog>(
            r#"
            SELECT id, hive_id, date_placed, latitude, longitude, num_colonies, date_created
            FROM hive_logs
            WHERE ($1::date IS NULL OR date_placed >= $1)
              AND ($2::date IS NULL OR date_placed <= $2)
            ORDER BY date_placed DESC, date_created DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list hive logs")?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM hive_logs
            WHERE ($1::date IS NULL OR date_placed >= $1)
              AND ($2::date IS NULL OR date_placed <= $2)
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.db)
        .await
        .context("count hive logs")?;

        Ok((rows, total))
    }

    async fn all(&self) -> Result<Vec<HiveLog>, StoreError> {
        let rows = sqlx::query_as::<_, HiveLog>(
            r#"
            SELECT id, hive_id, date_placed, latitude, longitude, num_colonies, date_created
            FROM hive_logs
            ORDER BY date_created ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("export hive logs")?;
        Ok(rows)
    }
}
