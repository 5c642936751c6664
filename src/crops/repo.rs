use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use super::geo::GeoPoint;
use crate::error::StoreError;

/// Flowering-crop calendar entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CropEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "crate::validate::iso_date")]
    #[schema(value_type = String, format = Date, example = "2025-04-10")]
    pub flowering_start: Date,
    #[serde(with = "crate::validate::iso_date")]
    #[schema(value_type = String, format = Date, example = "2025-04-25")]
    pub flowering_end: Date,
    pub recommended_hive_density: i32,
    pub location: GeoPoint,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub date_created: OffsetDateTime,
}

impl CropEntry {
    /// Inclusive on both ends.
    pub fn is_flowering_on(&self, date: Date) -> bool {
        self.flowering_start <= date && date <= self.flowering_end
    }
}

#[derive(FromRow)]
struct CropRow {
    id: Uuid,
    name: String,
    flowering_start: Date,
    flowering_end: Date,
    recommended_hive_density: i32,
    latitude: f64,
    longitude: f64,
    date_created: OffsetDateTime,
}

impl From<CropRow> for CropEntry {
    fn from(r: CropRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            flowering_start: r.flowering_start,
            flowering_end: r.flowering_end,
            recommended_hive_density: r.recommended_hive_density,
            location: GeoPoint::new(r.latitude, r.longitude),
            date_created: r.date_created,
        }
    }
}

/// Validated input for a new crop entry; `flowering_start < flowering_end`.
#[derive(Debug, Clone)]
pub struct NewCrop {
    pub name: String,
    pub flowering_start: Date,
    pub flowering_end: Date,
    pub recommended_hive_density: i32,
    pub location: GeoPoint,
}

/// Crops flowering on `date` within `radius_km` of `center`.
#[derive(Debug, Clone, Copy)]
pub struct NearbyQuery {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub date: Date,
}

#[async_trait]
pub trait CropStore: Send + Sync {
    async fn add(&self, crop: NewCrop) -> Result<CropEntry, StoreError>;
    /// Matching entries, nearest first.
    async fn find_nearby(&self, query: NearbyQuery) -> Result<Vec<CropEntry>, StoreError>;
    async fn all(&self) -> Result<Vec<CropEntry>, StoreError>;
}

#[derive(Clone)]
pub struct PgCropStore {
    db: PgPool,
}

impl PgCropStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CropStore for PgCropStore {
    async fn add(&self, crop: NewCrop) -> Result<CropEntry, StoreError> {
        let row = sqlx::query_as::<_, CropRow>(
            r#"
            INSERT INTO crop_entries
                (name, flowering_start, flowering_end, recommended_hive_density, location)
            VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($5, $6), 4326)::geography)
            RETURNING id, name, flowering_start, flowering_end, recommended_hive_density,
                      ST_Y(location::geometry) AS latitude,
                      ST_X(location::geometry) AS longitude,
                      date_created
            "#,
        )
        .bind(&crop.name)
        .bind(crop.flowering_start)
        .bind(crop.flowering_end)
        .bind(crop.recommended_hive_density)
        .bind(crop.location.longitude())
        .bind(crop.location.latitude())
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn find_nearby(&self, query: NearbyQuery) -> Result<Vec<CropEntry>, StoreError> {
        // use_spheroid = false: great-circle distance on the mean sphere.
        let rows = sqlx::query_as::<_, CropRow>(
            r#"
            WITH origin AS (
                SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS point
            )
            SELECT c.id, c.name, c.flowering_start, c.flowering_end, c.recommended_hive_density,
                   ST_Y(c.location::geometry) AS latitude,
                   ST_X(c.location::geometry) AS longitude,
                   c.date_created
            FROM crop_entries c, origin o
            WHERE ST_DWithin(c.location, o.point, $3, false)
              AND c.flowering_start <= $4
              AND c.flowering_end >= $4
            ORDER BY ST_Distance(c.location, o.point, false) ASC
            "#,
        )
        .bind(query.center.longitude())
        .bind(query.center.latitude())
        .bind(query.radius_km * 1000.0)
        .bind(query.date)
        .fetch_all(&self.db)
        .await
        .context("find nearby crops")?;
        Ok(rows.into_iter().map(CropEntry::from).collect())
    }

    async fn all(&self) -> Result<Vec<CropEntry>, StoreError> {
        let rows = sqlx::query_as::<_, CropRow>(
            r#"
            SELECT id, name, flowering_start, flowering_end, recommended_hive_density,
                   ST_Y(location::geometry) AS latitude,
                   ST_X(location::geometry) AS longitude,
                   date_created
            FROM crop_entries
            ORDER BY date_created ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("export crop entries")?;
        Ok(rows.into_iter().map(CropEntry::from).collect())
    }
}
