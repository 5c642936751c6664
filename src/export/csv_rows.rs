use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{crops::repo::CropEntry, hives::repo::HiveLog};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HiveCsvRow<'a> {
    hive_id: &'a str,
    #[serde(with = "crate::validate::iso_date")]
    date_placed: Date,
    latitude: f64,
    longitude: f64,
    num_colonies: i32,
    #[serde(with = "time::serde::rfc3339")]
    date_created: OffsetDateTime,
}

impl<'a> From<&'a HiveLog> for HiveCsvRow<'a> {
    fn from(h: &'a HiveLog) -> Self {
        Self {
            hive_id: &h.hive_id,
            date_placed: h.date_placed,
            latitude: h.latitude,
            longitude: h.longitude,
            num_colonies: h.num_colonies,
            date_created: h.date_created,
        }
    }
}

/// Crop row with the point flattened back into latitude/longitude columns.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropCsvRow<'a> {
    name: &'a str,
    #[serde(with = "crate::validate::iso_date")]
    flowering_start: Date,
    #[serde(with = "crate::validate::iso_date")]
    flowering_end: Date,
    recommended_hive_density: i32,
    latitude: f64,
    longitude: f64,
    #[serde(with = "time::serde::rfc3339")]
    date_created: OffsetDateTime,
}

impl<'a> From<&'a CropEntry> for CropCsvRow<'a> {
    fn from(c: &'a CropEntry) -> Self {
        Self {
            name: &c.name,
            flowering_start: c.flowering_start,
            flowering_end: c.flowering_end,
            recommended_hive_density: c.recommended_hive_density,
            latitude: c.location.latitude(),
            longitude: c.location.longitude(),
            date_created: c.date_created,
        }
    }
}

pub const HIVE_HEADERS: [&str; 6] = [
    "hiveId",
    "datePlaced",
    "latitude",
    "longitude",
    "numColonies",
    "dateCreated",
];

pub const CROP_HEADERS: [&str; 7] = [
    "name",
    "floweringStart",
    "floweringEnd",
    "recommendedHiveDensity",
    "latitude",
    "longitude",
    "dateCreated",
];

/// Writes `rows` under `headers`; the header row is present even when `rows` is empty.
pub fn to_csv<T: Serialize>(headers: &[&str], rows: impl IntoIterator<Item = T>) -> anyhow::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(headers)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
