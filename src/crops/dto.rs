use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use super::repo::CropEntry;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCropRequest {
    #[schema(example = "Sunflower")]
    pub name: Option<String>,
    #[schema(example = "2025-04-10")]
    pub flowering_start: Option<String>,
    #[schema(example = "2025-04-25")]
    pub flowering_end: Option<String>,
    #[schema(value_type = f64, example = 26.9124)]
    pub latitude: Option<Value>,
    #[schema(value_type = f64, example = 75.7873)]
    pub longitude: Option<Value>,
    #[schema(value_type = i32, example = 5)]
    pub recommended_hive_density: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedCropResponse {
    pub crop: CropEntry,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyCropsQuery {
    /// Required, -90..=90.
    pub latitude: Option<String>,
    /// Required, -180..=180.
    pub longitude: Option<String>,
    /// Search radius in kilometres, default 100.
    pub radius: Option<String>,
    /// Day the crop must be flowering on, default today (UTC).
    pub date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyCropsResponse {
    pub crops: Vec<CropEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
