use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use super::repo::HiveLog;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHiveRequest {
    pub hive_id: Option<String>,
    #[schema(example = "2025-04-08")]
    pub date_placed: Option<String>,
    #[schema(value_type = f64, example = 28.7041)]
    pub latitude: Option<Value>,
    #[schema(value_type = f64, example = 77.1025)]
    pub longitude: Option<Value>,
    #[schema(value_type = i32, example = 5)]
    pub num_colonies: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedHiveResponse {
    pub hive: HiveLog,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListHivesQuery {
    /// Earliest `datePlaced`, inclusive.
    pub start_date: Option<String>,
    /// Latest `datePlaced`, inclusive.
    pub end_date: Option<String>,
    /// 1-indexed page, default 1.
    pub page: Option<String>,
    /// Page size, default 10.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListHivesResponse {
    pub hives: Vec<HiveLog>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}
