use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tracing::{info, instrument};

use super::csv_rows::{to_csv, CropCsvRow, HiveCsvRow, CROP_HEADERS, HIVE_HEADERS};
use crate::{auth::jwt::AdminUser, error::AppError, state::AppState};

const ADMIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Hivetrail admin</title></head>
  <body>
    <h1>Hivetrail admin</h1>
    <ul>
      <li><a href="/export/hives">Export hive logs (CSV)</a></li>
      <li><a href="/export/crops">Export crop calendar (CSV)</a></li>
      <li><a href="/api-docs">API documentation</a></li>
    </ul>
  </body>
</html>
"#;

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/export/hives", get(export_hives))
        .route("/export/crops", get(export_crops))
        .route("/admin", get(admin_page))
}

fn csv_attachment(filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

#[utoipa::path(
    get,
    path = "/export/hives",
    tag = "admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All hive logs as CSV", body = String, content_type = "text/csv"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[instrument(skip_all, fields(user_id = %admin.sub))]
pub async fn export_hives(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let hives = state.hives.all().await?;
    let body = to_csv(&HIVE_HEADERS, hives.iter().map(HiveCsvRow::from))?;
    info!(rows = hives.len(), "hive logs exported");
    Ok(csv_attachment("hives.csv", body))
}

#[utoipa::path(
    get,
    path = "/export/crops",
    tag = "admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All crop entries as CSV", body = String, content_type = "text/csv"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[instrument(skip_all, fields(user_id = %admin.sub))]
pub async fn export_crops(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let crops = state.crops.all().await?;
    let body = to_csv(&CROP_HEADERS, crops.iter().map(CropCsvRow::from))?;
    info!(rows = crops.len(), "crop entries exported");
    Ok(csv_attachment("crops.csv", body))
}

#[utoipa::path(
    get,
    path = "/admin",
    tag = "admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Admin link page", body = String, content_type = "text/html"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn admin_page(AdminUser(_admin): AdminUser) -> Html<&'static str> {
    Html(ADMIN_PAGE)
}
