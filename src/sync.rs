use axum::{routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::jwt::{sync_token_now, AuthUser},
    state::AppState,
};

/// Advisory only: clients compare it with a stored token to decide whether to refetch.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub sync_token: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/sync", get(sync))
}

#[utoipa::path(
    get,
    path = "/sync",
    tag = "sync",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current server timestamp (unix ms)", body = SyncResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn sync(AuthUser(_user): AuthUser) -> Json<SyncResponse> {
    Json(SyncResponse {
        sync_token: sync_token_now(),
    })
}
