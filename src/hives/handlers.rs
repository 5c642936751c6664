use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument, warn};

use super::{
    dto::{CreateHiveRequest, CreatedHiveResponse, ListHivesQuery, ListHivesResponse},
    repo::{HiveFilter, NewHive},
};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, StoreError},
    extract::{AppJson, AppQuery},
    state::AppState,
    validate::Validator,
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

pub fn hive_routes() -> Router<AppState> {
    Router::new().route("/api/hives", get(list_hives).post(add_hive))
}

fn validate_new_hive(body: CreateHiveRequest) -> Result<NewHive, AppError> {
    let mut v = Validator::new();
    let hive_id = v.required_str("hiveId", body.hive_id);
    let date_placed = v.date("datePlaced", body.date_placed.as_deref());
    let latitude = v.float_in("latitude", body.latitude.as_ref(), -90.0, 90.0);
    let longitude = v.float_in("longitude", body.longitude.as_ref(), -180.0, 180.0);
    let num_colonies = v.int_at_least("numColonies", body.num_colonies.as_ref(), 1);
    match (hive_id, date_placed, latitude, longitude, num_colonies) {
        (Some(hive_id), Some(date_placed), Some(latitude), Some(longitude), Some(num_colonies)) => {
            Ok(NewHive {
                hive_id,
                date_placed,
                latitude,
                longitude,
                num_colonies,
            })
        }
        _ => Err(v.into_error()),
    }
}

/// Parses an optional positive integer query value.
fn positive(v: &mut Validator, field: &str, raw: Option<&str>, default: i64) -> i64 {
    match raw.map(|s| s.trim().parse::<i64>()) {
        None => default,
        Some(Ok(n)) if n >= 1 => n,
        _ => {
            v.push(field, &format!("{field} must be a positive integer"));
            default
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/hives",
    tag = "hives",
    security(("bearer" = [])),
    request_body = CreateHiveRequest,
    responses(
        (status = 201, description = "Hive logged", body = CreatedHiveResponse),
        (status = 400, description = "Validation error or duplicate hiveId"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn add_hive(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<CreateHiveRequest>,
) -> Result<(StatusCode, Json<CreatedHiveResponse>), AppError> {
    let new_hive = validate_new_hive(body)?;

    if state.hives.exists(&new_hive.hive_id).await? {
        warn!(hive_id = %new_hive.hive_id, "hive id already logged");
        return Err(AppError::Conflict("Hive ID already exists".into()));
    }

    let hive = match state.hives.add(new_hive).await {
        Ok(h) => h,
        Err(StoreError::Duplicate(_)) => {
            return Err(AppError::Conflict("Hive ID already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(hive_id = %hive.hive_id, colonies = hive.num_colonies, "hive logged");
    Ok((StatusCode::CREATED, Json(CreatedHiveResponse { hive })))
}

#[utoipa::path(
    get,
    path = "/api/hives",
    tag = "hives",
    security(("bearer" = [])),
    params(ListHivesQuery),
    responses(
        (status = 200, description = "Page of hive logs, newest placement first", body = ListHivesResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn list_hives(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppQuery(q): AppQuery<ListHivesQuery>,
) -> Result<Json<ListHivesResponse>, AppError> {
    let mut v = Validator::new();
    let start_date = v.optional_date("startDate", q.start_date.as_deref());
    let end_date = v.optional_date("endDate", q.end_date.as_deref());
    let page = positive(&mut v, "page", q.page.as_deref(), 1);
    let limit = positive(&mut v, "limit", q.limit.as_deref(), DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if s > e {
            v.push("endDate", "endDate must not be before startDate");
        }
    }
    v.finish()?;

    let filter = HiveFilter {
        start_date,
        end_date,
    };
    let offset = (page - 1).saturating_mul(limit);
    let (hives, total) = state.hives.list(filter, limit, offset).await?;
    let pages = (total + limit - 1) / limit;

    Ok(Json(ListHivesResponse {
        hives,
        total,
        page,
        pages,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::test_support::{app, call, token_for};

    fn hive(id: &str, date: &str) -> Value {
        json!({
            "hiveId": id,
            "datePlaced": date,
            "latitude": 28.7041,
            "longitude": 77.1025,
            "numColonies": 5
        })
    }

    #[tokio::test]
    async fn duplicate_hive_id_is_rejected() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;

        let (status, body) =
            call(&app, "POST", "/api/hives", Some(&token), Some(hive("HIVE004", "2025-04-08"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["hive"]["hiveId"], "HIVE004");
        assert_eq!(body["hive"]["datePlaced"], "2025-04-08");
        assert!(body["hive"]["dateCreated"].is_string());

        let (status, body) =
            call(&app, "POST", "/api/hives", Some(&token), Some(hive("HIVE004", "2025-04-08"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Hive ID already exists");
    }

    #[tokio::test]
    async fn add_requires_token() {
        let app = app();
        let (status, _) = call(&app, "POST", "/api/hives", None, Some(hive("H1", "2025-04-08"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn add_validates_ranges() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;
        let body = json!({
            "hiveId": "H1",
            "datePlaced": "yesterday",
            "latitude": -90.5,
            "longitude": 180.1,
            "numColonies": 0
        });
        let (status, body) = call(&app, "POST", "/api/hives", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;
        for (id, date) in [
            ("H1", "2025-03-01"),
            ("H2", "2025-04-05"),
            ("H3", "2025-04-10"),
            ("H4", "2025-04-20"),
            ("H5", "2025-05-02"),
        ] {
            let (status, _) = call(&app, "POST", "/api/hives", Some(&token), Some(hive(id, date))).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = call(
            &app,
            "GET",
            "/api/hives?startDate=2025-04-01&endDate=2025-04-30&page=1&limit=2",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["page"], 1);
        assert_eq!(body["pages"], 2);
        let ids: Vec<&str> = body["hives"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["hiveId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["H4", "H3"]);

        let (_, body) = call(
            &app,
            "GET",
            "/api/hives?startDate=2025-04-01&endDate=2025-04-30&page=2&limit=2",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(body["hives"][0]["hiveId"], "H2");
        assert_eq!(body["hives"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_defaults_to_first_page_of_ten() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;
        for i in 0..12 {
            let id = format!("H{i:02}");
            call(&app, "POST", "/api/hives", Some(&token), Some(hive(&id, "2025-04-08"))).await;
        }
        let (status, body) = call(&app, "GET", "/api/hives", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hives"].as_array().unwrap().len(), 10);
        assert_eq!(body["total"], 12);
        assert_eq!(body["page"], 1);
        assert_eq!(body["pages"], 2);
    }

    #[tokio::test]
    async fn empty_store_lists_zero_pages() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;
        let (status, body) = call(&app, "GET", "/api/hives", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "hives": [], "total": 0, "page": 1, "pages": 0 }));
    }

    #[tokio::test]
    async fn list_rejects_bad_query_values() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;
        let (status, body) = call(
            &app,
            "GET",
            "/api/hives?page=0&limit=abc&startDate=2025-05-01&endDate=2025-04-01",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, ["page", "limit", "endDate"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_posts_of_one_hive_id_store_one_log() {
        let app = app();
        let token = token_for(&app, "bee1", "beekeeper").await;
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let app = app.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    call(&app, "POST", "/api/hives", Some(&token), Some(hive("HIVE004", "2025-04-08"))).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            let (status, body) = handle.await.unwrap();
            if status == StatusCode::CREATED {
                created += 1;
            } else {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, json!({ "error": "Hive ID already exists" }));
            }
        }
        assert_eq!(created, 1);

        let (_, body) = call(&app, "GET", "/api/hives", Some(&token), None).await;
        assert_eq!(body["total"], 1);
    }
}
