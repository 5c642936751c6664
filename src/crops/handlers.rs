use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::{
    dto::{CreateCropRequest, CreatedCropResponse, NearbyCropsQuery, NearbyCropsResponse},
    geo::GeoPoint,
    repo::{NearbyQuery, NewCrop},
};
use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{AppJson, AppQuery},
    state::AppState,
    validate::Validator,
};

const DEFAULT_RADIUS_KM: f64 = 100.0;
/// Half the Earth's circumference; any larger radius covers the globe.
const MAX_RADIUS_KM: f64 = 20_016.0;

pub fn crop_routes() -> Router<AppState> {
    Router::new()
        .route("/api/crops", post(add_crop))
        .route("/api/crops/nearby", get(nearby_crops))
}

fn validate_new_crop(body: CreateCropRequest) -> Result<NewCrop, AppError> {
    let mut v = Validator::new();
    let name = v.required_str("name", body.name);
    let start = v.date("floweringStart", body.flowering_start.as_deref());
    let end = v.date("floweringEnd", body.flowering_end.as_deref());
    let latitude = v.float_in("latitude", body.latitude.as_ref(), -90.0, 90.0);
    let longitude = v.float_in("longitude", body.longitude.as_ref(), -180.0, 180.0);
    let density = v.int_at_least(
        "recommendedHiveDensity",
        body.recommended_hive_density.as_ref(),
        1,
    );
    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            v.push("floweringEnd", "floweringEnd must be after floweringStart");
        }
    }
    match (name, start, end, latitude, longitude, density) {
        (Some(name), Some(flowering_start), Some(flowering_end), Some(lat), Some(lon), Some(d))
            if v.is_ok() =>
        {
            Ok(NewCrop {
                name,
                flowering_start,
                flowering_end,
                recommended_hive_density: d,
                location: GeoPoint::new(lat, lon),
            })
        }
        _ => Err(v.into_error()),
    }
}

fn validate_nearby(q: NearbyCropsQuery) -> Result<NearbyQuery, AppError> {
    let mut v = Validator::new();
    let latitude = v.float_in("latitude", q.latitude.map(Value::String).as_ref(), -90.0, 90.0);
    let longitude = v.float_in("longitude", q.longitude.map(Value::String).as_ref(), -180.0, 180.0);
    let radius_km = match q.radius {
        None => Some(DEFAULT_RADIUS_KM),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(r) if r.is_finite() && r > 0.0 => Some(r.min(MAX_RADIUS_KM)),
            _ => {
                v.push("radius", "radius must be a positive number of kilometres");
                None
            }
        },
    };
    let date = match q.date {
        None => Some(OffsetDateTime::now_utc().date()),
        Some(raw) => v.optional_date("date", Some(&raw)),
    };
    match (latitude, longitude, radius_km, date) {
        (Some(lat), Some(lon), Some(radius_km), Some(date)) => Ok(NearbyQuery {
            center: GeoPoint::new(lat, lon),
            radius_km,
            date,
        }),
        _ => Err(v.into_error()),
    }
}

#[utoipa::path(
    post,
    path = "/api/crops",
    tag = "crops",
    security(("bearer" = [])),
    request_body = CreateCropRequest,
    responses(
        (status = 201, description = "Crop entry stored", body = CreatedCropResponse),
        (status = 400, description = "Validation error or flowering dates out of order"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn add_crop(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<CreateCropRequest>,
) -> Result<(StatusCode, Json<CreatedCropResponse>), AppError> {
    let new_crop = validate_new_crop(body)?;
    let crop = state.crops.add(new_crop).await?;
    info!(crop_id = %crop.id, name = %crop.name, "crop entry stored");
    Ok((StatusCode::CREATED, Json(CreatedCropResponse { crop })))
}

#[utoipa::path(
    get,
    path = "/api/crops/nearby",
    tag = "crops",
    security(("bearer" = [])),
    params(NearbyCropsQuery),
    responses(
        (status = 200, description = "Crops flowering on the date within the radius, nearest first", body = NearbyCropsResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn nearby_crops(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppQuery(q): AppQuery<NearbyCropsQuery>,
) -> Result<Json<NearbyCropsResponse>, AppError> {
    let query = validate_nearby(q)?;
    let crops = state.crops.find_nearby(query).await?;
    debug!(
        latitude = query.center.latitude(),
        longitude = query.center.longitude(),
        radius_km = query.radius_km,
        found = crops.len(),
        "nearby crop lookup"
    );

    let message = crops.is_empty().then(|| {
        format!(
            "No crops flowering within {} km on {}",
            query.radius_km, query.date
        )
    });
    Ok(Json(NearbyCropsResponse { crops, message }))
}
