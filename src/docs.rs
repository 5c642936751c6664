use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth, crops, error::FieldError, export, hives, state::AppState, sync};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hivetrail API",
        description = "Hive placement logs and flowering-crop calendar for migratory beekeeping"
    ),
    paths(
        auth::handlers::register,
        auth::handlers::login,
        auth::handlers::get_me,
        hives::handlers::add_hive,
        hives::handlers::list_hives,
        crops::handlers::add_crop,
        crops::handlers::nearby_crops,
        export::handlers::export_hives,
        export::handlers::export_crops,
        export::handlers::admin_page,
        sync::sync,
    ),
    components(schemas(
        FieldError,
        auth::Role,
        auth::dto::RegisterRequest,
        auth::dto::RegisterResponse,
        auth::dto::LoginRequest,
        auth::dto::LoginResponse,
        auth::dto::PublicUser,
        auth::dto::MeResponse,
        hives::dto::CreateHiveRequest,
        hives::dto::CreatedHiveResponse,
        hives::dto::ListHivesResponse,
        hives::repo::HiveLog,
        crops::dto::CreateCropRequest,
        crops::dto::CreatedCropResponse,
        crops::dto::NearbyCropsResponse,
        crops::repo::CropEntry,
        crops::geo::GeoPoint,
        crops::geo::GeoKind,
        sync::SyncResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth"),
        (name = "hives"),
        (name = "crops"),
        (name = "admin"),
        (name = "sync")
    )
)]
pub struct ApiDoc;

/// Swagger UI under `/api-docs`, raw document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/api-docs").url("/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/register",
            "/auth/login",
            "/me",
            "/api/hives",
            "/api/crops",
            "/api/crops/nearby",
            "/export/hives",
            "/export/crops",
            "/admin",
            "/sync",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
