use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Role,
        dto::{LoginRequest, LoginResponse, MeResponse, PublicUser, RegisterRequest, RegisterResponse},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::{AppError, StoreError},
    extract::AppJson,
    state::AppState,
    validate::Validator,
};

const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Validation error or username taken")
    )
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let mut v = Validator::new();
    let username = v.required_str("username", payload.username);
    let password = match payload.password {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LEN => Some(p),
        _ => {
            v.push(
                "password",
                &format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            );
            None
        }
    };
    let role = match payload.role.as_deref().map(str::parse::<Role>) {
        Some(Ok(role)) => Some(role),
        _ => {
            v.push("role", "role must be one of: beekeeper, admin");
            None
        }
    };
    let (Some(username), Some(password), Some(role)) = (username, password, role) else {
        return Err(v.into_error());
    };

    if state.users.find_by_username(&username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AppError::Conflict("Username already exists".into()));
    }

    let hash = hash_password(&password)?;

    // The unique index on users.username settles concurrent registrations.
    let user = match state.users.create(&username, &hash, role).await {
        Ok(u) => u,
        Err(StoreError::Duplicate(_)) => {
            warn!(%username, "username taken by concurrent registration");
            return Err(AppError::Conflict("Username already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, username = %user.username, role = %user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: PublicUser {
                id: user.id,
                username: user.username,
                role: user.role,
            },
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed session token", body = LoginResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut v = Validator::new();
    let username = v.required_str("username", payload.username);
    let password = match payload.password {
        Some(p) if !p.is_empty() => Some(p),
        _ => {
            v.push("password", "password is required");
            None
        }
    };
    let (Some(username), Some(password)) = (username, password) else {
        return Err(v.into_error());
    };

    let Some(user) = state.users.find_by_username(&username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let (token, issued_sync_token) = keys.sign(&user)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(LoginResponse {
        token,
        issued_sync_token,
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Identity carried by the token", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[instrument(skip_all)]
pub async fn get_me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: claims.sub,
        username: claims.username,
        role: claims.role,
        issued_sync_token: claims.issued_sync_token,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::test_support::{call, login_token, register};

    #[tokio::test]
    async fn register_then_login_yields_token_for_same_identity() {
        let app = crate::test_support::app();
        let (status, body) = register(&app, "bee1", "password123", "beekeeper").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "bee1");
        assert!(body.get("token").is_none());

        let token = login_token(&app, "bee1", "password123").await;
        let (status, me) = call(&app, "GET", "/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "bee1");
        assert_eq!(me["role"], "beekeeper");
        assert!(me["issuedSyncToken"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn second_registration_of_username_conflicts() {
        let app = crate::test_support::app();
        register(&app, "bee1", "password123", "beekeeper").await;
        let (status, body) = register(&app, "bee1", "different1", "admin").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username already exists");
    }

    #[tokio::test]
    async fn register_reports_each_invalid_field() {
        let app = crate::test_support::app();
        let (status, body) = call(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "  ", "password": "12345", "role": "queen" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, ["username", "password", "role"]);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = crate::test_support::app();
        let (status, body) = call(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": 42 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "body");
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let app = crate::test_support::app();
        register(&app, "bee1", "password123", "beekeeper").await;

        let (s1, unknown) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "password123" })),
        )
        .await;
        let (s2, wrong) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "bee1", "password": "password124" })),
        )
        .await;
        assert_eq!(s1, StatusCode::BAD_REQUEST);
        assert_eq!(s2, StatusCode::BAD_REQUEST);
        assert_eq!(unknown, wrong);
        assert_eq!(unknown, json!({ "error": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn me_requires_bearer_token() {
        let app = crate::test_support::app();
        let (status, _) = call(&app, "GET", "/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body): (StatusCode, Value) =
            call(&app, "GET", "/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_admit_one_user() {
        let app = crate::test_support::app();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let app = app.clone();
                tokio::spawn(async move { register(&app, "bee1", "password123", "beekeeper").await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            let (status, body) = handle.await.unwrap();
            if status == StatusCode::CREATED {
                created += 1;
            } else {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, json!({ "error": "Username already exists" }));
            }
        }
        assert_eq!(created, 1);
    }
}
