use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        error::AuthError,
        extractors::{AdminUser, AuthUser},
        jwt::JwtKeys,
        services,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/currentUser", get(current_user))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/:id", get(get_user))
}

fn bad_body(e: JsonRejection) -> AuthError {
    warn!(error = %e, "rejected request body");
    AuthError::Validation(vec![e.body_text()])
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let input = payload.validate()?;
    let user = services::register(state.users.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let input = payload.validate()?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::login(state.users.as_ref(), &keys, input).await?;
    Ok(Json(res))
}

#[instrument(skip(state, claims))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = services::find_user(
        state.users.as_ref(),
        claims.identity.id,
        &claims.identity.username,
    )
    .await?;
    Ok(Json(user))
}

#[instrument(skip(state, admin))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, Response> {
    match services::find_user_by_id(state.users.as_ref(), id).await {
        Ok(user) => Ok(Json(user)),
        Err(AuthError::UserNotFound) => {
            warn!(admin_id = admin.identity.id, user_id = id, "user not found");
            Err((StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" }))).into_response())
        }
        Err(e) => Err(e.into_response()),
    }
}
