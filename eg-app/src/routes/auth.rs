//! Registration, login, and identity echo.

use crate::auth::{self, hash_password, verify_password};
use crate::error::{ApiError, validate_field};
use crate::server::AppState;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const MIN_PASSWORD_LEN: usize = 8;

pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[tracing::instrument(level = "info", skip_all)]
async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (email, password) = validate_credentials(&req)?;
    let user = state
        .users
        .create(&email, &hash_password(&password))
        .await
        .map_err(|e| match e {
            eg_store::StoreError::Conflict(_) => {
                ApiError::Conflict("email already registered".to_string())
            }
            other => other.into(),
        })?;

    let token = state.auth.issue(&user.id, &user.email);
    tracing::info!(user_id = %user.id, "user registered");
    Ok(Json(json!({
        "token": token,
        "user": { "userId": user.id, "email": user.email },
    })))
}

#[tracing::instrument(level = "info", skip_all)]
async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (email, password) = validate_credentials(&req)?;
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .filter(|user| verify_password(&password, &user.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".to_string()))?;

    let token = state.auth.issue(&user.id, &user.email);
    Ok(Json(json!({
        "token": token,
        "user": { "userId": user.id, "email": user.email },
    })))
}

#[tracing::instrument(level = "debug", skip_all)]
async fn me(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = auth::identity_from_headers(&state.auth, &headers)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;
    Ok(Json(json!({ "userId": user.user_id, "email": user.email })))
}

fn validate_credentials(req: &CredentialsRequest) -> Result<(String, String), ApiError> {
    let email = validate_field("email", &req.email)?;
    if !email.contains('@') {
        return Err(ApiError::Validation("email is not valid".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok((email, req.password.clone()))
}
