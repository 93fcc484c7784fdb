//! Registration, login, and token refresh

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use finwise_core::models::{NewUser, Role, User};

use crate::auth::{
    hash_password, issue_access_token, issue_refresh_token, verify_password, verify_token,
};
use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub income: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// POST /api/register - Create a new user account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if body.username.trim().is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(AppError::bad_request("A valid email is required"));
    }
    if body.password.len() < 8 {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let password_hash =
        hash_password(&body.password).map_err(AppError::bad_request)?;

    let user = state
        .db
        .create_user(&NewUser {
            username: body.username.trim().to_string(),
            email: body.email.trim().to_string(),
            password_hash,
            phone: body.phone,
            income: body.income.unwrap_or(Decimal::ZERO),
            // Everyone registers as a regular user; promotion is a separate step
            role: Role::User,
        })
        .map_err(|e| match e {
            finwise_core::Error::InvalidData(msg) => AppError::conflict(&msg),
            other => other.into(),
        })?;

    info!(username = %user.username, "Registered new user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/login - Exchange credentials for an access/refresh token pair
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let invalid = || AppError::unauthorized("Invalid username or password");

    let stored_hash = state
        .db
        .get_password_hash(&body.username)?
        .ok_or_else(invalid)?;
    if !verify_password(&body.password, &stored_hash) {
        return Err(invalid());
    }

    let user = state
        .db
        .get_user_by_username(&body.username)?
        .ok_or_else(invalid)?;

    let access = issue_access_token(user.id, &user.username, user.role, &state.config.jwt_secret)?;
    let refresh =
        issue_refresh_token(user.id, &user.username, user.role, &state.config.jwt_secret)?;

    info!(username = %user.username, "User logged in");
    Ok(Json(TokenPair { access, refresh }))
}

/// POST /api/login/refresh - Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AccessToken>, AppError> {
    let claims = verify_token(&body.refresh, "refresh", &state.config.jwt_secret)
        .map_err(|_| AppError::unauthorized("Refresh token is invalid or expired"))?;

    // Re-read the user so role changes and deletions take effect on refresh
    let user = state
        .db
        .get_user(claims.sub)?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    let access = issue_access_token(user.id, &user.username, user.role, &state.config.jwt_secret)?;
    Ok(Json(AccessToken { access }))
}
