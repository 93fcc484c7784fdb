//! User management handlers (admin only)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use axum::http::StatusCode;
use finwise_core::models::{NewUser, Role, User};

use crate::auth::{hash_password, AuthUser};
use crate::{AppError, AppState};

fn require_admin(auth: &AuthUser) -> Result<(), AppError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

/// GET /api/me - The authenticated user's profile
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let user = state
        .db
        .get_user(auth.user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub income: Option<Decimal>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// POST /api/users - Create a user with an explicit role
pub async fn admin_create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_admin(&auth)?;

    if body.username.trim().is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }
    if !body.email.contains('@') {
        return Err(AppError::bad_request("A valid email is required"));
    }
    if body.password.len() < 8 {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let password_hash = hash_password(&body.password).map_err(AppError::bad_request)?;
    let user = state
        .db
        .create_user(&NewUser {
            username: body.username,
            email: body.email,
            password_hash,
            phone: body.phone,
            income: body.income.unwrap_or_default(),
            role: body.role.unwrap_or(Role::User),
        })
        .map_err(|e| match e {
            finwise_core::Error::InvalidData(msg) => AppError::conflict(&msg),
            other => other.into(),
        })?;
    info!(user_id = user.id, admin = %auth.username, "Admin created user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users - List all users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&auth)?;
    Ok(Json(state.db.list_users()?))
}

/// GET /api/users/:id - Get one user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    require_admin(&auth)?;
    let user = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub income: Option<Decimal>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// PUT /api/users/:id - Update a user's profile, credentials, or role
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    require_admin(&auth)?;

    if state.db.get_user(id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    if let Some(email) = &body.email {
        if !email.contains('@') {
            return Err(AppError::bad_request("A valid email is required"));
        }
    }

    let password_hash = match &body.password {
        Some(pw) if pw.len() < 8 => {
            return Err(AppError::bad_request(
                "Password must be at least 8 characters",
            ))
        }
        Some(pw) => Some(hash_password(pw).map_err(AppError::bad_request)?),
        None => None,
    };

    let mut user = state.db.update_user(
        id,
        body.email.as_deref(),
        body.phone.as_deref(),
        body.income,
        password_hash.as_deref(),
    )?;

    if let Some(role) = body.role {
        user = state.db.update_user_role(id, role)?;
        info!(user_id = id, role = %role, admin = %auth.username, "Changed user role");
    }

    Ok(Json(user))
}

/// DELETE /api/users/:id - Delete a user and all their data
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&auth)?;
    if auth.user_id == id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }
    if !state.db.delete_user(id)? {
        return Err(AppError::not_found("User not found"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
