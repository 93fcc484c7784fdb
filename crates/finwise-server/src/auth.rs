//! JWT auth and password hashing
//!
//! Login issues an access/refresh token pair (HS256). The auth middleware
//! validates access tokens on every request except the public auth routes
//! and stashes the caller's identity in request extensions.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use finwise_core::models::Role;

use crate::AppState;

/// Access token lifetime in seconds (60 minutes)
pub const ACCESS_TTL_SECS: i64 = 60 * 60;

/// Refresh token lifetime in seconds (7 days)
pub const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Routes reachable without a token
const PUBLIC_PATHS: &[&str] = &["/api/register", "/api/login", "/api/login/refresh"];

/// JWT claims for both token types
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    pub username: String,
    pub role: String,
    /// "access" or "refresh"
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, inserted into request extensions by the middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| format!("Failed to hash password: {}", e))
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn issue_token(
    user_id: i64,
    username: &str,
    role: Role,
    typ: &str,
    ttl_secs: i64,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role: role.as_str().to_string(),
        typ: typ.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Issue an access token
pub fn issue_access_token(
    user_id: i64,
    username: &str,
    role: Role,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token(user_id, username, role, "access", ACCESS_TTL_SECS, secret)
}

/// Issue a refresh token
pub fn issue_refresh_token(
    user_id: i64,
    username: &str,
    role: Role,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token(user_id, username, role, "refresh", REFRESH_TTL_SECS, secret)
}

/// Decode and validate a token of the expected type
pub fn verify_token(token: &str, expected_typ: &str, secret: &str) -> Result<Claims, String> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| format!("Invalid token: {}", e))?;

    if data.claims.typ != expected_typ {
        return Err(format!(
            "Expected {} token, got {}",
            expected_typ, data.claims.typ
        ));
    }
    Ok(data.claims)
}

/// Bearer-token authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if PUBLIC_PATHS.contains(&path) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "));

    let Some(token) = token else {
        warn!(path, "Unauthorized request - missing bearer token");
        return unauthorized("Authentication credentials were not provided");
    };

    match verify_token(token, "access", &state.config.jwt_secret) {
        Ok(claims) => {
            let role = claims.role.parse().unwrap_or(Role::User);
            request.extensions_mut().insert(AuthUser {
                user_id: claims.sub,
                username: claims.username,
                role,
            });
            next.run(request).await
        }
        Err(e) => {
            warn!(path, error = %e, "Unauthorized request - invalid token");
            unauthorized("Token is invalid or expired")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
