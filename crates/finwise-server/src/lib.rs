//! Finwise Web Server
//!
//! Axum-based REST API for the Finwise personal finance backend.
//!
//! Security features:
//! - JWT bearer authentication (access + refresh tokens)
//! - Argon2id password hashing
//! - Owner-scoped querysets (admins see all rows, users see their own)
//! - Restrictive CORS policy and security headers
//! - Sanitized error responses

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use finwise_core::db::{Database, MonthlyTotals};
use finwise_core::ml::store::ModelStore;

pub mod auth;
mod handlers;

/// Environment variable holding the JWT signing secret
pub const JWT_SECRET_ENV: &str = "FINWISE_JWT_SECRET";

/// TTL for cached monthly-spending responses (15 minutes)
pub const ANALYTICS_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// HS256 signing secret for access/refresh tokens
    pub jwt_secret: String,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Directory holding model artifacts
    pub models_dir: PathBuf,
    /// Labelled sample CSV for categorizer training
    pub sample_csv: PathBuf,
}

impl ServerConfig {
    /// Build a config from the environment
    ///
    /// Fails when `FINWISE_JWT_SECRET` is unset; tokens signed with a
    /// default secret would be forgeable.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var(JWT_SECRET_ENV)
            .map_err(|_| anyhow::anyhow!("{} must be set to sign auth tokens", JWT_SECRET_ENV))?;

        let allowed_origins = std::env::var("FINWISE_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let models_dir = std::env::var("FINWISE_MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models"));

        Ok(Self {
            jwt_secret,
            allowed_origins,
            sample_csv: models_dir.join("data/sample_txn_categories.csv"),
            models_dir,
        })
    }

    /// Config for tests: fixed secret, models in a caller-supplied dir
    pub fn for_tests(models_dir: PathBuf) -> Self {
        Self {
            jwt_secret: "test-only-secret".to_string(),
            allowed_origins: vec![],
            sample_csv: models_dir.join("data/sample_txn_categories.csv"),
            models_dir,
        }
    }
}

/// Cache key for the monthly-spending endpoint: (target user, months window)
pub type AnalyticsCacheKey = (i64, u32);

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Model artifact store rooted at `config.models_dir`
    pub store: ModelStore,
    /// Read-through cache for monthly-spending responses
    pub analytics_cache: moka::sync::Cache<AnalyticsCacheKey, Vec<MonthlyTotals>>,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let store = ModelStore::new(config.models_dir.clone());
    let analytics_cache = moka::sync::Cache::builder()
        .max_capacity(10_000)
        .time_to_live(ANALYTICS_CACHE_TTL)
        .build();

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        store,
        analytics_cache,
    });

    let api_routes = Router::new()
        // Auth
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/login/refresh", post(handlers::refresh))
        // Current user
        .route("/me", get(handlers::me))
        // Users (admin only)
        .route(
            "/users",
            get(handlers::list_users).post(handlers::admin_create_user),
        )
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Budgets
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route(
            "/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        // Goals
        .route(
            "/goals",
            get(handlers::list_goals).post(handlers::create_goal),
        )
        .route(
            "/goals/:id",
            get(handlers::get_goal)
                .put(handlers::update_goal)
                .delete(handlers::delete_goal),
        )
        // Analytics
        .route(
            "/analytics/monthly-spending",
            get(handlers::monthly_spending),
        )
        .route(
            "/analytics/category-spending",
            get(handlers::category_spending),
        )
        .route(
            "/analytics/savings-vs-expense",
            get(handlers::savings_vs_expense),
        )
        // Categorization and forecasting
        .route(
            "/ai/categorize-transaction",
            post(handlers::categorize_title),
        )
        .route("/ai/predict-spending", get(handlers::predict_spending))
        .route("/ai/spending-trend", get(handlers::spending_trend))
        // Insights
        .route("/insights/predict-monthly", get(handlers::predict_monthly));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    if config.allowed_origins.is_empty() {
        info!("CORS: same-origin only");
    } else {
        warn!(origins = ?config.allowed_origins, "CORS: cross-origin requests allowed");
    }

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Set for validation errors, keys the message by field name
    field: Option<&'static str>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            field: None,
            internal: None,
        }
    }

    /// 400 with a field-level payload: `{"<field>": "<msg>"}`
    pub fn validation(field: &'static str, msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            field: Some(field),
            internal: None,
        }
    }

    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.to_string(),
            field: None,
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            field: None,
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            field: None,
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            field: None,
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.field {
            Some(field) => Json(serde_json::json!({ field: self.message })),
            None => Json(serde_json::json!({ "error": self.message })),
        };

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            field: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
