//! Analytics handlers
//!
//! All three endpoints accept an optional `user_id` query parameter that
//! lets admins inspect another user's numbers; non-admins get 403 for it.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use finwise_core::db::{CategoryTotal, MonthlyTotals, SavingsSummary};
use finwise_core::series;

use crate::auth::AuthUser;
use crate::{AppError, AppState};

/// Default window for monthly spending
const DEFAULT_MONTHS: u32 = 6;

/// Largest accepted window
const MAX_MONTHS: u32 = 36;

/// Resolve which user's data to report on
fn resolve_target(auth: &AuthUser, user_id: Option<i64>) -> Result<i64, AppError> {
    match user_id {
        Some(id) if auth.is_admin() => Ok(id),
        Some(_) => Err(AppError::forbidden(
            "Only admins may query other users' analytics",
        )),
        None => Ok(auth.user_id),
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthlySpendingQuery {
    pub months: Option<u32>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MonthlySpendingResponse {
    pub months: Vec<MonthlyTotals>,
}

/// GET /api/analytics/monthly-spending - Zero-filled per-month income/expense
///
/// Responses are cached for 15 minutes per (user, window).
pub async fn monthly_spending(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<MonthlySpendingQuery>,
) -> Result<Json<MonthlySpendingResponse>, AppError> {
    let target = resolve_target(&auth, params.user_id)?;
    let months = params.months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS);

    if let Some(cached) = state.analytics_cache.get(&(target, months)) {
        debug!(user_id = target, months, "Monthly spending served from cache");
        return Ok(Json(MonthlySpendingResponse { months: cached }));
    }

    let today = Utc::now().date_naive();
    let window = series::window_ending_at(today, months);
    let start = series::parse_month(&window[0])
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap());

    let totals = state.db.monthly_totals_since(target, start)?;
    let filled: Vec<MonthlyTotals> = series::fill_monthly_totals(&totals, &window)
        .into_iter()
        .map(|mut m| {
            // First-of-month dates in the response, matching the date columns
            m.month = format!("{}-01", m.month);
            m
        })
        .collect();

    state.analytics_cache.insert((target, months), filled.clone());
    Ok(Json(MonthlySpendingResponse { months: filled }))
}

#[derive(Debug, Deserialize)]
pub struct CategorySpendingQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CategorySpendingResponse {
    pub categories: Vec<CategoryTotal>,
}

/// GET /api/analytics/category-spending - Expense totals per category
pub async fn category_spending(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<CategorySpendingQuery>,
) -> Result<Json<CategorySpendingResponse>, AppError> {
    let target = resolve_target(&auth, params.user_id)?;
    let categories = state.db.category_totals(target, params.start, params.end)?;
    Ok(Json(CategorySpendingResponse { categories }))
}

#[derive(Debug, Deserialize)]
pub struct SavingsQuery {
    pub user_id: Option<i64>,
}

/// GET /api/analytics/savings-vs-expense - All-time income vs expense
pub async fn savings_vs_expense(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<SavingsQuery>,
) -> Result<Json<SavingsSummary>, AppError> {
    let target = resolve_target(&auth, params.user_id)?;
    Ok(Json(state.db.savings_summary(target)?))
}
