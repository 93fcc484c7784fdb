//! Monthly expense prediction handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, warn};

use finwise_core::ml::forecast::RidgeForecaster;
use finwise_core::ml::store::ModelStore;
use finwise_core::series::MonthlyCategoryMatrix;

use crate::auth::AuthUser;
use crate::handlers::ai::forecast_window;
use crate::{AppError, AppState};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// User model first, global model as fallback
///
/// A broken artifact counts as absent so the fallback chain still runs.
fn load_model_for_user(
    store: &ModelStore,
    user_id: i64,
) -> Option<(RidgeForecaster, &'static str)> {
    let user_model = store.load_user_insight_model(user_id).unwrap_or_else(|e| {
        warn!(user_id, error = %e, "Failed to load user insight model");
        None
    });
    if let Some(model) = user_model {
        debug!(user_id, "Using per-user insight model");
        return Some((model, "user"));
    }

    let global_model = store.load_global_insight_model().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load global insight model");
        None
    });
    if let Some(model) = global_model {
        debug!(user_id, "Using global insight model");
        return Some((model, "global"));
    }
    None
}

#[derive(Debug, Serialize)]
pub struct MonthlyPrediction {
    pub predicted_expense: f64,
    pub predicted_income: f64,
    pub predicted_savings: f64,
    pub model_score: f64,
    pub model_type: &'static str,
}

/// GET /api/insights/predict-monthly - Forecast next month's expense and savings
pub async fn predict_monthly(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MonthlyPrediction>, AppError> {
    let (model, model_type) = load_model_for_user(&state.store, auth.user_id)
        .ok_or_else(|| AppError::not_found("Prediction model not available for this user."))?;

    let (window, start) = forecast_window();
    let sparse = state.db.monthly_category_expenses(auth.user_id, Some(start))?;
    // Months that actually have expenses, not window rows
    let active_months = sparse.len();
    if active_months < model.window {
        return Err(AppError::bad_request(format!(
            "Not enough historical expense data ({} months) to predict.",
            active_months
        )));
    }

    let matrix = MonthlyCategoryMatrix::from_sparse_window(&sparse, &window);
    let expenses = matrix.monthly_totals();

    let predicted_expense = model.predict_next(&expenses)?;
    let predicted_income = state
        .db
        .recent_monthly_income_mean(auth.user_id, 3)?
        .to_f64()
        .unwrap_or(0.0);
    let predicted_savings = predicted_income - predicted_expense;

    Ok(Json(MonthlyPrediction {
        predicted_expense: round2(predicted_expense),
        predicted_income: round2(predicted_income),
        predicted_savings: round2(predicted_savings),
        model_score: (model.r2 * 1000.0).round() / 1000.0,
        model_type,
    }))
}
