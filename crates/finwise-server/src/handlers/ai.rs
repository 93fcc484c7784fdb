//! Categorization and spending-forecast handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use finwise_core::ml::categorizer::{categorize, CategoryPrediction};
use finwise_core::ml::forecast::heuristic_forecast;
use finwise_core::series::{self, MonthlyCategoryMatrix};

use crate::auth::AuthUser;
use crate::{AppError, AppState};

/// Months of history fed into the forecast endpoints
const HISTORY_MONTHS: usize = 12;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Keep only the trailing `n` months of a series
fn tail(series: &[f64], n: usize) -> &[f64] {
    &series[series.len().saturating_sub(n)..]
}

/// The 12 calendar months ending at the current one, plus the window's start
///
/// Forecasts read this window, not the raw data span: the last row is
/// always the current month, zero-filled if nothing has landed in it yet.
pub(crate) fn forecast_window() -> (Vec<String>, NaiveDate) {
    let today = Utc::now().date_naive();
    let window = series::window_ending_at(today, HISTORY_MONTHS as u32);
    let start = series::parse_month(&window[0])
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap());
    (window, start)
}

/// Load a per-category spend model, treating a broken artifact as absent
fn load_spend_model(
    state: &AppState,
    category: &str,
) -> Option<finwise_core::ml::forecast::RidgeForecaster> {
    state.store.load_spend_model(category).unwrap_or_else(|e| {
        warn!(category, error = %e, "Failed to load spend model");
        None
    })
}

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    pub description: String,
}

/// POST /api/ai/categorize-transaction - Suggest a category for a title
pub async fn categorize_title(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthUser>,
    Json(body): Json<CategorizeRequest>,
) -> Result<Json<CategoryPrediction>, AppError> {
    if body.description.trim().is_empty() {
        return Err(AppError::bad_request("Description is required"));
    }

    // A broken artifact degrades to rules-only, never a 5xx
    let classifier = state.store.load_categorizer().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load categorizer model");
        None
    });
    let prediction = categorize(&body.description, classifier.as_ref());
    Ok(Json(prediction))
}

#[derive(Debug, Serialize)]
pub struct CategoryForecast {
    pub category: String,
    pub predicted: f64,
    /// "global" when a trained model produced the number, "heuristic" otherwise
    pub model_type: &'static str,
    pub model_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictSpendingResponse {
    pub predictions: Vec<CategoryForecast>,
    /// First day of the current month, the window's last row
    pub last_month: String,
    pub last_totals: BTreeMap<String, f64>,
}

/// GET /api/ai/predict-spending - Next-month forecast for every category
pub async fn predict_spending(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PredictSpendingResponse>, AppError> {
    let (window, start) = forecast_window();
    let sparse = state.db.monthly_category_expenses(auth.user_id, Some(start))?;
    if sparse.is_empty() {
        return Err(AppError::bad_request("No transaction history available"));
    }
    let matrix = MonthlyCategoryMatrix::from_sparse_window(&sparse, &window);

    let mut predictions = Vec::new();
    for category in &matrix.categories {
        let series = matrix.category_series(category).unwrap_or_default();
        let recent = tail(&series, HISTORY_MONTHS);

        let forecast = match load_spend_model(state.as_ref(), category) {
            Some(model) if recent.len() >= model.window => {
                let predicted = model.predict_next(recent)?;
                CategoryForecast {
                    category: category.clone(),
                    predicted: round2(predicted),
                    model_type: "global",
                    model_score: Some(round3(model.r2)),
                }
            }
            _ => {
                debug!(category, "No usable spend model, using heuristic");
                CategoryForecast {
                    category: category.clone(),
                    predicted: round2(heuristic_forecast(recent, 3)),
                    model_type: "heuristic",
                    model_score: None,
                }
            }
        };
        predictions.push(forecast);
    }

    predictions.sort_by(|a, b| {
        b.predicted
            .partial_cmp(&a.predicted)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let last_month = format!("{}-01", matrix.months[matrix.month_count() - 1]);
    let last_totals: BTreeMap<String, f64> = matrix
        .categories
        .iter()
        .enumerate()
        .map(|(i, cat)| (cat.clone(), matrix.values[matrix.month_count() - 1][i]))
        .collect();

    Ok(Json(PredictSpendingResponse {
        predictions,
        last_month,
        last_totals,
    }))
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub month: &'static str,
    pub category: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TrendInsight {
    pub category: String,
    pub predicted: f64,
    pub avg_recent: f64,
    pub change_percent: f64,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SpendingTrendResponse {
    pub trends: Vec<TrendPoint>,
    pub insights: Vec<TrendInsight>,
}

/// GET /api/ai/spending-trend - Actuals and forecast for the top 5 categories
pub async fn spending_trend(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SpendingTrendResponse>, AppError> {
    let (window, start) = forecast_window();
    let sparse = state.db.monthly_category_expenses(auth.user_id, Some(start))?;
    // Distinct months with expenses, not window rows
    if sparse.len() < 3 {
        return Err(AppError::bad_request(
            "Not enough data for trends. Add more transactions.",
        ));
    }
    let matrix = MonthlyCategoryMatrix::from_sparse_window(&sparse, &window);

    // Top 5 categories by average spend over the last 3 months
    let mut ranked: Vec<(String, Vec<f64>, f64)> = matrix
        .categories
        .iter()
        .filter_map(|cat| {
            let series = matrix.category_series(cat)?;
            let actuals = tail(&series, 3).to_vec();
            let avg = actuals.iter().sum::<f64>() / actuals.len() as f64;
            Some((cat.clone(), series, avg))
        })
        .collect();
    ranked.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(5);

    const ACTUAL_LABELS: [&str; 3] = ["M-2", "M-1", "Last Month"];

    let mut trends = Vec::new();
    let mut insights = Vec::new();
    for (category, series, avg_recent) in ranked {
        let recent = tail(&series, HISTORY_MONTHS);
        let actuals = tail(&series, 3);

        let predicted = match load_spend_model(state.as_ref(), &category) {
            Some(model) if recent.len() >= model.window => model.predict_next(recent)?,
            _ => avg_recent.max(0.0),
        };

        let change_percent = if avg_recent > 0.0 {
            (predicted - avg_recent) / avg_recent * 100.0
        } else {
            0.0
        };
        let status = if change_percent > 15.0 {
            "overspend"
        } else if change_percent < -15.0 {
            "saving"
        } else {
            "stable"
        };

        insights.push(TrendInsight {
            category: category.clone(),
            predicted: round2(predicted),
            avg_recent: round2(avg_recent),
            change_percent: round1(change_percent),
            status,
        });

        for (label, amount) in ACTUAL_LABELS.iter().zip(actuals) {
            trends.push(TrendPoint {
                month: label,
                category: category.clone(),
                amount: *amount,
                kind: "Actual",
            });
        }
        trends.push(TrendPoint {
            month: "Next Month",
            category,
            amount: round2(predicted),
            kind: "Predicted",
        });
    }

    Ok(Json(SpendingTrendResponse { trends, insights }))
}
