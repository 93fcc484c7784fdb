//! Budget CRUD handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use finwise_core::models::{Budget, NewBudget};

use super::transactions::owner_scope;
use crate::auth::AuthUser;
use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub category: String,
    pub limit: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// GET /api/budgets - List budgets (own rows; admins see all)
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Budget>>, AppError> {
    Ok(Json(state.db.list_budgets(owner_scope(&auth))?))
}

/// POST /api/budgets - Create a budget owned by the caller
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), AppError> {
    if body.category.trim().is_empty() {
        return Err(AppError::bad_request("Category is required"));
    }
    if body.limit <= Decimal::ZERO {
        return Err(AppError::bad_request("Budget limit must be positive."));
    }
    if body.start_date > body.end_date {
        return Err(AppError::bad_request(
            "Start date must be before or the same as end date.",
        ));
    }

    let budget = state.db.create_budget(
        auth.user_id,
        &NewBudget {
            category: body.category.trim().to_string(),
            limit: body.limit,
            start_date: body.start_date,
            end_date: body.end_date,
        },
    )?;
    Ok((StatusCode::CREATED, Json(budget)))
}

/// GET /api/budgets/:id - Get one budget
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Budget>, AppError> {
    let budget = state
        .db
        .get_budget(id, owner_scope(&auth))?
        .ok_or_else(|| AppError::not_found("Budget not found"))?;
    Ok(Json(budget))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBudgetRequest {
    pub category: Option<String>,
    pub limit: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// PUT /api/budgets/:id - Update a budget
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBudgetRequest>,
) -> Result<Json<Budget>, AppError> {
    if let Some(limit) = body.limit {
        if limit <= Decimal::ZERO {
            return Err(AppError::bad_request("Budget limit must be positive."));
        }
    }

    let budget = state
        .db
        .update_budget(
            id,
            owner_scope(&auth),
            body.category.as_deref(),
            body.limit,
            body.start_date,
            body.end_date,
        )
        .map_err(|e| match e {
            finwise_core::Error::NotFound(_) => AppError::not_found("Budget not found"),
            finwise_core::Error::InvalidData(msg) => AppError::bad_request(&msg),
            other => other.into(),
        })?;
    Ok(Json(budget))
}

/// DELETE /api/budgets/:id - Delete a budget
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_budget(id, owner_scope(&auth))? {
        return Err(AppError::not_found("Budget not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
