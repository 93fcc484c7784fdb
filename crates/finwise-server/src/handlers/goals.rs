//! Savings goal CRUD handlers
//!
//! Goals serialize with a computed `progress` percentage alongside the
//! stored fields.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finwise_core::models::{Goal, NewGoal};

use super::transactions::owner_scope;
use crate::auth::AuthUser;
use crate::{AppError, AppState};

/// Goal plus its completion percentage
#[derive(Debug, Serialize)]
pub struct GoalResponse {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress: f64,
}

impl From<Goal> for GoalResponse {
    fn from(goal: Goal) -> Self {
        let progress = goal.progress();
        Self { goal, progress }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub saved_amount: Option<Decimal>,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub completed: bool,
}

fn validate_amounts(target: Option<Decimal>, saved: Option<Decimal>) -> Result<(), AppError> {
    if let Some(target) = target {
        if target <= Decimal::ZERO {
            return Err(AppError::bad_request("Target amount must be positive."));
        }
    }
    if let Some(saved) = saved {
        if saved < Decimal::ZERO {
            return Err(AppError::bad_request("Saved amount cannot be negative."));
        }
    }
    Ok(())
}

/// GET /api/goals - List goals (own rows; admins see all)
pub async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<GoalResponse>>, AppError> {
    let goals = state.db.list_goals(owner_scope(&auth))?;
    Ok(Json(goals.into_iter().map(Into::into).collect()))
}

/// POST /api/goals - Create a goal owned by the caller
pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<GoalResponse>), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }
    validate_amounts(Some(body.target_amount), body.saved_amount)?;

    let goal = state.db.create_goal(
        auth.user_id,
        &NewGoal {
            name: body.name.trim().to_string(),
            target_amount: body.target_amount,
            saved_amount: body.saved_amount.unwrap_or(Decimal::ZERO),
            deadline: body.deadline,
            completed: body.completed,
        },
    )?;
    Ok((StatusCode::CREATED, Json(goal.into())))
}

/// GET /api/goals/:id - Get one goal
pub async fn get_goal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<GoalResponse>, AppError> {
    let goal = state
        .db
        .get_goal(id, owner_scope(&auth))?
        .ok_or_else(|| AppError::not_found("Goal not found"))?;
    Ok(Json(goal.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateGoalRequest {
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    pub saved_amount: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
    pub completed: Option<bool>,
}

/// PUT /api/goals/:id - Update a goal
pub async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateGoalRequest>,
) -> Result<Json<GoalResponse>, AppError> {
    validate_amounts(body.target_amount, body.saved_amount)?;

    let goal = state
        .db
        .update_goal(
            id,
            owner_scope(&auth),
            body.name.as_deref(),
            body.target_amount,
            body.saved_amount,
            body.deadline,
            body.completed,
        )
        .map_err(|e| match e {
            finwise_core::Error::NotFound(_) => AppError::not_found("Goal not found"),
            other => other.into(),
        })?;
    Ok(Json(goal.into()))
}

/// DELETE /api/goals/:id - Delete a goal
pub async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_goal(id, owner_scope(&auth))? {
        return Err(AppError::not_found("Goal not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
