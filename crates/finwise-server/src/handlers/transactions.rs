//! Transaction CRUD handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use finwise_core::models::{NewTransaction, Transaction, TxnKind};

use crate::auth::AuthUser;
use crate::{AppError, AppState};

/// Owner filter for queries: admins see every row
pub(crate) fn owner_scope(auth: &AuthUser) -> Option<i64> {
    if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    }
}

fn validate_amount(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("amount", "Amount must be positive."));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub title: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub category: String,
    /// Defaults to today when omitted
    pub date: Option<NaiveDate>,
}

/// GET /api/transactions - List transactions (own rows; admins see all)
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.db.list_transactions(owner_scope(&auth))?))
}

/// POST /api/transactions - Create a transaction owned by the caller
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    validate_amount(body.amount)?;

    let txn = state.db.create_transaction(
        auth.user_id,
        &NewTransaction {
            title: body.title.trim().to_string(),
            amount: body.amount,
            kind: body.kind,
            category: body.category,
            date: body.date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
        },
    )?;
    Ok((StatusCode::CREATED, Json(txn)))
}

/// GET /api/transactions/:id - Get one transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let txn = state
        .db
        .get_transaction(id, owner_scope(&auth))?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;
    Ok(Json(txn))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub title: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<TxnKind>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

/// PUT /api/transactions/:id - Update a transaction
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    if let Some(amount) = body.amount {
        validate_amount(amount)?;
    }

    let txn = state
        .db
        .update_transaction(
            id,
            owner_scope(&auth),
            body.title.as_deref(),
            body.amount,
            body.kind,
            body.category.as_deref(),
            body.date,
        )
        .map_err(|e| match e {
            finwise_core::Error::NotFound(_) => AppError::not_found("Transaction not found"),
            other => other.into(),
        })?;
    Ok(Json(txn))
}

/// DELETE /api/transactions/:id - Delete a transaction
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_transaction(id, owner_scope(&auth))? {
        return Err(AppError::not_found("Transaction not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
