//! Domain models for Finwise

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Coarse authorization tier gating queryset visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An application user
///
/// The password hash never leaves the db layer; this struct is safe to
/// serialize in API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub income: Decimal,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A new user to be registered (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Argon2id hash, already derived by the caller
    pub password_hash: String,
    pub phone: Option<String>,
    pub income: Decimal,
    pub role: Role,
}

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Income,
    Expense,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TxnKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    /// Owner's username, joined in for API responses
    pub username: String,
    pub title: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub category: String,
    pub date: NaiveDate,
}

/// A new transaction to be inserted
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub title: String,
    pub amount: Decimal,
    pub kind: TxnKind,
    pub category: String,
    pub date: NaiveDate,
}

/// A spending budget for one category over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub category: String,
    pub limit: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A new budget to be inserted
#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category: String,
    pub limit: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A savings goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub target_amount: Decimal,
    pub saved_amount: Decimal,
    pub deadline: NaiveDate,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Completion percentage, clamped to [0, 100] and rounded to 2 decimals.
    /// A zero target yields 0 rather than dividing by zero.
    pub fn progress(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;

        let target = self.target_amount.to_f64().unwrap_or(0.0);
        if target == 0.0 {
            return 0.0;
        }
        let saved = self.saved_amount.to_f64().unwrap_or(0.0);
        let pct = (saved / target) * 100.0;
        (pct.clamp(0.0, 100.0) * 100.0).round() / 100.0
    }
}

/// A new goal to be inserted
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: Decimal,
    pub saved_amount: Decimal,
    pub deadline: NaiveDate,
    pub completed: bool,
}
