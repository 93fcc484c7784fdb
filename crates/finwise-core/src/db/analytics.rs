//! Aggregation queries backing the analytics endpoints
//!
//! Amounts are stored as TEXT and summed in Rust with `Decimal`. Letting
//! SQLite SUM() a money column would silently coerce to float.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::params;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::Result;
use crate::models::TxnKind;

/// Income and expense totals for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTotals {
    /// Month in "YYYY-MM" form
    pub month: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub expense: Decimal,
}

/// Expense total for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// All-time income vs expense for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsSummary {
    #[serde(with = "rust_decimal::serde::str")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_expense: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub savings: Decimal,
}

impl Database {
    /// Per-month income/expense totals for a user since `start` (inclusive)
    ///
    /// Only months that have transactions appear; callers zero-fill the
    /// window themselves.
    pub fn monthly_totals_since(
        &self,
        user_id: i64,
        start: NaiveDate,
    ) -> Result<BTreeMap<String, (Decimal, Decimal)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT strftime('%Y-%m', date), kind, amount FROM transactions
             WHERE user_id = ?1 AND date >= ?2",
        )?;
        let rows = stmt.query_map(
            params![user_id, start.format("%Y-%m-%d").to_string()],
            |row| {
                let month: String = row.get(0)?;
                let kind: String = row.get(1)?;
                let amount: String = row.get(2)?;
                Ok((month, kind, amount))
            },
        )?;

        let mut totals: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
        for row in rows {
            let (month, kind, amount) = row?;
            let amount: Decimal = amount.parse().unwrap_or_default();
            let entry = totals.entry(month).or_default();
            match kind.parse().unwrap_or(TxnKind::Expense) {
                TxnKind::Income => entry.0 += amount,
                TxnKind::Expense => entry.1 += amount,
            }
        }
        Ok(totals)
    }

    /// Expense totals per category for a user, largest first
    ///
    /// `start`/`end` bound the dates inclusively when given.
    pub fn category_totals(
        &self,
        user_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CategoryTotal>> {
        let conn = self.conn()?;
        let mut sql = String::from(
            "SELECT category, amount FROM transactions
             WHERE user_id = ?1 AND kind = 'expense'",
        );
        let mut args: Vec<String> = Vec::new();
        if let Some(start) = start {
            args.push(start.format("%Y-%m-%d").to_string());
            sql.push_str(&format!(" AND date >= ?{}", args.len() + 1));
        }
        if let Some(end) = end {
            args.push(end.format("%Y-%m-%d").to_string());
            sql.push_str(&format!(" AND date <= ?{}", args.len() + 1));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_vec: Vec<&dyn rusqlite::ToSql> = std::iter::once(&user_id as &dyn rusqlite::ToSql)
            .chain(args.iter().map(|a| a as &dyn rusqlite::ToSql))
            .collect();
        let rows = stmt.query_map(params_vec.as_slice(), |row| {
            let category: String = row.get(0)?;
            let amount: String = row.get(1)?;
            Ok((category, amount))
        })?;

        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in rows {
            let (category, amount) = row?;
            let amount: Decimal = amount.parse().unwrap_or_default();
            *totals.entry(category).or_default() += amount;
        }

        let mut out: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect();
        out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        Ok(out)
    }

    /// All-time income vs expense for a user
    pub fn savings_summary(&self, user_id: i64) -> Result<SavingsSummary> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT kind, amount FROM transactions WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user_id], |row| {
            let kind: String = row.get(0)?;
            let amount: String = row.get(1)?;
            Ok((kind, amount))
        })?;

        let mut income = Decimal::ZERO;
        let mut expense = Decimal::ZERO;
        for row in rows {
            let (kind, amount) = row?;
            let amount: Decimal = amount.parse().unwrap_or_default();
            match kind.parse().unwrap_or(TxnKind::Expense) {
                TxnKind::Income => income += amount,
                TxnKind::Expense => expense += amount,
            }
        }
        Ok(SavingsSummary {
            total_income: income,
            total_expense: expense,
            savings: income - expense,
        })
    }

    /// Per (month, category) expense totals for a user, oldest month first
    ///
    /// `since` bounds the dates inclusively when given. Feeds the
    /// forecasting pipelines, which need a month-by-category matrix.
    pub fn monthly_category_expenses(
        &self,
        user_id: i64,
        since: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, BTreeMap<String, Decimal>>> {
        let conn = self.conn()?;
        let mut sql = String::from(
            "SELECT strftime('%Y-%m', date), category, amount FROM transactions
             WHERE user_id = ?1 AND kind = 'expense'",
        );
        let since_arg = since.map(|d| d.format("%Y-%m-%d").to_string());
        if since_arg.is_some() {
            sql.push_str(" AND date >= ?2");
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_vec: Vec<&dyn rusqlite::ToSql> = std::iter::once(&user_id as &dyn rusqlite::ToSql)
            .chain(since_arg.iter().map(|s| s as &dyn rusqlite::ToSql))
            .collect();
        let rows = stmt.query_map(params_vec.as_slice(), |row| {
            let month: String = row.get(0)?;
            let category: String = row.get(1)?;
            let amount: String = row.get(2)?;
            Ok((month, category, amount))
        })?;

        let mut matrix: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
        for row in rows {
            let (month, category, amount) = row?;
            let amount: Decimal = amount.parse().unwrap_or_default();
            *matrix.entry(month).or_default().entry(category).or_default() += amount;
        }
        Ok(matrix)
    }

    /// Mean monthly income for a user over their most recent `n` active months
    pub fn recent_monthly_income_mean(&self, user_id: i64, n: usize) -> Result<Decimal> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT strftime('%Y-%m', date), amount FROM transactions
             WHERE user_id = ?1 AND kind = 'income'",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let month: String = row.get(0)?;
            let amount: String = row.get(1)?;
            Ok((month, amount))
        })?;

        let mut per_month: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in rows {
            let (month, amount) = row?;
            let amount: Decimal = amount.parse().unwrap_or_default();
            *per_month.entry(month).or_default() += amount;
        }
        if per_month.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let recent: Vec<Decimal> = per_month.values().rev().take(n).copied().collect();
        let count = Decimal::from(recent.len() as i64);
        let sum: Decimal = recent.iter().sum();
        Ok(sum / count)
    }
}
