//! Monthly time-series helpers
//!
//! Everything downstream (analytics windows, forecasting features) works on
//! "YYYY-MM" month labels. Gaps count: a month with no transactions is a
//! zero month, not a missing one.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::db::MonthlyTotals;
use crate::error::{Error, Result};

/// Month label ("YYYY-MM") for a date
pub fn month_label(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a "YYYY-MM" label into the first day of that month
pub fn parse_month(label: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", label), "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("Invalid month label: {}", label)))
}

/// Label of the month after `label`
pub fn next_month(label: &str) -> Result<String> {
    let first = parse_month(label)?;
    Ok(month_label(first + Months::new(1)))
}

/// The `n` month labels ending at `end`'s month, ascending
pub fn window_ending_at(end: NaiveDate, n: u32) -> Vec<String> {
    let last = NaiveDate::from_ymd_opt(end.year(), end.month(), 1).unwrap_or(end);
    (0..n)
        .rev()
        .map(|back| month_label(last - Months::new(back)))
        .collect()
}

/// Zero-fill sparse per-month totals over an explicit window of labels
pub fn fill_monthly_totals(
    totals: &BTreeMap<String, (Decimal, Decimal)>,
    window: &[String],
) -> Vec<MonthlyTotals> {
    window
        .iter()
        .map(|month| {
            let (income, expense) = totals.get(month).copied().unwrap_or_default();
            MonthlyTotals {
                month: month.clone(),
                income,
                expense,
            }
        })
        .collect()
}

/// A dense month-by-category expense matrix
///
/// Months run contiguously, so row `i + 1` is always one calendar month
/// after row `i`.
#[derive(Debug, Clone)]
pub struct MonthlyCategoryMatrix {
    pub months: Vec<String>,
    pub categories: Vec<String>,
    /// values[month_idx][category_idx]
    pub values: Vec<Vec<f64>>,
}

impl MonthlyCategoryMatrix {
    /// Build from sparse per-month per-category totals
    ///
    /// Returns an empty matrix when there is no data.
    pub fn from_sparse(sparse: &BTreeMap<String, BTreeMap<String, Decimal>>) -> Result<Self> {
        if sparse.is_empty() {
            return Ok(Self {
                months: Vec::new(),
                categories: Vec::new(),
                values: Vec::new(),
            });
        }

        // BTreeMap keys are sorted, so first/last give the month span
        let first = sparse.keys().next().map(String::as_str).unwrap_or_default();
        let last = sparse.keys().next_back().map(String::as_str).unwrap_or_default();

        let mut months = Vec::new();
        let mut cursor = parse_month(first)?;
        let end = parse_month(last)?;
        while cursor <= end {
            months.push(month_label(cursor));
            cursor = cursor + Months::new(1);
        }

        Ok(Self::from_sparse_window(sparse, &months))
    }

    /// Build over an explicit window of month labels
    ///
    /// Every label in `window` becomes a row, zero-filled when the data
    /// never mentions it. Forecast features stay anchored to the calendar
    /// this way: the last row is the window's last month even when no
    /// transaction has landed in it yet.
    pub fn from_sparse_window(
        sparse: &BTreeMap<String, BTreeMap<String, Decimal>>,
        window: &[String],
    ) -> Self {
        let mut categories: Vec<String> = sparse
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect();
        categories.sort();
        categories.dedup();

        let values = window
            .iter()
            .map(|month| {
                categories
                    .iter()
                    .map(|cat| {
                        sparse
                            .get(month)
                            .and_then(|row| row.get(cat))
                            .and_then(|d| d.to_f64())
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect();

        Self {
            months: window.to_vec(),
            categories,
            values,
        }
    }

    pub fn month_count(&self) -> usize {
        self.months.len()
    }

    /// The full monthly series for one category, zero-filled
    pub fn category_series(&self, category: &str) -> Option<Vec<f64>> {
        let idx = self.categories.iter().position(|c| c == category)?;
        Some(self.values.iter().map(|row| row[idx]).collect())
    }

    /// Total expenses per month across all categories
    pub fn monthly_totals(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }
}
