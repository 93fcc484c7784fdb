//! Budget CRUD with owner scoping

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

use super::{parse_date, parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, NewBudget};

const BUDGET_COLUMNS: &str =
    "b.id, b.user_id, u.username, b.category, b.limit_amount, b.start_date, b.end_date, b.created_at";

fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
    let limit: String = row.get(4)?;
    let start: String = row.get(5)?;
    let end: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        category: row.get(3)?,
        limit: parse_decimal(4, limit)?,
        start_date: parse_date(5, start)?,
        end_date: parse_date(6, end)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a new budget owned by `user_id`
    pub fn create_budget(&self, user_id: i64, new_budget: &NewBudget) -> Result<Budget> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO budgets (user_id, category, limit_amount, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                new_budget.category,
                new_budget.limit.to_string(),
                new_budget.start_date.format("%Y-%m-%d").to_string(),
                new_budget.end_date.format("%Y-%m-%d").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_budget(id, None)?
            .ok_or_else(|| Error::NotFound(format!("Budget {} after insert", id)))
    }

    /// Get a budget by ID, optionally restricted to an owner
    pub fn get_budget(&self, id: i64, owner: Option<i64>) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = match owner {
            Some(user_id) => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM budgets b JOIN users u ON u.id = b.user_id
                         WHERE b.id = ?1 AND b.user_id = ?2",
                        BUDGET_COLUMNS
                    ),
                    params![id, user_id],
                    row_to_budget,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM budgets b JOIN users u ON u.id = b.user_id
                         WHERE b.id = ?1",
                        BUDGET_COLUMNS
                    ),
                    params![id],
                    row_to_budget,
                )
                .optional()?,
        };
        Ok(budget)
    }

    /// List budgets, most recent start date first
    pub fn list_budgets(&self, owner: Option<i64>) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let budgets = match owner {
            Some(user_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM budgets b JOIN users u ON u.id = b.user_id
                     WHERE b.user_id = ?1 ORDER BY b.start_date DESC, b.id DESC",
                    BUDGET_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![user_id], row_to_budget)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM budgets b JOIN users u ON u.id = b.user_id
                     ORDER BY b.start_date DESC, b.id DESC",
                    BUDGET_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], row_to_budget)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(budgets)
    }

    /// Update a budget's fields, leaving `None` fields unchanged
    pub fn update_budget(
        &self,
        id: i64,
        owner: Option<i64>,
        category: Option<&str>,
        limit: Option<Decimal>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Budget> {
        let existing = self
            .get_budget(id, owner)?
            .ok_or_else(|| Error::NotFound(format!("Budget {}", id)))?;

        let start = start_date.unwrap_or(existing.start_date);
        let end = end_date.unwrap_or(existing.end_date);
        if start > end {
            return Err(Error::InvalidData(
                "Start date must be before end date.".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE budgets
             SET category = ?1, limit_amount = ?2, start_date = ?3, end_date = ?4
             WHERE id = ?5",
            params![
                category.unwrap_or(&existing.category),
                limit.unwrap_or(existing.limit).to_string(),
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
                id,
            ],
        )?;
        drop(conn);

        self.get_budget(id, None)?
            .ok_or_else(|| Error::NotFound(format!("Budget {}", id)))
    }

    /// Delete a budget (owner-scoped)
    pub fn delete_budget(&self, id: i64, owner: Option<i64>) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = match owner {
            Some(user_id) => conn.execute(
                "DELETE FROM budgets WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?,
            None => conn.execute("DELETE FROM budgets WHERE id = ?1", params![id])?,
        };
        Ok(deleted > 0)
    }

    /// Count budgets, optionally for a single user
    pub fn count_budgets(&self, owner: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match owner {
            Some(user_id) => conn.query_row(
                "SELECT COUNT(*) FROM budgets WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM budgets", [], |row| row.get(0))?,
        };
        Ok(count)
    }
}
