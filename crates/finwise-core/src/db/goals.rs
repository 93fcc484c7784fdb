//! Savings goal CRUD with owner scoping

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

use super::{parse_date, parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{Goal, NewGoal};

const GOAL_COLUMNS: &str =
    "g.id, g.user_id, u.username, g.name, g.target_amount, g.saved_amount, g.deadline, g.completed, g.created_at";

fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    let target: String = row.get(4)?;
    let saved: String = row.get(5)?;
    let deadline: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        name: row.get(3)?,
        target_amount: parse_decimal(4, target)?,
        saved_amount: parse_decimal(5, saved)?,
        deadline: parse_date(6, deadline)?,
        completed: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a new goal owned by `user_id`
    pub fn create_goal(&self, user_id: i64, new_goal: &NewGoal) -> Result<Goal> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO goals (user_id, name, target_amount, saved_amount, deadline, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                new_goal.name,
                new_goal.target_amount.to_string(),
                new_goal.saved_amount.to_string(),
                new_goal.deadline.format("%Y-%m-%d").to_string(),
                new_goal.completed,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_goal(id, None)?
            .ok_or_else(|| Error::NotFound(format!("Goal {} after insert", id)))
    }

    /// Get a goal by ID, optionally restricted to an owner
    pub fn get_goal(&self, id: i64, owner: Option<i64>) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let goal = match owner {
            Some(user_id) => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM goals g JOIN users u ON u.id = g.user_id
                         WHERE g.id = ?1 AND g.user_id = ?2",
                        GOAL_COLUMNS
                    ),
                    params![id, user_id],
                    row_to_goal,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM goals g JOIN users u ON u.id = g.user_id
                         WHERE g.id = ?1",
                        GOAL_COLUMNS
                    ),
                    params![id],
                    row_to_goal,
                )
                .optional()?,
        };
        Ok(goal)
    }

    /// List goals, nearest deadline first
    pub fn list_goals(&self, owner: Option<i64>) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let goals = match owner {
            Some(user_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM goals g JOIN users u ON u.id = g.user_id
                     WHERE g.user_id = ?1 ORDER BY g.deadline, g.id",
                    GOAL_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![user_id], row_to_goal)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM goals g JOIN users u ON u.id = g.user_id
                     ORDER BY g.deadline, g.id",
                    GOAL_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], row_to_goal)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(goals)
    }

    /// Update a goal's fields, leaving `None` fields unchanged
    #[allow(clippy::too_many_arguments)]
    pub fn update_goal(
        &self,
        id: i64,
        owner: Option<i64>,
        name: Option<&str>,
        target_amount: Option<Decimal>,
        saved_amount: Option<Decimal>,
        deadline: Option<NaiveDate>,
        completed: Option<bool>,
    ) -> Result<Goal> {
        let existing = self
            .get_goal(id, owner)?
            .ok_or_else(|| Error::NotFound(format!("Goal {}", id)))?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE goals
             SET name = ?1, target_amount = ?2, saved_amount = ?3, deadline = ?4, completed = ?5
             WHERE id = ?6",
            params![
                name.unwrap_or(&existing.name),
                target_amount.unwrap_or(existing.target_amount).to_string(),
                saved_amount.unwrap_or(existing.saved_amount).to_string(),
                deadline
                    .unwrap_or(existing.deadline)
                    .format("%Y-%m-%d")
                    .to_string(),
                completed.unwrap_or(existing.completed),
                id,
            ],
        )?;
        drop(conn);

        self.get_goal(id, None)?
            .ok_or_else(|| Error::NotFound(format!("Goal {}", id)))
    }

    /// Delete a goal (owner-scoped)
    pub fn delete_goal(&self, id: i64, owner: Option<i64>) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = match owner {
            Some(user_id) => conn.execute(
                "DELETE FROM goals WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?,
            None => conn.execute("DELETE FROM goals WHERE id = ?1", params![id])?,
        };
        Ok(deleted > 0)
    }

    /// Count goals, optionally for a single user
    pub fn count_goals(&self, owner: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match owner {
            Some(user_id) => conn.query_row(
                "SELECT COUNT(*) FROM goals WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM goals", [], |row| row.get(0))?,
        };
        Ok(count)
    }
}
