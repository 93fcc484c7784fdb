//! Transaction CRUD with owner scoping
//!
//! Every read takes an `owner: Option<i64>`: `Some(user_id)` restricts the
//! query to that user's rows, `None` sees every row (admin).

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_date, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TxnKind};

const TXN_COLUMNS: &str =
    "t.id, t.user_id, u.username, t.title, t.amount, t.kind, t.category, t.date";

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let amount: String = row.get(4)?;
    let kind: String = row.get(5)?;
    let date: String = row.get(7)?;
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        title: row.get(3)?,
        amount: parse_decimal(4, amount)?,
        kind: kind.parse().unwrap_or(TxnKind::Expense),
        category: row.get(6)?,
        date: parse_date(7, date)?,
    })
}

impl Database {
    /// Create a new transaction owned by `user_id`
    pub fn create_transaction(&self, user_id: i64, new_txn: &NewTransaction) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transactions (user_id, title, amount, kind, category, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                new_txn.title,
                new_txn.amount.to_string(),
                new_txn.kind.as_str(),
                new_txn.category,
                new_txn.date.format("%Y-%m-%d").to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(transaction_id = id, user_id, "Created transaction");
        drop(conn);

        self.get_transaction(id, None)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {} after insert", id)))
    }

    /// Get a transaction by ID, optionally restricted to an owner
    pub fn get_transaction(&self, id: i64, owner: Option<i64>) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let txn = match owner {
            Some(user_id) => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM transactions t JOIN users u ON u.id = t.user_id
                         WHERE t.id = ?1 AND t.user_id = ?2",
                        TXN_COLUMNS
                    ),
                    params![id, user_id],
                    row_to_transaction,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM transactions t JOIN users u ON u.id = t.user_id
                         WHERE t.id = ?1",
                        TXN_COLUMNS
                    ),
                    params![id],
                    row_to_transaction,
                )
                .optional()?,
        };
        Ok(txn)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, owner: Option<i64>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let txns = match owner {
            Some(user_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM transactions t JOIN users u ON u.id = t.user_id
                     WHERE t.user_id = ?1 ORDER BY t.date DESC, t.id DESC",
                    TXN_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![user_id], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM transactions t JOIN users u ON u.id = t.user_id
                     ORDER BY t.date DESC, t.id DESC",
                    TXN_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(txns)
    }

    /// Update a transaction's fields
    ///
    /// `None` fields are left unchanged. Returns `Error::NotFound` if the
    /// transaction does not exist or the owner filter excludes it.
    pub fn update_transaction(
        &self,
        id: i64,
        owner: Option<i64>,
        title: Option<&str>,
        amount: Option<rust_decimal::Decimal>,
        kind: Option<TxnKind>,
        category: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Transaction> {
        let existing = self
            .get_transaction(id, owner)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE transactions
             SET title = ?1, amount = ?2, kind = ?3, category = ?4, date = ?5
             WHERE id = ?6",
            params![
                title.unwrap_or(&existing.title),
                amount.unwrap_or(existing.amount).to_string(),
                kind.unwrap_or(existing.kind).as_str(),
                category.unwrap_or(&existing.category),
                date.unwrap_or(existing.date).format("%Y-%m-%d").to_string(),
                id,
            ],
        )?;
        drop(conn);

        self.get_transaction(id, None)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))
    }

    /// Delete a transaction (owner-scoped)
    pub fn delete_transaction(&self, id: i64, owner: Option<i64>) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = match owner {
            Some(user_id) => conn.execute(
                "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?,
            None => conn.execute("DELETE FROM transactions WHERE id = ?1", params![id])?,
        };
        Ok(deleted > 0)
    }

    /// All (title, category) pairs across users, for categorizer training
    pub fn labelled_titles(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT title, category FROM transactions
             WHERE title != '' AND category != '' ORDER BY id",
        )?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pairs)
    }

    /// Count transactions, optionally for a single user
    pub fn count_transactions(&self, owner: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        let count = match owner {
            Some(user_id) => conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// Distinct user IDs that have at least one transaction
    pub fn users_with_transactions(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT user_id FROM transactions ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}
