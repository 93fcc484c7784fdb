//! User account operations

use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use super::{parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{NewUser, Role, User};

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let income: String = row.get(4)?;
    let role: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        income: parse_decimal(4, income)?,
        role: role.parse().unwrap_or(Role::User),
        created_at: parse_datetime(&created_at),
    })
}

const USER_COLUMNS: &str = "id, username, email, phone, income, role, created_at";

impl Database {
    /// Create a new user account
    ///
    /// Returns `Error::InvalidData` if the username or email is already taken.
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let conn = self.conn()?;

        let result = conn.execute(
            "INSERT INTO users (username, email, password_hash, phone, income, role)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new_user.username,
                new_user.email,
                new_user.password_hash,
                new_user.phone,
                new_user.income.to_string(),
                new_user.role.as_str(),
            ],
        );

        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                info!(user_id = id, username = %new_user.username, "Created user");
                drop(conn);
                self.get_user(id)?
                    .ok_or_else(|| Error::NotFound(format!("User {} after insert", id)))
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::InvalidData(
                    "A user with this username or email already exists".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get the stored password hash for a username (for login verification)
    pub fn get_password_hash(&self, username: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let hash = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// List all users (admin view)
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Update a user's profile fields
    ///
    /// `None` fields are left unchanged. Role changes go through
    /// `update_user_role` so handlers can gate them separately.
    pub fn update_user(
        &self,
        id: i64,
        email: Option<&str>,
        phone: Option<&str>,
        income: Option<Decimal>,
        password_hash: Option<&str>,
    ) -> Result<User> {
        let conn = self.conn()?;

        if let Some(email) = email {
            conn.execute(
                "UPDATE users SET email = ?1 WHERE id = ?2",
                params![email, id],
            )?;
        }
        if let Some(phone) = phone {
            conn.execute(
                "UPDATE users SET phone = ?1 WHERE id = ?2",
                params![phone, id],
            )?;
        }
        if let Some(income) = income {
            conn.execute(
                "UPDATE users SET income = ?1 WHERE id = ?2",
                params![income.to_string(), id],
            )?;
        }
        if let Some(hash) = password_hash {
            conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                params![hash, id],
            )?;
        }
        drop(conn);

        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// Change a user's role
    pub fn update_user_role(&self, id: i64, role: Role) -> Result<User> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("User {}", id)));
        }
        drop(conn);
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// Delete a user and all their data (cascades to transactions, budgets, goals)
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if deleted > 0 {
            info!(user_id = id, "Deleted user");
        }
        Ok(deleted > 0)
    }

    /// Count all users
    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}
