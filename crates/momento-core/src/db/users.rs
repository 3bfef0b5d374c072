//! User operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        nickname: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a user; the email must not already be registered
    pub fn create_user(&self, email: &str, nickname: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::InvalidData("Email must not be empty".into()));
        }

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO users (email, nickname) VALUES (?, ?) ON CONFLICT(email) DO NOTHING",
            params![email, nickname.trim()],
        )?;
        if inserted == 0 {
            return Err(Error::InvalidData(format!(
                "A user with email {} already exists",
                email
            )));
        }

        let id = conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, nickname, created_at FROM users WHERE id = ?",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, nickname, created_at FROM users WHERE email = ?",
                params![email.trim()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, email, nickname, created_at FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }
}
