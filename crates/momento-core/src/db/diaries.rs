//! Diary operations
//!
//! Every read and write here that takes a `user_id` is scoped to the owner:
//! a diary owned by someone else behaves exactly like a missing one.

use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::status::status_from_row;
use super::{parse_date, parse_datetime, with_transaction, Database, DbConn};
use crate::error::{Error, Result};
use crate::models::{Diary, DiaryDetail, NewDiary, ProcessingStatus, StatusRecord};

pub(super) const DIARY_COLUMNS: &str = "d.id, d.user_id, d.title, d.content, d.date, d.emotion, \
     d.image_url, d.comment, d.shared, d.created_at, d.updated_at";

pub(super) fn diary_from_row(row: &Row) -> rusqlite::Result<Diary> {
    let date: String = row.get(4)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Diary {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        date: parse_date(&date)?,
        emotion: row.get(5)?,
        image_url: row.get(6)?,
        comment: row.get(7)?,
        shared: row.get(8)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn validate(diary: &NewDiary) -> Result<()> {
    if diary.title.trim().is_empty() {
        return Err(Error::InvalidData("Diary title must not be empty".into()));
    }
    if diary.content.trim().is_empty() {
        return Err(Error::InvalidData("Diary content must not be empty".into()));
    }
    Ok(())
}

fn query_diary(conn: &DbConn, id: i64) -> Result<Option<Diary>> {
    let diary = conn
        .query_row(
            &format!("SELECT {} FROM diaries d WHERE d.id = ?", DIARY_COLUMNS),
            params![id],
            diary_from_row,
        )
        .optional()?;
    Ok(diary)
}

fn query_status(conn: &DbConn, diary_id: i64) -> Result<StatusRecord> {
    let record = conn.query_row(
        "SELECT diary_id, status, run_token, created_at, updated_at
         FROM diary_status WHERE diary_id = ?",
        params![diary_id],
        status_from_row,
    )?;
    Ok(record)
}

fn owns(conn: &DbConn, id: i64, user_id: i64) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM diaries WHERE id = ? AND user_id = ?",
            params![id, user_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Reset a diary's status to QUEUED under a new run token and drop its tag links
fn start_new_run(conn: &DbConn, id: i64) -> Result<()> {
    // A diary created before status tracking existed gets its record now
    conn.execute(
        r#"
        INSERT INTO diary_status (diary_id, status, run_token)
        VALUES (?1, ?2, 1)
        ON CONFLICT(diary_id) DO UPDATE SET
            status = ?2,
            run_token = run_token + 1,
            updated_at = CURRENT_TIMESTAMP
        "#,
        params![id, ProcessingStatus::Queued.as_str()],
    )?;

    conn.execute("DELETE FROM diary_tags WHERE diary_id = ?", params![id])?;
    Ok(())
}

impl Database {
    /// Create a diary together with its QUEUED status record (run token 1)
    ///
    /// Both rows are written in one transaction, so a diary is never visible
    /// without its status record.
    pub fn create_diary(&self, user_id: i64, new: &NewDiary) -> Result<(Diary, StatusRecord)> {
        validate(new)?;
        let conn = self.conn()?;

        let (diary, status) = with_transaction(&conn, |conn| {
            conn.execute(
                r#"
                INSERT INTO diaries (user_id, title, content, date, shared)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    user_id,
                    new.title.trim(),
                    new.content,
                    new.date.format("%Y-%m-%d").to_string(),
                    new.shared
                ],
            )?;
            let id = conn.last_insert_rowid();

            conn.execute(
                "INSERT INTO diary_status (diary_id, status, run_token) VALUES (?, ?, 1)",
                params![id, ProcessingStatus::Queued.as_str()],
            )?;

            let diary = query_diary(conn, id)?
                .ok_or_else(|| Error::NotFound(format!("Diary {}", id)))?;
            let status = query_status(conn, id)?;
            Ok((diary, status))
        })?;

        info!(diary_id = diary.id, user_id, "Diary created");
        Ok((diary, status))
    }

    /// Get a diary by ID regardless of owner (background processing only)
    pub fn get_diary(&self, id: i64) -> Result<Option<Diary>> {
        let conn = self.conn()?;
        query_diary(&conn, id)
    }

    /// Get a diary if it exists and belongs to `user_id`
    pub fn get_owned_diary(&self, id: i64, user_id: i64) -> Result<Option<Diary>> {
        let conn = self.conn()?;
        let diary = conn
            .query_row(
                &format!(
                    "SELECT {} FROM diaries d WHERE d.id = ? AND d.user_id = ?",
                    DIARY_COLUMNS
                ),
                params![id, user_id],
                diary_from_row,
            )
            .optional()?;
        Ok(diary)
    }

    /// List a user's diaries, newest business date first
    pub fn list_diaries(&self, user_id: i64) -> Result<Vec<Diary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM diaries d WHERE d.user_id = ? ORDER BY d.date DESC, d.id DESC",
            DIARY_COLUMNS
        ))?;
        let diaries = stmt
            .query_map(params![user_id], diary_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(diaries)
    }

    /// Get an owned diary with its status record and tags
    pub fn get_diary_detail(&self, id: i64, user_id: i64) -> Result<Option<DiaryDetail>> {
        let Some(diary) = self.get_owned_diary(id, user_id)? else {
            return Ok(None);
        };
        let status_tracking = self.get_status(id)?;
        let tags = self.get_diary_tags(id)?;
        Ok(Some(DiaryDetail {
            diary,
            status_tracking,
            tags,
        }))
    }

    /// Edit an owned diary and queue a fresh processing run
    ///
    /// Resets the status to QUEUED, bumps the run token (so any in-flight
    /// run's writes are discarded) and clears the tag links the previous
    /// content produced. Returns `None` if the diary is missing or not owned.
    pub fn update_diary(
        &self,
        id: i64,
        user_id: i64,
        changes: &NewDiary,
    ) -> Result<Option<(Diary, StatusRecord)>> {
        validate(changes)?;
        let conn = self.conn()?;

        let updated = with_transaction(&conn, |conn| {
            if !owns(conn, id, user_id)? {
                return Ok(None);
            }

            conn.execute(
                r#"
                UPDATE diaries
                SET title = ?, content = ?, date = ?, shared = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
                params![
                    changes.title.trim(),
                    changes.content,
                    changes.date.format("%Y-%m-%d").to_string(),
                    changes.shared,
                    id
                ],
            )?;

            start_new_run(conn, id)?;

            let diary =
                query_diary(conn, id)?.ok_or_else(|| Error::NotFound(format!("Diary {}", id)))?;
            let status = query_status(conn, id)?;
            Ok(Some((diary, status)))
        })?;

        if let Some((_, ref status)) = updated {
            info!(diary_id = id, run_token = status.run_token, "Diary updated, re-queued");
        }
        Ok(updated)
    }

    /// Queue a fresh run for an unchanged diary (operator re-processing)
    ///
    /// Same reset as an edit: QUEUED, bumped run token, tag links cleared.
    /// Returns `None` if the diary does not exist.
    pub fn requeue_diary(&self, id: i64) -> Result<Option<StatusRecord>> {
        let conn = self.conn()?;
        let status = with_transaction(&conn, |conn| {
            if query_diary(conn, id)?.is_none() {
                return Ok(None);
            }
            start_new_run(conn, id)?;
            Ok(Some(query_status(conn, id)?))
        })?;

        if let Some(ref status) = status {
            info!(diary_id = id, run_token = status.run_token, "Diary re-queued");
        }
        Ok(status)
    }

    /// Delete an owned diary (status record and tag links cascade)
    pub fn delete_diary(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM diaries WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted > 0 {
            info!(diary_id = id, "Diary deleted");
        }
        Ok(deleted > 0)
    }

    /// Store a generated comment on an owned diary
    pub fn set_diary_comment(&self, id: i64, user_id: i64, comment: &str) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE diaries SET comment = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
            params![comment, id, user_id],
        )?;
        Ok(updated > 0)
    }
}
