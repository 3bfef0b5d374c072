//! Processing status records
//!
//! Writes made on behalf of a processing run carry that run's token and only
//! apply while it is still the diary's current token. Once an edit bumps the
//! token, everything the old run tries to write is dropped.

use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::{parse_datetime, with_transaction, Database, DbConn};
use crate::error::Result;
use crate::models::{Diary, ProcessingStatus, StatusRecord, StatusSummary};

pub(super) fn status_from_row(row: &Row) -> rusqlite::Result<StatusRecord> {
    let status: String = row.get(1)?;
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(StatusRecord {
        diary_id: row.get(0)?,
        status: status.parse().unwrap_or(ProcessingStatus::Failed),
        run_token: row.get(2)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

/// Whether `run_token` is still the diary's current run
pub(super) fn run_is_current(conn: &DbConn, diary_id: i64, run_token: i64) -> Result<bool> {
    let current: Option<i64> = conn
        .query_row(
            "SELECT run_token FROM diary_status WHERE diary_id = ?",
            params![diary_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(current == Some(run_token))
}

fn set_status(conn: &DbConn, diary_id: i64, status: ProcessingStatus) -> Result<()> {
    conn.execute(
        "UPDATE diary_status SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE diary_id = ?",
        params![status.as_str(), diary_id],
    )?;
    Ok(())
}

impl Database {
    /// Get the status record for a diary
    pub fn get_status(&self, diary_id: i64) -> Result<Option<StatusRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT diary_id, status, run_token, created_at, updated_at
                 FROM diary_status WHERE diary_id = ?",
                params![diary_id],
                status_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Move a run to ANALYZING
    ///
    /// Ownership is decided by the run token alone: reconciliation may have
    /// overwritten the status of a queued run with the analysis server's view
    /// of the previous run. Returns false if the run is stale.
    pub fn mark_analyzing(&self, diary_id: i64, run_token: i64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE diary_status
            SET status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE diary_id = ? AND run_token = ?
            "#,
            params![ProcessingStatus::Analyzing.as_str(), diary_id, run_token],
        )?;
        Ok(updated > 0)
    }

    /// Record the analysis server's answer for a run
    ///
    /// Emotion and image URL are written only when `status` is COMPLETED;
    /// any other status is recorded on its own. Returns false if the run is stale.
    pub fn record_analysis(
        &self,
        diary_id: i64,
        run_token: i64,
        status: ProcessingStatus,
        emotion: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let applied = with_transaction(&conn, |conn| {
            if !run_is_current(conn, diary_id, run_token)? {
                return Ok(false);
            }
            if status == ProcessingStatus::Completed {
                conn.execute(
                    "UPDATE diaries SET emotion = ?, image_url = ? WHERE id = ?",
                    params![emotion, image_url, diary_id],
                )?;
            }
            set_status(conn, diary_id, status)?;
            Ok(true)
        })?;

        if applied {
            info!(diary_id, run_token, status = %status, "Analysis recorded");
        } else {
            debug!(diary_id, run_token, "Discarded analysis result from stale run");
        }
        Ok(applied)
    }

    /// Finish a tag run: write the derived emotion and mark COMPLETED
    pub fn complete_tag_run(&self, diary_id: i64, run_token: i64, emotion: &str) -> Result<bool> {
        let conn = self.conn()?;
        let applied = with_transaction(&conn, |conn| {
            if !run_is_current(conn, diary_id, run_token)? {
                return Ok(false);
            }
            conn.execute(
                "UPDATE diaries SET emotion = ? WHERE id = ?",
                params![emotion, diary_id],
            )?;
            set_status(conn, diary_id, ProcessingStatus::Completed)?;
            Ok(true)
        })?;

        if applied {
            info!(diary_id, run_token, emotion, "Tag run completed");
        }
        Ok(applied)
    }

    /// Mark a run FAILED (no-op for a stale run)
    pub fn fail_run(&self, diary_id: i64, run_token: i64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE diary_status
            SET status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE diary_id = ? AND run_token = ?
            "#,
            params![ProcessingStatus::Failed.as_str(), diary_id, run_token],
        )?;
        Ok(updated > 0)
    }

    /// Adopt the analysis server's view of a diary
    ///
    /// Overwrites the local status unconditionally. On COMPLETED, emotion and
    /// image URL are copied only if the diary has no emotion yet. Returns the
    /// diary as stored afterwards, or `None` if it no longer exists.
    pub fn reconcile_status(
        &self,
        diary_id: i64,
        status: ProcessingStatus,
        emotion: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Option<Diary>> {
        let conn = self.conn()?;
        with_transaction(&conn, |conn| {
            conn.execute(
                r#"
                INSERT INTO diary_status (diary_id, status, run_token)
                SELECT id, ?2, 1 FROM diaries WHERE id = ?1
                ON CONFLICT(diary_id) DO UPDATE SET
                    status = ?2,
                    updated_at = CURRENT_TIMESTAMP
                "#,
                params![diary_id, status.as_str()],
            )?;

            if status == ProcessingStatus::Completed {
                conn.execute(
                    "UPDATE diaries SET emotion = ?, image_url = ? WHERE id = ? AND emotion IS NULL",
                    params![emotion, image_url, diary_id],
                )?;
            }
            Ok(())
        })?;

        self.get_diary(diary_id)
    }

    /// Runs that never reached a terminal state: (diary_id, run_token)
    pub fn list_unfinished_runs(&self) -> Result<Vec<(i64, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT diary_id, run_token FROM diary_status
            WHERE status IN ('QUEUED', 'ANALYZING')
            ORDER BY diary_id
            "#,
        )?;
        let runs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Count diaries in each processing state
    pub fn status_summary(&self) -> Result<StatusSummary> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM diary_status GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summary = StatusSummary::default();
        for (status, count) in rows {
            match status.parse::<ProcessingStatus>() {
                Ok(ProcessingStatus::Queued) => summary.queued += count,
                Ok(ProcessingStatus::Analyzing) => summary.analyzing += count,
                Ok(ProcessingStatus::Generating) => summary.generating += count,
                Ok(ProcessingStatus::Completed) => summary.completed += count,
                Ok(ProcessingStatus::Failed) | Err(_) => summary.failed += count,
            }
        }
        Ok(summary)
    }
}
