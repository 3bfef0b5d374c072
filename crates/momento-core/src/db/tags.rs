//! Tag and diary-tag operations, plus tag-overlap similarity search

use rusqlite::{params, params_from_iter, types::Value, OptionalExtension, Row};
use tracing::debug;

use super::status::run_is_current;
use super::{parse_datetime, with_transaction, Database};
use crate::error::{Error, Result};
use crate::models::{SimilarDiary, Tag, TagCategory};

/// Hard cap on similarity results regardless of what the caller asks for
pub const MAX_SIMILAR_LIMIT: i64 = 10;

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    let category: Option<String> = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        category: category.and_then(|c| c.parse().ok()),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Find a tag by name, creating it if needed; returns the tag ID
    ///
    /// Safe under concurrent first use: the insert is a no-op when another
    /// writer got there first, and the follow-up select sees their row.
    /// An existing tag keeps its original category.
    pub fn find_or_create_tag(&self, name: &str, category: Option<TagCategory>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Tag name must not be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tags (name, category) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
            params![name, category.map(|c| c.as_str())],
        )?;
        let id = conn.query_row("SELECT id FROM tags WHERE name = ?", params![name], |row| {
            row.get(0)
        })?;
        Ok(id)
    }

    /// Get a tag by name
    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        let tag = conn
            .query_row(
                "SELECT id, name, category, created_at FROM tags WHERE name = ?",
                params![name.trim()],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    /// Link tags to a diary on behalf of a processing run
    ///
    /// Linking is idempotent. Nothing is written if the run is stale.
    pub fn link_tags_for_run(&self, diary_id: i64, run_token: i64, tag_ids: &[i64]) -> Result<bool> {
        let conn = self.conn()?;
        let applied = with_transaction(&conn, |conn| {
            if !run_is_current(conn, diary_id, run_token)? {
                return Ok(false);
            }
            let mut stmt =
                conn.prepare("INSERT OR IGNORE INTO diary_tags (diary_id, tag_id) VALUES (?, ?)")?;
            for tag_id in tag_ids {
                stmt.execute(params![diary_id, tag_id])?;
            }
            Ok(true)
        })?;

        if !applied {
            debug!(diary_id, run_token, "Discarded tag links from stale run");
        }
        Ok(applied)
    }

    /// Tags linked to a diary, by name
    pub fn get_diary_tags(&self, diary_id: i64) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.category, t.created_at
            FROM tags t
            JOIN diary_tags dt ON dt.tag_id = t.id
            WHERE dt.diary_id = ?
            ORDER BY t.name
            "#,
        )?;
        let tags = stmt
            .query_map(params![diary_id], tag_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// Find the owner's other diaries sharing at least `min_matching` of `tag_names`
    ///
    /// Ordered by number of matching tags, then by business date (newest
    /// first). `limit` is clamped to 1..=10. An empty tag set matches nothing.
    pub fn find_similar_diaries<S: AsRef<str>>(
        &self,
        current_diary_id: i64,
        user_id: i64,
        tag_names: &[S],
        min_matching: i64,
        limit: i64,
    ) -> Result<Vec<SimilarDiary>> {
        let mut names: Vec<&str> = tag_names
            .iter()
            .map(|n| n.as_ref().trim())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_unstable();
        names.dedup();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let limit = limit.clamp(1, MAX_SIMILAR_LIMIT);
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            r#"
            SELECT d.id, d.content, COUNT(dt.tag_id) AS matching
            FROM diaries d
            JOIN diary_tags dt ON dt.diary_id = d.id
            JOIN tags t ON t.id = dt.tag_id
            WHERE d.user_id = ?
              AND d.id != ?
              AND t.name IN ({})
            GROUP BY d.id
            HAVING COUNT(dt.tag_id) >= ?
            ORDER BY matching DESC, d.date DESC
            LIMIT ?
            "#,
            placeholders
        );

        let mut values: Vec<Value> = Vec::with_capacity(names.len() + 4);
        values.push(Value::Integer(user_id));
        values.push(Value::Integer(current_diary_id));
        values.extend(names.iter().map(|n| Value::Text(n.to_string())));
        values.push(Value::Integer(min_matching));
        values.push(Value::Integer(limit));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let similar = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(SimilarDiary {
                    diary_id: row.get(0)?,
                    content: row.get(1)?,
                    matching_tags: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(similar)
    }
}
