//! Emotion distribution and image gallery queries

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, Database};
use crate::error::Result;
use crate::models::{EmotionStat, GalleryImage, WritingStats};

fn image_from_row(row: &Row) -> rusqlite::Result<GalleryImage> {
    let date: String = row.get(3)?;
    Ok(GalleryImage {
        id: row.get(0)?,
        url: row.get(1)?,
        emotion: row.get(2)?,
        date: parse_date(&date)?,
        title: row.get(4)?,
        content: row.get(5)?,
    })
}

impl Database {
    /// Emotion distribution over a user's diaries, most frequent first
    ///
    /// Diaries with no emotion yet are not counted. Percentages are shares of
    /// the counted diaries, rounded to one decimal.
    pub fn emotion_stats(&self, user_id: i64) -> Result<Vec<EmotionStat>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT emotion, COUNT(*) AS count
            FROM diaries
            WHERE user_id = ? AND emotion IS NOT NULL
            GROUP BY emotion
            ORDER BY count DESC, emotion
            "#,
        )?;
        let counts = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total: i64 = counts.iter().map(|(_, c)| c).sum();
        let stats = counts
            .into_iter()
            .map(|(emotion, count)| {
                let percentage = if total > 0 {
                    (count as f64 / total as f64 * 1000.0).round() / 10.0
                } else {
                    0.0
                };
                EmotionStat {
                    emotion,
                    count,
                    percentage,
                }
            })
            .collect();
        Ok(stats)
    }

    /// Images of a user's COMPLETED diaries, newest business date first
    pub fn gallery_images(&self, user_id: i64, emotion: Option<&str>) -> Result<Vec<GalleryImage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT d.id, d.image_url, d.emotion, d.date, d.title, d.content
            FROM diaries d
            JOIN diary_status s ON s.diary_id = d.id
            WHERE d.user_id = ?1
              AND s.status = 'COMPLETED'
              AND d.image_url IS NOT NULL
              AND (?2 IS NULL OR d.emotion = ?2)
            ORDER BY d.date DESC, d.id DESC
            "#,
        )?;
        let images = stmt
            .query_map(params![user_id, emotion], image_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(images)
    }

    /// The image of one owned diary, if it has one (any status)
    pub fn gallery_image(&self, user_id: i64, diary_id: i64) -> Result<Option<GalleryImage>> {
        let conn = self.conn()?;
        let image = conn
            .query_row(
                r#"
                SELECT id, image_url, emotion, date, title, content
                FROM diaries
                WHERE id = ? AND user_id = ? AND image_url IS NOT NULL
                "#,
                params![diary_id, user_id],
                image_from_row,
            )
            .optional()?;
        Ok(image)
    }

    /// Writing habit summary relative to `today`
    pub fn writing_stats(&self, user_id: i64, today: NaiveDate) -> Result<WritingStats> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT date, LENGTH(content) FROM diaries WHERE user_id = ?")?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                let date: String = row.get(0)?;
                Ok((parse_date(&date)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total_entries = rows.len() as i64;
        if total_entries == 0 {
            return Ok(WritingStats::default());
        }

        let monthly_entries = rows
            .iter()
            .filter(|(d, _)| d.year() == today.year() && d.month() == today.month())
            .count() as i64;

        let dates: HashSet<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
        let mut consecutive_days = 0;
        while dates.contains(&(today - Duration::days(consecutive_days))) {
            consecutive_days += 1;
        }

        let total_length: i64 = rows.iter().map(|(_, len)| len).sum();

        Ok(WritingStats {
            consecutive_days,
            total_entries,
            monthly_entries,
            average_length: total_length / total_entries,
        })
    }
}
