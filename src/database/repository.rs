/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for the translation cache table,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::{OptionalExtension, Row, params};

use super::connection::DatabaseConnection;
use super::models::{
    CacheMetadata, CacheRecord, CacheStats, HistoryRecord, format_timestamp, parse_timestamp,
};

/// Column list shared by every query returning a full cache row
const RECORD_COLUMNS: &str = "text_hash, original_text, translated_text, source_lang, target_lang, \
     quality_score, use_count, created_at, last_used, metadata";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

/// A cache row as read from SQLite, before timestamp and metadata parsing
struct RawCacheRow {
    text_hash: String,
    original_text: String,
    translated_text: String,
    source_lang: String,
    target_lang: String,
    quality_score: f64,
    use_count: i64,
    created_at: String,
    last_used: String,
    metadata: Option<String>,
}

impl RawCacheRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            text_hash: row.get(0)?,
            original_text: row.get(1)?,
            translated_text: row.get(2)?,
            source_lang: row.get(3)?,
            target_lang: row.get(4)?,
            quality_score: row.get(5)?,
            use_count: row.get(6)?,
            created_at: row.get(7)?,
            last_used: row.get(8)?,
            metadata: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<CacheRecord> {
        let metadata = match self.metadata.as_deref() {
            Some(json) => match CacheMetadata::from_json(json) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!("Ignoring unreadable metadata on cache row {}: {}", self.text_hash, e);
                    None
                }
            },
            None => None,
        };

        Ok(CacheRecord {
            created_at: parse_timestamp(&self.created_at)?,
            last_used: parse_timestamp(&self.last_used)?,
            text_hash: self.text_hash,
            original_text: self.original_text,
            translated_text: self.translated_text,
            source_lang: self.source_lang,
            target_lang: self.target_lang,
            quality_score: self.quality_score,
            use_count: self.use_count,
            metadata,
        })
    }
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Access the underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Cache Operations
    // =========================================================================

    /// Fetch a live row and record the hit in a single statement
    ///
    /// Rows whose `last_used` is not after `fresh_after` are treated as
    /// missing. The increment and the touch happen in one `UPDATE ... RETURNING`
    /// so concurrent hits on the same key never lose an update.
    pub async fn touch_live_entry(
        &self,
        text_hash: &str,
        fresh_after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheRecord>> {
        let text_hash = text_hash.to_string();
        let fresh_after = format_timestamp(fresh_after);
        let now = format_timestamp(now);

        let raw = self
            .db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    UPDATE translations
                    SET use_count = use_count + 1, last_used = ?3
                    WHERE text_hash = ?1 AND last_used > ?2
                    RETURNING {}
                    "#,
                    RECORD_COLUMNS
                );

                let raw = conn
                    .query_row(&sql, params![text_hash, fresh_after, now], RawCacheRow::from_row)
                    .optional()?;
                Ok(raw)
            })
            .await?;

        raw.map(RawCacheRow::into_record).transpose()
    }

    /// Read a row without counting it as a hit
    pub async fn peek_entry(&self, text_hash: &str) -> Result<Option<CacheRecord>> {
        let text_hash = text_hash.to_string();

        let raw = self
            .db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM translations WHERE text_hash = ?1",
                    RECORD_COLUMNS
                );
                let raw = conn
                    .query_row(&sql, [text_hash], RawCacheRow::from_row)
                    .optional()?;
                Ok(raw)
            })
            .await?;

        raw.map(RawCacheRow::into_record).transpose()
    }

    /// Insert a row, or overwrite every column of the existing row with the same key
    pub async fn upsert_entry(&self, record: &CacheRecord) -> Result<()> {
        let metadata = record
            .metadata
            .as_ref()
            .map(CacheMetadata::to_json)
            .transpose()?;
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (
                        text_hash, original_text, translated_text, source_lang, target_lang,
                        quality_score, use_count, created_at, last_used, metadata
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(text_hash) DO UPDATE SET
                        original_text = excluded.original_text,
                        translated_text = excluded.translated_text,
                        source_lang = excluded.source_lang,
                        target_lang = excluded.target_lang,
                        quality_score = excluded.quality_score,
                        use_count = excluded.use_count,
                        created_at = excluded.created_at,
                        last_used = excluded.last_used,
                        metadata = excluded.metadata
                    "#,
                    params![
                        record.text_hash,
                        record.original_text,
                        record.translated_text,
                        record.source_lang,
                        record.target_lang,
                        record.quality_score,
                        record.use_count,
                        format_timestamp(record.created_at),
                        format_timestamp(record.last_used),
                        metadata,
                    ],
                )?;
                debug!("Stored cache row {}", record.text_hash);
                Ok(())
            })
            .await
    }

    /// Delete stale rows and rows that were never reused
    ///
    /// A row goes when `last_used` is before `stale_before`, or when it has a
    /// single use and was created before `single_use_before`.
    pub async fn delete_expired(
        &self,
        stale_before: DateTime<Utc>,
        single_use_before: DateTime<Utc>,
    ) -> Result<usize> {
        let stale_before = format_timestamp(stale_before);
        let single_use_before = format_timestamp(single_use_before);

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute(
                    r#"
                    DELETE FROM translations
                    WHERE last_used < ?1
                       OR (use_count = 1 AND created_at < ?2)
                    "#,
                    params![stale_before, single_use_before],
                )?;
                Ok(deleted)
            })
            .await
    }

    /// Aggregate statistics over every row
    ///
    /// Rows used after `active_after` count as active.
    pub async fn cache_stats(&self, active_after: DateTime<Utc>) -> Result<CacheStats> {
        let active_after = format_timestamp(active_after);

        self.db
            .execute_async(move |conn| {
                let stats = conn.query_row(
                    r#"
                    SELECT
                        COUNT(*),
                        COALESCE(AVG(quality_score), 0.0),
                        COALESCE(AVG(use_count), 0.0),
                        COALESCE(SUM(use_count), 0),
                        COUNT(CASE WHEN last_used > ?1 THEN 1 END),
                        COUNT(CASE WHEN quality_score > 0.9 THEN 1 END)
                    FROM translations
                    "#,
                    [active_after],
                    |row| {
                        let total_entries: i64 = row.get(0)?;
                        let total_uses: i64 = row.get(3)?;
                        Ok(CacheStats {
                            total_entries,
                            avg_quality: row.get(1)?,
                            avg_use_count: row.get(2)?,
                            total_uses,
                            active_entries: row.get(4)?,
                            high_quality_entries: row.get(5)?,
                            hit_rate: total_uses as f64 / total_entries.max(1) as f64,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
    }

    /// Most recently used rows first, bounded by `limit`
    pub async fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<(String, String, f64, String, i64)> = self
            .db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT original_text, translated_text, quality_score, last_used, use_count
                    FROM translations
                    ORDER BY last_used DESC
                    LIMIT ?1
                    "#,
                )?;

                let rows = stmt
                    .query_map([limit], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(original_text, translated_text, quality_score, last_used, use_count)| {
                Ok(HistoryRecord {
                    original_text,
                    translated_text,
                    quality_score,
                    last_used: parse_timestamp(&last_used)?,
                    use_count,
                })
            })
            .collect()
    }

    /// Remove every cached translation
    pub async fn clear(&self) -> Result<usize> {
        self.db
            .execute_async(|conn| {
                let deleted = conn.execute("DELETE FROM translations", [])?;
                Ok(deleted)
            })
            .await
    }
}
