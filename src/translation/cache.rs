/*!
 * Persistent translation cache.
 *
 * Rows are keyed by a SHA-256 digest over the trimmed text and the
 * normalized language pair. A row is live while its `last_used` lies within
 * the retention window; hits bump `use_count` atomically in SQLite.
 */

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::database::{CacheMetadata, CacheRecord, CacheStats, HistoryRecord, Repository};
use crate::errors::TranslationError;
use crate::language_utils::cache_language_code;

/// Days a row stays live after its last use
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Days a row used only once survives after creation
pub const DEFAULT_SINGLE_USE_GRACE_DAYS: u32 = 7;

/// Rows used within this many days count as active in statistics
const ACTIVE_WINDOW_DAYS: u32 = 7;

/// `now` minus `days`, saturating at the Unix epoch
fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .map_or(DateTime::UNIX_EPOCH, |cutoff| cutoff.max(DateTime::UNIX_EPOCH))
}

fn cache_error(error: anyhow::Error) -> TranslationError {
    TranslationError::Cache(format!("{:#}", error))
}

/// SQLite-backed translation cache
#[derive(Clone)]
pub struct TranslationCache {
    repository: Repository,
    retention_days: u32,
    single_use_grace_days: u32,
}

impl TranslationCache {
    /// Create a cache over a repository
    pub fn new(repository: Repository, retention_days: u32, single_use_grace_days: u32) -> Self {
        Self {
            repository,
            retention_days,
            single_use_grace_days,
        }
    }

    /// Create a cache with the default retention and grace periods
    pub fn with_defaults(repository: Repository) -> Self {
        Self::new(
            repository,
            DEFAULT_RETENTION_DAYS,
            DEFAULT_SINGLE_USE_GRACE_DAYS,
        )
    }

    /// Create a cache over a fresh in-memory database
    pub fn in_memory() -> Result<Self, TranslationError> {
        Ok(Self::with_defaults(
            Repository::new_in_memory().map_err(cache_error)?,
        ))
    }

    /// Deterministic key for a text and language pair
    ///
    /// Each field is length-prefixed so that shifting characters between
    /// fields always changes the digest.
    pub fn cache_key(text: &str, source_language: &str, target_language: &str) -> String {
        let mut hasher = Sha256::new();
        for field in [
            text.trim().to_string(),
            cache_language_code(source_language),
            cache_language_code(target_language),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Retention window in days
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Return a live row and record the hit
    pub async fn get_cached(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Option<CacheRecord>, TranslationError> {
        let key = Self::cache_key(text, source_language, target_language);
        let now = Utc::now();
        let fresh_after = days_before(now, self.retention_days);

        let entry = self
            .repository
            .touch_live_entry(&key, fresh_after, now)
            .await
            .map_err(cache_error)?;

        match &entry {
            Some(record) => debug!(
                "Cache hit for '{}' ({} -> {}), use count {}",
                preview(text),
                source_language,
                target_language,
                record.use_count
            ),
            None => debug!(
                "Cache miss for '{}' ({} -> {})",
                preview(text),
                source_language,
                target_language
            ),
        }

        Ok(entry)
    }

    /// Insert or overwrite the row for a text and language pair
    pub async fn store(
        &self,
        text: &str,
        translation: &str,
        source_language: &str,
        target_language: &str,
        quality_score: f64,
        metadata: Option<CacheMetadata>,
    ) -> Result<(), TranslationError> {
        let record = CacheRecord::new(
            Self::cache_key(text, source_language, target_language),
            text.to_string(),
            translation.to_string(),
            cache_language_code(source_language),
            cache_language_code(target_language),
            quality_score,
            metadata,
        );

        self.repository
            .upsert_entry(&record)
            .await
            .map_err(cache_error)?;

        debug!(
            "Cached translation for '{}' with quality {:.2}",
            preview(text),
            record.quality_score
        );
        Ok(())
    }

    /// Evict stale rows and single-use rows past the grace period
    pub async fn cleanup(&self, max_days: u32) -> Result<usize, TranslationError> {
        let now = Utc::now();
        let deleted = self
            .repository
            .delete_expired(
                days_before(now, max_days),
                days_before(now, self.single_use_grace_days),
            )
            .await
            .map_err(cache_error)?;

        info!("Cache cleanup removed {} entries", deleted);
        Ok(deleted)
    }

    /// Aggregate statistics over every row
    pub async fn stats(&self) -> Result<CacheStats, TranslationError> {
        self.repository
            .cache_stats(days_before(Utc::now(), ACTIVE_WINDOW_DAYS))
            .await
            .map_err(cache_error)
    }

    /// Most recently used rows first
    pub async fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, TranslationError> {
        self.repository.history(limit).await.map_err(cache_error)
    }

    /// Remove every row
    pub async fn clear(&self) -> Result<usize, TranslationError> {
        self.repository.clear().await.map_err(cache_error)
    }
}

/// Shorten text for log lines
pub(crate) fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 30;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CHARS).collect();
        format!("{}...", head)
    }
}
