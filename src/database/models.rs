/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to the `translations` table and provide
 * type-safe access to persisted cache rows.
 */

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current version of the serialized [`CacheMetadata`] layout
pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Format a timestamp the way it is stored in the database
///
/// Fixed microsecond precision with a `Z` suffix keeps string ordering
/// identical to chronological ordering.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid stored timestamp: {}", value))?
        .with_timezone(&Utc))
}

/// Bound a quality score to `0.0..=1.0`; non-finite scores become 0.0
pub fn normalize_quality(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Typed metadata attached to a cache row
///
/// Stored as JSON in the `metadata` column. Unknown fields from newer
/// layouts are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Layout version of this blob
    #[serde(default = "default_metadata_version")]
    pub schema_version: u32,
    /// Which route produced the translation (e.g. `model`, `fast`)
    #[serde(default)]
    pub source: Option<String>,
    /// Final clamped intensity of the source text
    #[serde(default)]
    pub intensity: Option<f64>,
    /// Aggregate register intensity of the source text
    #[serde(default)]
    pub register_intensity: Option<f64>,
    /// Register categories matched in the source text
    #[serde(default)]
    pub registers: Vec<String>,
}

fn default_metadata_version() -> u32 {
    METADATA_SCHEMA_VERSION
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self {
            schema_version: METADATA_SCHEMA_VERSION,
            source: None,
            intensity: None,
            register_intensity: None,
            registers: Vec::new(),
        }
    }
}

impl CacheMetadata {
    /// Serialize to the stored JSON form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize cache metadata")
    }

    /// Deserialize from the stored JSON form
    pub fn from_json(value: &str) -> Result<Self> {
        serde_json::from_str(value).context("Failed to deserialize cache metadata")
    }
}

/// A row of the `translations` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// SHA-256 cache key over text and language pair
    pub text_hash: String,
    /// Original source text
    pub original_text: String,
    /// Translated text
    pub translated_text: String,
    /// Source language code
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Quality score in [0.0, 1.0]
    pub quality_score: f64,
    /// Number of times the row was written or served
    pub use_count: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last time the row was written or served
    pub last_used: DateTime<Utc>,
    /// Optional typed metadata
    pub metadata: Option<CacheMetadata>,
}

impl CacheRecord {
    /// Create a new cache record stamped with the current time
    pub fn new(
        text_hash: String,
        original_text: String,
        translated_text: String,
        source_lang: String,
        target_lang: String,
        quality_score: f64,
        metadata: Option<CacheMetadata>,
    ) -> Self {
        let now = Utc::now();
        Self {
            text_hash,
            original_text,
            translated_text,
            source_lang,
            target_lang,
            quality_score: normalize_quality(quality_score),
            use_count: 1,
            created_at: now,
            last_used: now,
            metadata,
        }
    }
}

/// One line of translation history, most recently used first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Original source text
    pub original_text: String,
    /// Translated text
    pub translated_text: String,
    /// Quality score
    pub quality_score: f64,
    /// Last time the row was written or served
    pub last_used: DateTime<Utc>,
    /// Use count
    pub use_count: i64,
}

/// Aggregate view over all cache rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of rows
    pub total_entries: i64,
    /// Average quality score (0.0 when empty)
    pub avg_quality: f64,
    /// Average use count (0.0 when empty)
    pub avg_use_count: f64,
    /// Sum of all use counts
    pub total_uses: i64,
    /// Rows used within the last 7 days
    pub active_entries: i64,
    /// Rows with quality above 0.9
    pub high_quality_entries: i64,
    /// `total_uses / max(total_entries, 1)`
    pub hit_rate: f64,
}
