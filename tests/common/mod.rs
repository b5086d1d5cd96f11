/*!
 * Common test utilities for the transgate test suite
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use transgate::database::{CacheMetadata, CacheRecord};
use transgate::providers::mock::MockBackend;
use transgate::translation::{ManagerSettings, PatternTable, TranslationCache, TranslationManager};

/// Route library logs through env_logger once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A manager over an in-memory cache plus handles on its mock backends
pub struct Harness {
    pub manager: TranslationManager,
    pub fast: MockBackend,
    pub model: MockBackend,
}

/// Build a harness with default settings
pub fn harness(fast: MockBackend, model: MockBackend) -> Harness {
    harness_with(fast, model, ManagerSettings::default())
}

/// Build a harness with custom settings
pub fn harness_with(fast: MockBackend, model: MockBackend, settings: ManagerSettings) -> Harness {
    init_logging();

    let fast = fast.named("fast");
    let model = model.named("model");
    let manager = TranslationManager::new(
        TranslationCache::in_memory().expect("in-memory cache"),
        Arc::new(fast.clone()),
        Arc::new(model.clone()),
        &PatternTable::builtin().expect("built-in pattern table"),
        settings,
    )
    .expect("manager");

    Harness {
        manager,
        fast,
        model,
    }
}

/// Settings with a short backend timeout
pub fn settings_with_timeout(timeout: Duration) -> ManagerSettings {
    ManagerSettings {
        backend_timeout: timeout,
        ..ManagerSettings::default()
    }
}

/// Insert a row whose timestamps lie `days_ago` days in the past
pub async fn insert_aged_entry(
    cache: &TranslationCache,
    text: &str,
    translation: &str,
    use_count: i64,
    days_ago: i64,
) {
    let mut record = CacheRecord::new(
        TranslationCache::cache_key(text, "en", "fr"),
        text.to_string(),
        translation.to_string(),
        "en".to_string(),
        "fr".to_string(),
        0.9,
        Some(CacheMetadata::default()),
    );
    let then = Utc::now() - chrono::Duration::days(days_ago);
    record.created_at = then;
    record.last_used = then;
    record.use_count = use_count;

    cache
        .repository()
        .upsert_entry(&record)
        .await
        .expect("insert aged entry");
}

/// Current use count of a row, without counting a hit
pub async fn use_count(cache: &TranslationCache, text: &str, source: &str, target: &str) -> Option<i64> {
    cache
        .repository()
        .peek_entry(&TranslationCache::cache_key(text, source, target))
        .await
        .expect("peek entry")
        .map(|record| record.use_count)
}
