/*!
 * Tests for translation cache functionality
 */

use transgate::database::{CacheMetadata, Repository};
use transgate::translation::TranslationCache;

use crate::common::{insert_aged_entry, use_count};

#[tokio::test]
async fn test_cache_store_thenGet_shouldReturnTranslation() {
    let cache = TranslationCache::in_memory().unwrap();
    cache
        .store("hello", "bonjour", "en", "fr", 0.9, None)
        .await
        .unwrap();

    let entry = cache.get_cached("hello", "en", "fr").await.unwrap().unwrap();
    assert_eq!(entry.translated_text, "bonjour");
    assert_eq!(entry.quality_score, 0.9);
}

#[tokio::test]
async fn test_cache_get_withDifferentLanguages_shouldMiss() {
    let cache = TranslationCache::in_memory().unwrap();
    cache
        .store("hello", "bonjour", "en", "fr", 0.9, None)
        .await
        .unwrap();

    assert!(cache.get_cached("hello", "de", "fr").await.unwrap().is_none());
    assert!(cache.get_cached("hello", "en", "es").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cache_get_withEquivalentLanguageCodes_shouldHit() {
    let cache = TranslationCache::in_memory().unwrap();
    cache
        .store("hello", "你好", "en", "zh", 0.9, None)
        .await
        .unwrap();

    assert!(cache.get_cached("hello", "eng", "chi").await.unwrap().is_some());
    assert!(cache.get_cached("  hello ", "en", "zho").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cache_get_withStaleEntry_shouldMissWithoutTouching() {
    let cache = TranslationCache::in_memory().unwrap();
    insert_aged_entry(&cache, "old news", "vieilles nouvelles", 4, 31).await;

    assert!(cache.get_cached("old news", "en", "fr").await.unwrap().is_none());
    assert_eq!(use_count(&cache, "old news", "en", "fr").await, Some(4));
}

#[tokio::test]
async fn test_cache_get_withEntryInsideWindow_shouldHitAndCount() {
    let cache = TranslationCache::in_memory().unwrap();
    insert_aged_entry(&cache, "recent", "récent", 2, 29).await;

    let entry = cache.get_cached("recent", "en", "fr").await.unwrap().unwrap();
    assert_eq!(entry.use_count, 3);
}

#[tokio::test]
async fn test_cache_cleanup_shouldEvictSingleUseAfterGracePeriod() {
    let cache = TranslationCache::in_memory().unwrap();
    insert_aged_entry(&cache, "one-off", "unique", 1, 10).await;
    insert_aged_entry(&cache, "regular", "habituel", 3, 10).await;
    insert_aged_entry(&cache, "fresh", "frais", 1, 2).await;

    let removed = cache.cleanup(30).await.unwrap();

    assert_eq!(removed, 1);
    assert!(use_count(&cache, "one-off", "en", "fr").await.is_none());
    assert_eq!(use_count(&cache, "regular", "en", "fr").await, Some(3));
    assert_eq!(use_count(&cache, "fresh", "en", "fr").await, Some(1));
}

#[tokio::test]
async fn test_cache_cleanup_shouldEvictRowsOlderThanMaxDays() {
    let cache = TranslationCache::in_memory().unwrap();
    insert_aged_entry(&cache, "popular", "populaire", 50, 20).await;

    assert_eq!(cache.cleanup(30).await.unwrap(), 0);
    assert_eq!(cache.cleanup(14).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cache_stats_shouldAggregateRows() {
    let cache = TranslationCache::in_memory().unwrap();
    cache.store("a", "A", "en", "fr", 0.95, None).await.unwrap();
    cache.store("b", "B", "en", "fr", 0.5, None).await.unwrap();
    cache.get_cached("a", "en", "fr").await.unwrap();
    insert_aged_entry(&cache, "c", "C", 1, 10).await;

    let stats = cache.stats().await.unwrap();

    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.total_uses, 4);
    assert_eq!(stats.active_entries, 2);
    assert_eq!(stats.high_quality_entries, 1);
    assert!((stats.hit_rate - 4.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_cache_stats_withEmptyCache_shouldBeZero() {
    let stats = TranslationCache::in_memory().unwrap().stats().await.unwrap();

    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.avg_quality, 0.0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[tokio::test]
async fn test_cache_history_shouldListMostRecentFirst() {
    let cache = TranslationCache::in_memory().unwrap();
    insert_aged_entry(&cache, "older", "plus vieux", 1, 3).await;
    cache.store("newer", "plus récent", "en", "fr", 0.9, None).await.unwrap();

    let history = cache.history(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].original_text, "newer");

    assert_eq!(cache.history(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cache_clear_shouldRemoveEverything() {
    let cache = TranslationCache::in_memory().unwrap();
    cache.store("a", "A", "en", "fr", 0.9, None).await.unwrap();
    cache.store("b", "B", "en", "fr", 0.9, None).await.unwrap();

    assert_eq!(cache.clear().await.unwrap(), 2);
    assert_eq!(cache.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_cache_onDisk_shouldPersistAcrossConnections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
        let repository =
            Repository::new(transgate::database::DatabaseConnection::new(&path).unwrap());
        let cache = TranslationCache::with_defaults(repository);
        let metadata = CacheMetadata {
            source: Some("model".to_string()),
            ..CacheMetadata::default()
        };
        cache
            .store("persist me", "garde-moi", "en", "fr", 0.9, Some(metadata))
            .await
            .unwrap();
    }

    let repository = Repository::new(transgate::database::DatabaseConnection::new(&path).unwrap());
    let cache = TranslationCache::with_defaults(repository);
    let entry = cache.get_cached("persist me", "en", "fr").await.unwrap().unwrap();

    assert_eq!(entry.translated_text, "garde-moi");
    assert_eq!(
        entry.metadata.and_then(|m| m.source).as_deref(),
        Some("model")
    );
}
