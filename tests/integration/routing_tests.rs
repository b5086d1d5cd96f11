/*!
 * Integration tests for translation routing.
 *
 * Each test drives a manager over an in-memory cache with scripted mock
 * backends and checks which tier produced the result and how often each
 * backend was called.
 */

use std::sync::Arc;
use std::time::Duration;

use transgate::providers::mock::MockBackend;
use transgate::translation::{
    ContextType, ManagerSettings, QualityContext, QualityEstimator, TranslationSource,
};

use crate::common::{harness, harness_with, settings_with_timeout, use_count};

const LONG_TEXT: &str = "I really need you right now";

#[tokio::test]
async fn test_translate_longText_shouldGoStraightToModel() {
    let h = harness(MockBackend::working(), MockBackend::working());

    let outcome = h
        .manager
        .translate(LONG_TEXT, "en", "zh", ContextType::Group)
        .await;

    assert_eq!(outcome.source, TranslationSource::Model);
    assert_eq!(outcome.translation, format!("[model:zh] {}", LONG_TEXT));
    assert!((outcome.quality_score - 0.9).abs() < 1e-9);
    assert!(outcome.error.is_none());

    let intensity = outcome.intensity.expect("intensity analysis");
    assert!((intensity.final_intensity - 1.04).abs() < 1e-9);
    assert!(outcome.register.expect("register analysis").is_empty());

    assert_eq!(h.fast.call_count(), 0);
    assert_eq!(h.model.call_count(), 1);
    assert_eq!(
        h.model.last_instruction().as_deref(),
        Some(
            "Translate naturally while preserving any subtle hints. \
             Translate naturally while preserving any implications."
        )
    );
}

#[tokio::test]
async fn test_translate_repeatedText_shouldServeFromCacheWithoutBackends() {
    let h = harness(MockBackend::working(), MockBackend::working());

    let first = h
        .manager
        .translate(LONG_TEXT, "en", "zh", ContextType::Group)
        .await;
    let second = h
        .manager
        .translate(LONG_TEXT, "en", "zh", ContextType::Group)
        .await;

    assert_eq!(second.source, TranslationSource::Cache);
    assert_eq!(second.translation, first.translation);
    assert!((second.quality_score - 0.9).abs() < 1e-9);
    assert!(second.intensity.is_none());
    assert_eq!(h.model.call_count(), 1);
    assert_eq!(h.fast.call_count(), 0);
    assert_eq!(
        use_count(h.manager.cache(), LONG_TEXT, "en", "zh").await,
        Some(2)
    );
}

#[tokio::test]
async fn test_translate_shortPlainText_shouldEscalateExactlyOnce() {
    let h = harness(MockBackend::working(), MockBackend::working());

    let outcome = h.manager.translate("hello", "en", "fr", ContextType::Group).await;

    assert_eq!(outcome.source, TranslationSource::Model);
    assert!((outcome.quality_score - 0.9).abs() < 1e-9);
    assert_eq!(h.fast.call_count(), 1);
    assert_eq!(h.model.call_count(), 1);
}

#[tokio::test]
async fn test_translate_withLowMinimum_shouldKeepFastResult() {
    let settings = ManagerSettings {
        min_quality: 0.5,
        ..ManagerSettings::default()
    };
    let h = harness_with(MockBackend::working(), MockBackend::working(), settings);

    let outcome = h.manager.translate("hello", "en", "fr", ContextType::Group).await;

    assert_eq!(outcome.source, TranslationSource::Fast);
    assert_eq!(outcome.translation, "[fast:fr] hello");
    assert!((outcome.quality_score - 0.4).abs() < 1e-9);
    assert_eq!(h.model.call_count(), 0);
}

#[tokio::test]
async fn test_translate_whenEscalationFails_shouldKeepFastResult() {
    let h = harness(MockBackend::working(), MockBackend::failing());

    let outcome = h.manager.translate("hello", "en", "fr", ContextType::Group).await;

    assert_eq!(outcome.source, TranslationSource::Fast);
    assert_eq!(outcome.translation, "[fast:fr] hello");
    assert!((outcome.quality_score - 0.8).abs() < 1e-9);
    assert_eq!(h.fast.call_count(), 1);
    assert_eq!(h.model.call_count(), 1);
}

#[tokio::test]
async fn test_translate_whenModelFails_shouldFallBackToFast() {
    let h = harness(MockBackend::working(), MockBackend::failing());

    let outcome = h
        .manager
        .translate(LONG_TEXT, "en", "fr", ContextType::Group)
        .await;

    assert_eq!(outcome.source, TranslationSource::FastFallback);
    assert!((outcome.quality_score - 0.8).abs() < 1e-9);
    // A fallback result is never escalated again
    assert_eq!(h.model.call_count(), 1);
    assert_eq!(h.fast.call_count(), 1);
}

#[tokio::test]
async fn test_translate_whenModelTimesOut_shouldFallBackToFast() {
    let h = harness_with(
        MockBackend::working(),
        MockBackend::slow(2_000),
        settings_with_timeout(Duration::from_millis(50)),
    );

    let started = std::time::Instant::now();
    let outcome = h
        .manager
        .translate(LONG_TEXT, "en", "fr", ContextType::Group)
        .await;

    assert_eq!(outcome.source, TranslationSource::FastFallback);
    assert!(started.elapsed() < Duration::from_millis(1_500));
}

#[tokio::test]
async fn test_translate_whenEveryCallTimesOut_shouldReportSubSecondTimeout() {
    let h = harness_with(
        MockBackend::slow(2_000),
        MockBackend::slow(2_000),
        settings_with_timeout(Duration::from_millis(50)),
    );

    let outcome = h
        .manager
        .translate(LONG_TEXT, "en", "fr", ContextType::Group)
        .await;

    assert_eq!(outcome.source, TranslationSource::Failed);
    let detail = outcome.error.expect("error detail");
    assert!(detail.contains("50ms"), "{}", detail);
    assert!(!detail.contains("after 0s"));
}

#[tokio::test]
async fn test_translate_whenEverythingFails_shouldEchoInput() {
    let h = harness(MockBackend::failing(), MockBackend::failing());

    let outcome = h.manager.translate("hello", "en", "fr", ContextType::Group).await;

    assert_eq!(outcome.source, TranslationSource::Failed);
    assert_eq!(outcome.translation, "hello");
    assert_eq!(outcome.quality_score, 0.0);
    assert!(outcome.error.is_some());
    assert!(!outcome.is_translated());
    // Primary fast call plus the emergency call
    assert_eq!(h.fast.call_count(), 2);
    assert!(use_count(h.manager.cache(), "hello", "en", "fr").await.is_none());
}

#[tokio::test]
async fn test_translate_whenPrimaryFastFails_shouldUseEmergencyFastWithoutCaching() {
    // Calls 0 and 2 succeed, call 1 fails
    let h = harness(MockBackend::intermittent(2), MockBackend::failing());

    let warm_up = h.manager.translate("warm", "en", "fr", ContextType::Group).await;
    assert_eq!(warm_up.source, TranslationSource::Fast);

    let outcome = h.manager.translate("again", "en", "fr", ContextType::Group).await;

    assert_eq!(outcome.source, TranslationSource::EmergencyFast);
    assert_eq!(outcome.translation, "[fast:fr] again");
    assert!((outcome.quality_score - 0.7).abs() < 1e-9);
    assert!(outcome.intensity.is_none());
    assert!(outcome.register.is_none());
    assert!(use_count(h.manager.cache(), "again", "en", "fr").await.is_none());
}

#[tokio::test]
async fn test_translate_withLoadedRegister_shouldUseModelWithGuidance() {
    let h = harness(MockBackend::working(), MockBackend::working());

    let outcome = h.manager.translate("懂的都懂", "zh", "en", ContextType::Group).await;

    assert_eq!(outcome.source, TranslationSource::Model);
    assert_eq!(h.fast.call_count(), 0);
    let register = outcome.register.expect("register analysis");
    assert_eq!(register.primary_category.as_deref(), Some("intimate"));
    assert!(
        h.model
            .last_instruction()
            .unwrap()
            .contains("maintain strong contextual implications")
    );
}

#[tokio::test]
async fn test_translate_withAdaptOutput_shouldRewriteRegisterTerms() {
    let settings = ManagerSettings {
        adapt_output: true,
        ..ManagerSettings::default()
    };
    let model = MockBackend::working().with_custom_response(|request| request.text.clone());
    let h = harness_with(MockBackend::working(), model, settings);

    let outcome = h.manager.translate("懂的都懂", "zh", "en", ContextType::Group).await;

    assert_eq!(outcome.translation, "if yk yk");
}

#[tokio::test]
async fn test_translate_withHighIntensityChinese_shouldSkipFastTier() {
    let h = harness(MockBackend::working(), MockBackend::working());

    // 3.24 in private context, above the model threshold
    let outcome = h
        .manager
        .translate("宝贝我好想你", "zh", "en", ContextType::Private)
        .await;

    assert_eq!(outcome.source, TranslationSource::Model);
    assert_eq!(h.fast.call_count(), 0);
    assert!(
        h.model
            .last_instruction()
            .unwrap()
            .starts_with("Preserve moderate suggestive elements and emotional nuances")
    );
}

#[tokio::test]
async fn test_translateMany_shouldPreserveOrder() {
    let h = harness(MockBackend::working(), MockBackend::working());
    let texts = vec!["one".to_string(), "two".to_string(), LONG_TEXT.to_string()];

    let outcomes = h
        .manager
        .translate_many(&texts, "en", "fr", ContextType::Group)
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].translation, "[model:fr] one");
    assert_eq!(outcomes[1].translation, "[model:fr] two");
    assert_eq!(outcomes[2].translation, format!("[model:fr] {}", LONG_TEXT));
}

#[tokio::test]
async fn test_usageStatistics_shouldCountTokensCostAndHits() {
    let model = MockBackend::working().with_usage(100, 50);
    let h = harness(MockBackend::working(), model);

    h.manager.translate(LONG_TEXT, "en", "fr", ContextType::Group).await;
    h.manager.translate(LONG_TEXT, "en", "fr", ContextType::Group).await;

    let stats = h.manager.get_usage_statistics().await.unwrap();

    assert_eq!(stats.total_tokens, 150);
    assert!((stats.total_cost - 0.0015).abs() < 1e-9);
    // One cached row used twice
    assert_eq!(stats.translations_count, 1);
    assert!((stats.cache_hit_rate - 2.0).abs() < 1e-9);
    assert_eq!(stats.cache.total_uses, 2);
    assert_eq!(stats.session_translations, 2);
    assert_eq!(stats.session_cache_hits, 1);
    assert!((stats.session_hit_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_usageStatistics_shouldIgnoreTokensOfFailedCalls() {
    let h = harness(MockBackend::working(), MockBackend::failing().with_usage(100, 50));

    h.manager.translate(LONG_TEXT, "en", "fr", ContextType::Group).await;

    let stats = h.manager.get_usage_statistics().await.unwrap();
    assert_eq!(stats.total_tokens, 0);
    assert_eq!(stats.total_cost, 0.0);
}

#[derive(Debug)]
struct UndefinedScore;

impl QualityEstimator for UndefinedScore {
    fn estimate(&self, _context: &QualityContext<'_>) -> f64 {
        f64::NAN
    }
}

#[tokio::test]
async fn test_translate_withNonFiniteEstimate_shouldScoreZeroAndStillCache() {
    let h = harness(MockBackend::working(), MockBackend::working());
    let manager = h.manager.with_quality_estimator(Arc::new(UndefinedScore));

    let outcome = manager
        .translate(LONG_TEXT, "en", "fr", ContextType::Group)
        .await;

    assert_eq!(outcome.source, TranslationSource::Model);
    assert_eq!(outcome.quality_score, 0.0);
    assert!(outcome.error.is_none());
    assert_eq!(use_count(manager.cache(), LONG_TEXT, "en", "fr").await, Some(1));
}
