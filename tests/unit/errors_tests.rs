/*!
 * Tests for error types and conversions
 */

use std::time::Duration;

use transgate::errors::{AppError, ProviderError, TranslationError};

#[test]
fn test_providerError_requestFailed_shouldDisplayCorrectly() {
    let error = ProviderError::RequestFailed("Connection reset".to_string());
    let display = format!("{}", error);
    assert!(display.contains("API request failed"));
    assert!(display.contains("Connection reset"));
}

#[test]
fn test_providerError_timeout_shouldMentionDuration() {
    let display = ProviderError::Timeout(Duration::from_secs(10)).to_string();
    assert!(display.contains("10s"));

    let display = ProviderError::Timeout(Duration::from_millis(50)).to_string();
    assert!(display.contains("50ms"));
}

#[test]
fn test_providerError_unsupportedLanguage_shouldNamePair() {
    let error = ProviderError::UnsupportedLanguage {
        source_language: "xx".to_string(),
        target_language: "fr".to_string(),
    };
    assert_eq!(error.to_string(), "Unsupported language pair: xx -> fr");
}

#[test]
fn test_providerError_fromStatus_shouldClassify() {
    assert!(matches!(
        ProviderError::from_status(401, "bad key"),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(429, "slow down"),
        ProviderError::RateLimitExceeded(_)
    ));
    assert!(matches!(
        ProviderError::from_status(502, "bad gateway"),
        ProviderError::ApiError { status_code: 502, .. }
    ));
}

#[test]
fn test_translationError_fromProvider_shouldKeepMessage() {
    let error: TranslationError = ProviderError::EmptyResponse.into();
    assert!(error.to_string().contains("empty translation"));
}

#[test]
fn test_appError_fromTranslationError_shouldWrap() {
    let error: AppError = TranslationError::Cache("disk full".to_string()).into();
    assert!(matches!(error, AppError::Translation(_)));
    assert!(error.to_string().contains("disk full"));
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "conf.json missing");
    let error: AppError = io.into();
    assert!(matches!(error, AppError::File(_)));
}
