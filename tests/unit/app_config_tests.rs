/*!
 * Tests for application configuration functionality
 */

use std::str::FromStr;

use transgate::app_config::{Config, LogLevel, ModelProvider};
use transgate::translation::{ContextType, TranslationManager};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "zh");
    assert_eq!(config.context_type, ContextType::Group);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.translation.backend_timeout_secs, 10);
    assert_eq!(config.translation.single_use_grace_days, 7);
    assert_eq!(config.translation.cleanup_interval_hours, 24);
    assert!(!config.translation.adapt_output);
    assert_eq!(config.model_backend.provider, ModelProvider::OpenAI);
    assert!(config.database_path.is_none());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    config.translation.min_quality = 1.5;
    assert!(config.validate().is_err());
    config.translation.min_quality = 0.9;

    config.translation.cache_days = 0;
    assert!(config.validate().is_err());
    config.translation.cache_days = 91;
    assert!(config.validate().is_err());
    config.translation.cache_days = 90;
    assert!(config.validate().is_ok());

    config.translation.backend_timeout_secs = 0;
    assert!(config.validate().is_err());
    config.translation.backend_timeout_secs = 10;

    config.model_backend.temperature = 2.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_saveThenLoad_shouldRoundTrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "fr".to_string();
    config.context_type = ContextType::Private;
    config.translation.adapt_output = true;
    config.model_backend.provider = ModelProvider::Anthropic;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_load_withMalformedFile_shouldFail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_modelProvider_fromStr_shouldIgnoreCase() {
    assert_eq!(ModelProvider::from_str("OpenAI").unwrap(), ModelProvider::OpenAI);
    assert_eq!(ModelProvider::from_str("anthropic").unwrap(), ModelProvider::Anthropic);
    assert!(ModelProvider::from_str("ollama").is_err());
    assert_eq!(ModelProvider::Anthropic.api_key_env_var(), "ANTHROPIC_API_KEY");
}

#[test]
fn test_logLevel_intoLevelFilter_shouldMap() {
    assert_eq!(log::LevelFilter::from(LogLevel::Debug), log::LevelFilter::Debug);
    assert_eq!(log::LevelFilter::from(LogLevel::Error), log::LevelFilter::Error);
}

#[test]
fn test_translationManager_fromConfig_shouldOpenConfiguredDatabase() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cache.db");

    let mut config = Config::default();
    config.database_path = Some(db_path.clone());
    config.model_backend.api_key = "test-key".to_string();
    config.translation.min_quality = 0.75;

    let manager = TranslationManager::from_config(&config).unwrap();

    assert!(db_path.exists());
    assert_eq!(manager.settings().min_quality, 0.75);
    assert_eq!(manager.cache().retention_days(), 30);
}

#[test]
fn test_translationManager_fromConfig_withMissingPatternFile_shouldFail() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.database_path = Some(dir.path().join("cache.db"));
    config.translation.pattern_table_path = Some(dir.path().join("missing.json"));

    assert!(TranslationManager::from_config(&config).is_err());
}
