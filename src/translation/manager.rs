/*!
 * Quality-gated translation routing.
 *
 * Per request the manager:
 * 1. serves a live cache row whose quality meets the minimum,
 * 2. otherwise analyzes the text and routes it to the model backend
 *    (loaded or long text) or to the fast backend,
 * 3. escalates a fast result below the minimum to the model backend once,
 * 4. stores the result and returns it with both analyses.
 *
 * Any failure inside that flow ends in one emergency fast-backend call; if
 * that fails too the input is echoed back with source `failed`.
 */

use anyhow::Context;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::cache::{TranslationCache, preview};
use super::intensity::{ContextType, IntensityAnalysis, PatternAnalyzer, ScriptFamily};
use super::patterns::PatternTable;
use super::quality::{QualityContext, QualityEstimator, TierQualityEstimator};
use super::register::{ContextClassifier, SubcultureAnalysis};
use super::slang::SlangAdapter;
use super::usage::{UsageAccumulator, UsageStatistics};
use crate::app_config::{Config, ModelProvider};
use crate::database::models::{METADATA_SCHEMA_VERSION, normalize_quality};
use crate::database::{CacheMetadata, DatabaseConnection, HistoryRecord, Repository};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::anthropic::Anthropic;
use crate::providers::google::GoogleTranslate;
use crate::providers::openai::OpenAI;
use crate::providers::{BackendRequest, BackendResponse, ModelOptions, TranslationBackend};

/// Intensity above which the model backend is used
const MODEL_INTENSITY_THRESHOLD: f64 = 3.0;

/// Register intensity above which the model backend is used
const MODEL_REGISTER_THRESHOLD: f64 = 0.5;

/// Word count above which the model backend is used
const MODEL_WORD_THRESHOLD: usize = 5;

/// Path that produced a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationSource {
    /// Served from the cache
    Cache,
    /// Model backend, directly or by escalation
    Model,
    /// Fast backend after the model backend failed
    FastFallback,
    /// Fast backend as the primary choice
    Fast,
    /// Last-chance fast call after the normal flow failed
    EmergencyFast,
    /// Nothing worked; the input is echoed
    Failed,
}

impl TranslationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Model => "model",
            Self::FastFallback => "fast-fallback",
            Self::Fast => "fast",
            Self::EmergencyFast => "emergency-fast",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TranslationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `TranslationManager::translate`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOutcome {
    /// Translated text, or the input when `source` is `Failed`
    pub translation: String,
    /// Path that produced the translation
    pub source: TranslationSource,
    /// Quality score in `0.0..=1.0`
    pub quality_score: f64,
    /// Intensity analysis, when the request reached the analysis step
    pub intensity: Option<IntensityAnalysis>,
    /// Register analysis, when the request reached the analysis step
    pub register: Option<SubcultureAnalysis>,
    /// Failure detail
    pub error: Option<String>,
}

impl TranslationOutcome {
    fn failed(text: &str, detail: String) -> Self {
        Self {
            translation: text.to_string(),
            source: TranslationSource::Failed,
            quality_score: 0.0,
            intensity: None,
            register: None,
            error: Some(detail),
        }
    }

    /// Whether the caller got an actual translation
    pub fn is_translated(&self) -> bool {
        self.source != TranslationSource::Failed
    }
}

/// Tunables of the routing policy
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    /// Minimum acceptable quality
    pub min_quality: f64,
    /// Upper bound on one backend call
    pub backend_timeout: Duration,
    /// Rewrite register terms and slang in backend output
    pub adapt_output: bool,
    /// Estimated price of 1000 model tokens
    pub cost_per_1k_tokens: f64,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            min_quality: 0.9,
            backend_timeout: Duration::from_secs(10),
            adapt_output: false,
            cost_per_1k_tokens: 0.01,
        }
    }
}

/// A single call to translate
#[derive(Debug, Clone, Copy)]
struct Job<'a> {
    text: &'a str,
    source_language: &'a str,
    target_language: &'a str,
    context: ContextType,
}

impl Job<'_> {
    fn backend_request(&self) -> BackendRequest {
        BackendRequest::new(self.text, self.source_language, self.target_language)
    }
}

/// Two-tier translation router over a persistent cache
pub struct TranslationManager {
    cache: TranslationCache,
    fast: Arc<dyn TranslationBackend>,
    model: Arc<dyn TranslationBackend>,
    analyzer: PatternAnalyzer,
    classifier: ContextClassifier,
    slang: SlangAdapter,
    estimator: Arc<dyn QualityEstimator>,
    usage: UsageAccumulator,
    settings: ManagerSettings,
}

impl TranslationManager {
    /// Create a manager from its collaborators
    pub fn new(
        cache: TranslationCache,
        fast: Arc<dyn TranslationBackend>,
        model: Arc<dyn TranslationBackend>,
        table: &PatternTable,
        settings: ManagerSettings,
    ) -> Result<Self, TranslationError> {
        Ok(Self {
            cache,
            fast,
            model,
            analyzer: PatternAnalyzer::new(table)?,
            classifier: ContextClassifier::new(table)?,
            slang: SlangAdapter::new(table)?,
            estimator: Arc::new(TierQualityEstimator::default()),
            usage: UsageAccumulator::new(settings.cost_per_1k_tokens),
            settings,
        })
    }

    /// Build the manager described by a configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let repository = match &config.database_path {
            Some(path) => Repository::new(DatabaseConnection::new(path)?),
            None => Repository::new_default()?,
        };
        let cache = TranslationCache::new(
            repository,
            config.translation.cache_days,
            config.translation.single_use_grace_days,
        );

        let fast: Arc<dyn TranslationBackend> = Arc::new(GoogleTranslate::new(
            &config.fast_backend.endpoint,
            config.fast_backend.timeout_secs,
        ));

        let backend = &config.model_backend;
        let options = ModelOptions {
            model: backend.model.clone(),
            temperature: backend.temperature,
            system_prompt: backend.system_prompt.clone(),
            timeout_secs: backend.timeout_secs,
        };
        let model: Arc<dyn TranslationBackend> = match backend.provider {
            ModelProvider::OpenAI => Arc::new(OpenAI::new(
                backend.resolved_api_key(),
                &backend.endpoint,
                options,
            )),
            ModelProvider::Anthropic => Arc::new(Anthropic::new(
                backend.resolved_api_key(),
                &backend.endpoint,
                options,
            )),
        };

        let table = PatternTable::load_or_builtin(config.translation.pattern_table_path.as_deref())
            .context("Failed to load pattern table")?;

        let settings = ManagerSettings {
            min_quality: config.translation.min_quality,
            backend_timeout: Duration::from_secs(config.translation.backend_timeout_secs),
            adapt_output: config.translation.adapt_output,
            cost_per_1k_tokens: config.translation.cost_per_1k_tokens,
        };

        info!(
            "Translation manager ready: fast={}, model={} ({}), min quality {:.2}",
            fast.name(),
            model.name(),
            backend.model,
            settings.min_quality
        );

        Ok(Self::new(cache, fast, model, &table, settings)?)
    }

    /// Replace the quality estimator
    pub fn with_quality_estimator(mut self, estimator: Arc<dyn QualityEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn analyzer(&self) -> &PatternAnalyzer {
        &self.analyzer
    }

    pub fn classifier(&self) -> &ContextClassifier {
        &self.classifier
    }

    /// Translate a text; never fails
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context: ContextType,
    ) -> TranslationOutcome {
        let job = Job {
            text,
            source_language,
            target_language,
            context,
        };

        let outcome = match self.route(job).await {
            Ok(outcome) => outcome,
            Err(cause) => {
                warn!("Translation of '{}' failed ({}), trying emergency path", preview(text), cause);
                self.emergency(job, cause).await
            }
        };

        self.usage
            .record_translation(outcome.source == TranslationSource::Cache);
        debug!(
            "Translated '{}' via {} (quality {:.2})",
            preview(text),
            outcome.source,
            outcome.quality_score
        );
        outcome
    }

    /// Translate several texts concurrently, preserving order
    pub async fn translate_many(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        context: ContextType,
    ) -> Vec<TranslationOutcome> {
        join_all(
            texts
                .iter()
                .map(|text| self.translate(text, source_language, target_language, context)),
        )
        .await
    }

    /// Token, cost and cache report
    pub async fn get_usage_statistics(&self) -> Result<UsageStatistics, TranslationError> {
        let cache = self.cache.stats().await?;
        Ok(self.usage.statistics(cache))
    }

    /// Evict stale and single-use cache rows
    pub async fn cleanup(&self, max_days: u32) -> Result<usize, TranslationError> {
        self.cache.cleanup(max_days).await
    }

    /// Recent cache rows, most recently used first
    pub async fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, TranslationError> {
        self.cache.history(limit).await
    }

    /// Combined instruction from both analyzers
    pub fn build_instruction(
        &self,
        intensity: &IntensityAnalysis,
        register: &SubcultureAnalysis,
    ) -> String {
        let base = self.analyzer.get_intensity_preservation_prompt(intensity);
        let mut chars = base.chars();
        let base = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{}. {}", base, self.classifier.get_translation_prompt(register))
    }

    /// Whether a request goes to the model backend first
    fn needs_model(text: &str, intensity: &IntensityAnalysis, register: &SubcultureAnalysis) -> bool {
        intensity.final_intensity > MODEL_INTENSITY_THRESHOLD
            || register.intensity > MODEL_REGISTER_THRESHOLD
            || text.split_whitespace().count() > MODEL_WORD_THRESHOLD
    }

    async fn route(&self, job: Job<'_>) -> Result<TranslationOutcome, TranslationError> {
        let min_quality = self.settings.min_quality;

        if let Some(entry) = self
            .cache
            .get_cached(job.text, job.source_language, job.target_language)
            .await?
        {
            if entry.quality_score >= min_quality {
                return Ok(TranslationOutcome {
                    translation: entry.translated_text,
                    source: TranslationSource::Cache,
                    quality_score: entry.quality_score,
                    intensity: None,
                    register: None,
                    error: None,
                });
            }
            debug!(
                "Cached quality {:.2} below {:.2}, retranslating",
                entry.quality_score, min_quality
            );
        }

        let intensity = self.analyzer.analyze_intensity(job.text, job.context);
        let register = self.classifier.analyze_text(job.text);
        let use_model = Self::needs_model(job.text, &intensity, &register);
        debug!(
            "Route for '{}': intensity {:.2}, register {:.2}, model={}",
            preview(job.text),
            intensity.final_intensity,
            register.intensity,
            use_model
        );

        let (mut translation, mut source) = if use_model {
            let instruction = self.build_instruction(&intensity, &register);
            match self.call_model(job.backend_request().with_instruction(instruction)).await {
                Ok(response) => (response.text, TranslationSource::Model),
                Err(e) => {
                    warn!("Model backend failed ({}), falling back to fast backend", e);
                    let response = self.call_backend(self.fast.as_ref(), job.backend_request()).await?;
                    (response.text, TranslationSource::FastFallback)
                }
            }
        } else {
            let response = self.call_backend(self.fast.as_ref(), job.backend_request()).await?;
            (response.text, TranslationSource::Fast)
        };

        let mut quality_score = self.estimate(source, job.text, &translation);

        if quality_score < min_quality && source == TranslationSource::Fast {
            debug!(
                "Fast result quality {:.2} below {:.2}, escalating",
                quality_score, min_quality
            );
            let instruction = self.build_instruction(&intensity, &register);
            match self.call_model(job.backend_request().with_instruction(instruction)).await {
                Ok(response) => {
                    translation = response.text;
                    source = TranslationSource::Model;
                    quality_score = self.estimate(source, job.text, &translation);
                }
                Err(e) => warn!("Escalation to model backend failed ({}), keeping fast result", e),
            }
        }

        if self.settings.adapt_output {
            translation = self.adapt_output(job.text, &translation, &intensity, &register);
        }

        let metadata = CacheMetadata {
            schema_version: METADATA_SCHEMA_VERSION,
            source: Some(source.to_string()),
            intensity: Some(intensity.final_intensity),
            register_intensity: Some(register.intensity),
            registers: register.categories.clone(),
        };

        let error = match self
            .cache
            .store(
                job.text,
                &translation,
                job.source_language,
                job.target_language,
                quality_score,
                Some(metadata),
            )
            .await
        {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to cache translation of '{}': {}", preview(job.text), e);
                Some(e.to_string())
            }
        };

        Ok(TranslationOutcome {
            translation,
            source,
            quality_score,
            intensity: Some(intensity),
            register: Some(register),
            error,
        })
    }

    async fn emergency(&self, job: Job<'_>, cause: TranslationError) -> TranslationOutcome {
        match self.call_backend(self.fast.as_ref(), job.backend_request()).await {
            Ok(response) => {
                let quality_score =
                    self.estimate(TranslationSource::EmergencyFast, job.text, &response.text);
                TranslationOutcome {
                    translation: response.text,
                    source: TranslationSource::EmergencyFast,
                    quality_score,
                    intensity: None,
                    register: None,
                    error: None,
                }
            }
            Err(e) => {
                error!("Emergency translation of '{}' failed: {}", preview(job.text), e);
                TranslationOutcome::failed(job.text, format!("{}; emergency fallback: {}", cause, e))
            }
        }
    }

    fn adapt_output(
        &self,
        original: &str,
        translation: &str,
        intensity: &IntensityAnalysis,
        register: &SubcultureAnalysis,
    ) -> String {
        let adapted = self
            .classifier
            .adapt_translation(original, translation, register);
        if intensity.script == ScriptFamily::Cjk {
            self.slang.adapt(&adapted, intensity.final_intensity)
        } else {
            adapted
        }
    }

    fn estimate(&self, source: TranslationSource, original_text: &str, translation: &str) -> f64 {
        let score = self.estimator.estimate(&QualityContext {
            source,
            original_text,
            translation,
            min_quality: self.settings.min_quality,
        });
        normalize_quality(score)
    }

    /// Call the model backend and account for its tokens
    async fn call_model(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError> {
        let response = self.call_backend(self.model.as_ref(), request).await?;
        if let Some(usage) = response.usage {
            self.usage.record_tokens(usage.total());
        }
        Ok(response)
    }

    /// Call a backend under the configured timeout
    async fn call_backend(
        &self,
        backend: &dyn TranslationBackend,
        request: BackendRequest,
    ) -> Result<BackendResponse, ProviderError> {
        let timeout = self.settings.backend_timeout;
        match tokio::time::timeout(timeout, backend.translate(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Backend {} timed out after {:?}", backend.name(), timeout);
                Err(ProviderError::Timeout(timeout))
            }
        }
    }
}

impl fmt::Debug for TranslationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationManager")
            .field("fast", &self.fast.name())
            .field("model", &self.model.name())
            .field("settings", &self.settings)
            .finish()
    }
}
