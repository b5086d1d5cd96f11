/*!
 * Translation backends.
 *
 * This module contains the capability every backend implements and the
 * concrete clients:
 * - Google: fast machine translation over the public web endpoint
 * - OpenAI: chat-completions model backend
 * - Anthropic: messages-API model backend
 * - Mock: scriptable backend for tests
 */

use async_trait::async_trait;
use log::error;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils::display_language;

pub mod anthropic;
pub mod google;
pub mod mock;
pub mod openai;

/// Minimum completion budget handed to model backends
const MIN_COMPLETION_TOKENS: u32 = 64;

/// Completion tokens granted per input word
const COMPLETION_TOKENS_PER_WORD: u32 = 20;

/// A single translation request
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Text to translate
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Style guidance for model backends; fast backends ignore it
    pub instruction: Option<String>,
}

impl BackendRequest {
    /// Create a request without style guidance
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            instruction: None,
        }
    }

    /// Attach style guidance
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Completion token budget scaled to the input length
    pub fn completion_budget(&self) -> u32 {
        let words = self.text.split_whitespace().count() as u32;
        words
            .saturating_mul(COMPLETION_TOKENS_PER_WORD)
            .max(MIN_COMPLETION_TOKENS)
    }
}

/// Token usage reported by a model backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Create a new usage record
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Prompt plus completion tokens
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A backend's answer
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    /// Translated text
    pub text: String,
    /// Token usage, when the backend reports it
    pub usage: Option<TokenUsage>,
}

impl BackendResponse {
    /// A response without usage information
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Common capability of every translation backend
///
/// The fast tier and the model tier share this signature; the manager
/// decides which one to call and whether to pass an instruction.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Translate a single text
    async fn translate(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError>;
}

/// Generation settings shared by the model backends
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// System prompt template
    pub system_prompt: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Fill the model system prompt template
///
/// Supported placeholders: `{source_language}`, `{target_language}`, `{instruction}`.
pub fn render_system_prompt(template: &str, request: &BackendRequest) -> String {
    template
        .replace("{source_language}", &display_language(&request.source_language))
        .replace("{target_language}", &display_language(&request.target_language))
        .replace("{instruction}", request.instruction.as_deref().unwrap_or_default())
        .trim()
        .to_string()
}

/// HTTP client bounded by the backend's own request timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// `{endpoint}{path}`, or the public API when no endpoint is configured
pub(crate) fn api_url(endpoint: &str, public_base: &str, path: &str) -> String {
    let base = if endpoint.trim().is_empty() {
        public_base
    } else {
        endpoint.trim_end_matches('/')
    };
    format!("{}{}", base, path)
}

/// Send a JSON API call and decode the reply
///
/// Non-success statuses are mapped through [`ProviderError::from_status`].
pub(crate) async fn send_json<R: DeserializeOwned>(
    backend: &str,
    request: reqwest::RequestBuilder,
) -> Result<R, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("{} answered {}: {}", backend, status, body);
        return Err(ProviderError::from_status(status.as_u16(), body));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| ProviderError::ParseError(format!("{} reply: {}", backend, e)))
}

/// Reject blank backend output
pub(crate) fn non_empty(text: String) -> Result<String, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}
