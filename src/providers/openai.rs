use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    BackendRequest, BackendResponse, ModelOptions, TokenUsage, TranslationBackend, api_url,
    http_client, non_empty, render_system_prompt, send_json,
};
use crate::errors::ProviderError;

const PUBLIC_API: &str = "https://api.openai.com";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI client for the chat-completions API
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
    /// Model and prompt settings
    options: ModelOptions,
}

/// Chat-completions request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,
    /// The conversation
    messages: Vec<OpenAIMessage>,
    /// Temperature for generation
    temperature: f32,
    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

/// Chat-completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Generated choices
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    pub usage: Option<OpenAIUsage>,
}

/// A single generated choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message
    pub message: OpenAIMessage,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
}

impl OpenAI {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, options: ModelOptions) -> Self {
        Self {
            client: http_client(options.timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            options,
        }
    }

    /// Build the chat request for a translation
    pub fn build_request(&self, request: &BackendRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.options.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: render_system_prompt(&self.options.system_prompt, request),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.text.clone(),
                },
            ],
            temperature: self.options.temperature,
            max_tokens: request.completion_budget(),
        }
    }

    /// Extract the first choice's text
    pub fn extract_text_from_response(response: &OpenAIResponse) -> String {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TranslationBackend for OpenAI {
    fn name(&self) -> &str {
        "openai"
    }

    async fn translate(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::AuthenticationError(
                "No OpenAI API key configured".to_string(),
            ));
        }

        debug!("OpenAI translate with model {}", self.options.model);
        let call = self
            .client
            .post(api_url(&self.endpoint, PUBLIC_API, COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(&request));
        let response: OpenAIResponse = send_json("openai", call).await?;
        let text = non_empty(Self::extract_text_from_response(&response))?;

        Ok(BackendResponse {
            text,
            usage: response
                .usage
                .map(|usage| TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)),
        })
    }
}
