/*!
 * Model backend over the Anthropic messages API.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    BackendRequest, BackendResponse, ModelOptions, TokenUsage, TranslationBackend, api_url,
    http_client, non_empty, render_system_prompt, send_json,
};
use crate::errors::ProviderError;

const PUBLIC_API: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic messages client
#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    /// Base URL; empty means the public API
    endpoint: String,
    options: ModelOptions,
}

/// Body of a messages call
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// Reply of a messages call
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub usage: MessagesUsage,
}

/// One block of reply content; only `text` blocks carry a translation
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl MessagesResponse {
    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect()
    }
}

impl Anthropic {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, options: ModelOptions) -> Self {
        Self {
            client: http_client(options.timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            options,
        }
    }

    /// Messages body for one translation; the instruction rides in the system prompt
    pub fn build_request(&self, request: &BackendRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.options.model.clone(),
            system: render_system_prompt(&self.options.system_prompt, request),
            messages: vec![Message {
                role: "user",
                content: request.text.clone(),
            }],
            temperature: self.options.temperature,
            max_tokens: request.completion_budget(),
        }
    }
}

#[async_trait]
impl TranslationBackend for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn translate(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::AuthenticationError(
                "no Anthropic API key configured".to_string(),
            ));
        }

        debug!(
            "anthropic: {} -> {} with {}",
            request.source_language, request.target_language, self.options.model
        );

        let call = self
            .client
            .post(api_url(&self.endpoint, PUBLIC_API, MESSAGES_PATH))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.build_request(&request));
        let reply: MessagesResponse = send_json("anthropic", call).await?;

        Ok(BackendResponse {
            text: non_empty(reply.text())?,
            usage: Some(TokenUsage::new(
                reply.usage.input_tokens,
                reply.usage.output_tokens,
            )),
        })
    }
}
