/*!
 * Fast machine-translation backend over Google's public web endpoint.
 *
 * The endpoint answers with nested JSON arrays; the first array holds one
 * `[translated, original, ...]` segment per sentence.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{BackendRequest, BackendResponse, TranslationBackend, non_empty};
use crate::errors::ProviderError;

/// Default public endpoint
pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com";

/// Google web translation client
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    /// HTTP client for API requests
    client: Client,
    /// Base URL of the service
    endpoint: String,
}

impl GoogleTranslate {
    /// Create a new client
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: if endpoint.is_empty() {
                DEFAULT_GOOGLE_ENDPOINT.to_string()
            } else {
                endpoint
            },
        }
    }

    /// Map a language code to the form the endpoint expects
    pub fn service_language_code(code: &str) -> String {
        let lower = code.trim().to_lowercase().replace('_', "-");
        match lower.as_str() {
            "zh" | "zh-cn" | "zh-hans" | "zho" | "chi" => "zh-CN".to_string(),
            "zh-tw" | "zh-hant" => "zh-TW".to_string(),
            "auto" => "auto".to_string(),
            _ => lower,
        }
    }

    /// Build the request URL
    fn request_url(&self, request: &BackendRequest) -> Result<Url, ProviderError> {
        let base = format!("{}/translate_a/single", self.endpoint.trim_end_matches('/'));
        Url::parse_with_params(
            &base,
            &[
                ("client", "gtx"),
                ("sl", &Self::service_language_code(&request.source_language)),
                ("tl", &Self::service_language_code(&request.target_language)),
                ("dt", "t"),
                ("q", &request.text),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint URL: {}", e)))
    }

    /// Concatenate the translated segments of a response body
    pub fn extract_translation(body: &Value) -> Result<String, ProviderError> {
        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("Missing segment array".to_string()))?;

        let text: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(Value::as_str))
            .collect();

        non_empty(text)
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslate {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError> {
        let url = self.request_url(&request)?;
        debug!(
            "Google translate {} -> {} ({} chars)",
            request.source_language,
            request.target_language,
            request.text.chars().count()
        );

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google translate error ({}): {}", status, error_text);
            if status.as_u16() == 400 {
                return Err(ProviderError::UnsupportedLanguage {
                    source_language: request.source_language,
                    target_language: request.target_language,
                });
            }
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(BackendResponse::text(Self::extract_translation(&body)?))
    }
}
