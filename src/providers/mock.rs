/*!
 * Mock backend implementations for testing.
 *
 * This module provides a mock backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with translated text
 * - `MockBackend::intermittent(n)` - Fails every nth request
 * - `MockBackend::failing()` - Always fails with an error
 * - `MockBackend::slow(ms)` - Succeeds after a delay
 *
 * Clones share the request counter and the captured requests so a test can
 * keep a handle after moving the backend into a manager.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BackendRequest, BackendResponse, TokenUsage, TranslationBackend};
use crate::errors::ProviderError;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock backend for testing routing behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Name reported to logs
    name: String,
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<BackendRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&BackendRequest) -> String>,
    /// Token usage reported with every successful response
    usage: Option<TokenUsage>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
            usage: None,
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock backend
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock backend that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set the name reported by `TranslationBackend::name`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&BackendRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Report this token usage with every successful response
    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(TokenUsage::new(prompt_tokens, completion_tokens));
        self
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().clone()
    }

    /// Instruction carried by the most recent request
    pub fn last_instruction(&self) -> Option<String> {
        self.requests
            .lock()
            .last()
            .and_then(|request| request.instruction.clone())
    }

    fn success(&self, request: &BackendRequest) -> BackendResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{}:{}] {}", self.name, request.target_language, request.text),
        };

        BackendResponse {
            text,
            usage: self.usage,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.success(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Err(ProviderError::EmptyResponse),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.success(&request))
            }
        }
    }
}
