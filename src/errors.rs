/*!
 * Error types for the transgate library.
 *
 * This module contains custom error types for the different layers of the
 * translation gateway, using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling a translation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or exhausted quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend did not answer within the allotted time
    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    /// The backend cannot translate between the requested languages
    #[error("Unsupported language pair: {source_language} -> {target_language}")]
    UnsupportedLanguage {
        /// Requested source language
        source_language: String,
        /// Requested target language
        target_language: String,
    },

    /// The backend answered successfully but without any text
    #[error("Backend returned an empty translation")]
    EmptyResponse,
}

impl ProviderError {
    /// Map a non-success HTTP status to the closest error variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::ConnectionError(format!("request timed out: {}", error))
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur inside the translation pipeline
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from a backend
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the persistent cache
    #[error("Cache error: {0}")]
    Cache(String),

    /// Error while loading or compiling a pattern table
    #[error("Pattern table error: {0}")]
    Pattern(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
