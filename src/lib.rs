/*!
 * # transgate - quality-gated translation routing
 *
 * A Rust library that routes short texts between a cheap machine
 * translation service and an instruction-following language model, keeping
 * every result in a persistent SQLite cache.
 *
 * ## Features
 *
 * - Persistent cache keyed by text and normalized language pair, with use
 *   counts, quality scores and retention-based eviction
 * - Two backend tiers:
 *   - Google Translate web endpoint (fast tier)
 *   - OpenAI or Anthropic chat models (model tier)
 * - Intensity and register analysis driving the routing decision and the
 *   instructions sent to the model
 * - Quality-gated escalation from the fast tier to the model tier
 * - Token and cost accounting
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: Routing and analysis:
 *   - `translation::manager`: The routing state machine
 *   - `translation::cache`: Translation cache over the database
 *   - `translation::intensity`, `translation::register`, `translation::slang`:
 *     Text analyzers driven by `translation::patterns`
 * - `database`: SQLite persistence for the cache
 * - `providers`: Backend clients:
 *   - `providers::google`: Google Translate client
 *   - `providers::openai`: OpenAI API client
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::mock`: Scriptable backend for tests
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError, TranslationError};
pub use language_utils::{cache_language_code, get_language_name, language_codes_match};
pub use translation::{
    ContextType, TranslationManager, TranslationOutcome, TranslationSource, UsageStatistics,
};
