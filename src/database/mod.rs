/*!
 * Database module for persistent storage of translations.
 *
 * This module provides SQLite-based persistence for the translation cache:
 * one row per cache key holding the translated text, its quality score,
 * usage counters and optional typed metadata.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{CacheMetadata, CacheRecord, CacheStats, HistoryRecord};
pub use repository::Repository;
