/*!
 * Translation routing, analysis and caching.
 *
 * This module contains everything between a caller's text and the
 * backends. It is split into several submodules:
 *
 * - `manager`: Routing state machine over the cache and both backend tiers
 * - `cache`: SQLite-backed translation cache
 * - `maintenance`: Periodic cache eviction task
 * - `patterns`: Versioned pattern tables driving the analyzers
 * - `intensity`: Emotional intensity scoring
 * - `register`: Register (subculture) detection and adaptation
 * - `slang`: Slang and styling substitution for CJK output
 * - `quality`: Quality estimation for backend output
 * - `usage`: Token and cost accounting
 */

// Re-export main types for easier usage
pub use self::cache::TranslationCache;
pub use self::intensity::{ContextType, IntensityAnalysis, PatternAnalyzer, ScriptFamily};
pub use self::maintenance::CleanupTask;
pub use self::manager::{ManagerSettings, TranslationManager, TranslationOutcome, TranslationSource};
pub use self::patterns::PatternTable;
pub use self::quality::{QualityContext, QualityEstimator, TierQualityEstimator};
pub use self::register::{ContextClassifier, SubcultureAnalysis};
pub use self::slang::SlangAdapter;
pub use self::usage::{UsageAccumulator, UsageStatistics};

// Submodules
pub mod cache;
pub mod intensity;
pub mod maintenance;
pub mod manager;
pub mod patterns;
pub mod quality;
pub mod register;
pub mod slang;
pub mod usage;
