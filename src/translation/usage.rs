/*!
 * Token and cost accounting.
 *
 * Each manager owns a `UsageAccumulator`; counters are plain atomics so
 * concurrent requests never lose an update. Cost is kept in micro-units to
 * stay integral.
 */

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::database::CacheStats;

const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Running counters for one manager instance
#[derive(Debug)]
pub struct UsageAccumulator {
    cost_per_1k_tokens: f64,
    total_tokens: AtomicU64,
    cost_micros: AtomicU64,
    translations: AtomicU64,
    cache_hits: AtomicU64,
}

impl UsageAccumulator {
    pub fn new(cost_per_1k_tokens: f64) -> Self {
        Self {
            cost_per_1k_tokens: cost_per_1k_tokens.max(0.0),
            total_tokens: AtomicU64::new(0),
            cost_micros: AtomicU64::new(0),
            translations: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// Add the tokens of one model call and their estimated cost
    pub fn record_tokens(&self, tokens: u64) {
        let cost = tokens as f64 / 1000.0 * self.cost_per_1k_tokens;
        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);
        self.cost_micros
            .fetch_add((cost * MICROS_PER_UNIT).round() as u64, Ordering::Relaxed);
    }

    /// Count one served translation
    pub fn record_translation(&self, from_cache: bool) {
        self.translations.fetch_add(1, Ordering::Relaxed);
        if from_cache {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }

    pub fn total_cost(&self) -> f64 {
        self.cost_micros.load(Ordering::Relaxed) as f64 / MICROS_PER_UNIT
    }

    /// Combine the counters with a cache aggregate
    ///
    /// The headline `translations_count` and `cache_hit_rate` come from the
    /// persisted cache; the `session_*` fields cover this manager only.
    pub fn statistics(&self, cache: CacheStats) -> UsageStatistics {
        let session_translations = self.translations.load(Ordering::Relaxed);
        let session_cache_hits = self.cache_hits.load(Ordering::Relaxed);

        UsageStatistics {
            total_tokens: self.total_tokens(),
            total_cost: self.total_cost(),
            translations_count: cache.total_entries,
            cache_hit_rate: cache.hit_rate,
            session_translations,
            session_cache_hits,
            session_hit_rate: if session_translations > 0 {
                session_cache_hits as f64 / session_translations as f64
            } else {
                0.0
            },
            cache,
        }
    }
}

/// Read-only usage report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStatistics {
    /// Tokens consumed by model calls
    pub total_tokens: u64,
    /// Estimated cost of those tokens
    pub total_cost: f64,
    /// Translations held in the cache
    pub translations_count: i64,
    /// Cache uses per cached translation
    pub cache_hit_rate: f64,
    /// Requests served by this manager
    pub session_translations: u64,
    /// Requests this manager answered from the cache
    pub session_cache_hits: u64,
    /// `session_cache_hits / session_translations`
    pub session_hit_rate: f64,
    /// Aggregate over the persisted cache
    pub cache: CacheStats,
}

impl fmt::Display for UsageStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tokens used:          {}", self.total_tokens)?;
        writeln!(f, "Estimated cost:       ${:.4}", self.total_cost)?;
        writeln!(f, "Cached translations:  {}", self.translations_count)?;
        writeln!(f, "Cache hit rate:       {:.2}", self.cache_hit_rate)?;
        writeln!(f, "  average quality:    {:.2}", self.cache.avg_quality)?;
        writeln!(f, "  average use count:  {:.2}", self.cache.avg_use_count)?;
        writeln!(f, "  total uses:         {}", self.cache.total_uses)?;
        writeln!(f, "  active (7 days):    {}", self.cache.active_entries)?;
        writeln!(f, "  high quality:       {}", self.cache.high_quality_entries)?;
        write!(
            f,
            "This session:         {} requests ({} from cache, {:.1}%)",
            self.session_translations,
            self.session_cache_hits,
            self.session_hit_rate * 100.0
        )
    }
}
