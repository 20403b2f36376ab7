//! Metrics hooks and staleness policies for the in-memory client.
//!
//! Two concerns live here:
//!
//! - **Metrics (`ClientMetrics`)**: hits, misses, writes, invalidations, cancellations
//! - **Stale policies (`StalePolicy`)**: how long fetched data counts as fresh
//!
//! # Metrics
//!
//! ```ignore
//! use query_key_kit::observability::ClientMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl ClientMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("query_cache_hits").inc();
//!     }
//! }
//!
//! // let client = InMemoryQueryClient::new()
//! //     .with_metrics(Arc::new(PrometheusMetrics));
//! ```
//!
//! The default methods log through the `log` crate. `NoOpMetrics` is silent.
//!
//! # Stale policies
//!
//! ```
//! use query_key_kit::observability::StalePolicy;
//! use std::time::Duration;
//!
//! let _policy = StalePolicy::Fixed(Duration::from_secs(30));
//!
//! let _policy = StalePolicy::PerEntity(|entity| match entity {
//!     "accounts" => Duration::from_secs(300),
//!     _ => Duration::from_secs(30),
//! });
//! ```
//!
//! | Policy | Fresh until | Example |
//! |--------|-------------|---------|
//! | `Default` | invalidated | reference data refreshed by mutations |
//! | `Fixed` | duration elapsed or invalidated | dashboards |
//! | `Infinite` | never stale, even when invalidated | immutable lookups |
//! | `PerEntity` | per-entity duration or invalidated | accounts 5m, feeds 30s |

use std::time::Duration;

/// Trait for query client metrics collection.
pub trait ClientMetrics: Send + Sync {
    /// Record a fresh cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Query HIT: {} took {:?}", key, duration);
    }

    /// Record a miss (absent or stale slot).
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Query MISS: {} took {:?}", key, duration);
    }

    /// Record a cache write (fetch result or direct `set_entry`).
    fn record_set(&self, key: &str) {
        debug!("Query SET: {}", key);
    }

    /// Record how many slots an invalidation filter marked stale.
    fn record_invalidate(&self, filter: &str, matched: usize) {
        debug!("Query INVALIDATE: {} matched {} slot(s)", filter, matched);
    }

    /// Record how many in-flight fetches a cancel filter aborted.
    fn record_cancel(&self, filter: &str, aborted: usize) {
        debug!("Query CANCEL: {} aborted {} fetch(es)", filter, aborted);
    }

    /// Record a fetch failure.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Query ERROR for {}: {}", key, error);
    }
}

/// Metrics implementation that records nothing.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl ClientMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str) {}
    fn record_invalidate(&self, _filter: &str, _matched: usize) {}
    fn record_cancel(&self, _filter: &str, _aborted: usize) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Metrics implementation that only logs (the trait defaults).
#[derive(Clone, Default)]
pub struct LogMetrics;

impl ClientMetrics for LogMetrics {}

/// How long fetched data stays fresh.
#[derive(Clone, Debug, Default)]
pub enum StalePolicy {
    /// Fresh until invalidated
    #[default]
    Default,

    /// Stale after a fixed duration, or when invalidated
    Fixed(Duration),

    /// Never stale; invalidation is ignored for freshness
    Infinite,

    /// Per-entity duration, keyed by the key's `entity` field
    PerEntity(fn(&str) -> Duration),
}

impl StalePolicy {
    /// Stale time for an entity. `None` means no time-based staleness.
    pub fn stale_time(&self, entity: &str) -> Option<Duration> {
        match self {
            StalePolicy::Default => None,
            StalePolicy::Fixed(d) => Some(*d),
            StalePolicy::Infinite => None,
            StalePolicy::PerEntity(f) => Some(f(entity)),
        }
    }

    /// Whether an explicit invalidation makes data stale.
    pub fn honors_invalidation(&self) -> bool {
        !matches!(self, StalePolicy::Infinite)
    }
}
