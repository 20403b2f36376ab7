//! In-memory query client (default, thread-safe).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Fetches run through `futures::future::abortable`, so `cancel` and
//! `invalidate` can abort them while they are in flight.

use super::{EntryUpdater, InvalidateOptions, QueryClient};
use crate::error::{Error, Result};
use crate::key::CacheKey;
use crate::observability::{ClientMetrics, NoOpMetrics, StalePolicy};
use crate::strategy::CacheStrategy;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{abortable, AbortHandle, Aborted};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Cached data for one slot.
struct QueryEntry {
    key: CacheKey,
    data: Value,
    updated_at: Instant,
    invalidated: bool,
}

impl QueryEntry {
    fn new(key: CacheKey, data: Value) -> Self {
        QueryEntry {
            key,
            data,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    fn is_stale(&self, policy: &StalePolicy) -> bool {
        if self.invalidated && policy.honors_invalidation() {
            return true;
        }
        policy
            .stale_time(self.key.entity().unwrap_or_default())
            .is_some_and(|stale_time| self.updated_at.elapsed() > stale_time)
    }
}

/// A fetch currently awaiting its fetcher.
struct InFlight {
    key: CacheKey,
    handle: AbortHandle,
}

/// Removes a fetch from the in-flight table when dropped, including when the
/// caller drops the `fetch_query` future before it completes.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<u64, InFlight>,
    fetch_id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.fetch_id);
    }
}

/// Thread-safe in-memory query client.
///
/// Slots are addressed by the canonical rendering of their [`CacheKey`], so keys
/// that are structurally equal share a slot. Invalidation and cancellation take
/// filter keys and apply to every slot the filter partially matches.
///
/// # Example
///
/// ```no_run
/// use query_key_kit::client::{InMemoryQueryClient, QueryClient};
/// use query_key_kit::key::{CacheKey, Method};
/// use query_key_kit::strategy::CacheStrategy;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = InMemoryQueryClient::new();
///     let key = CacheKey::new("accounts").with_method(Method::List);
///
///     let accounts = client
///         .fetch_query(&key, CacheStrategy::Refresh, || async { Ok(json!([{"id": "a"}])) })
///         .await?;
///     assert!(accounts.is_some());
///
///     client.invalidate(&CacheKey::new("accounts"), &Default::default())?;
///     assert_eq!(client.is_stale(&key), Some(true));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryQueryClient {
    store: Arc<DashMap<String, QueryEntry>>,
    in_flight: Arc<DashMap<u64, InFlight>>,
    next_fetch: Arc<AtomicU64>,
    metrics: Arc<dyn ClientMetrics>,
    stale_policy: StalePolicy,
}

impl InMemoryQueryClient {
    /// Create a new in-memory query client.
    pub fn new() -> Self {
        InMemoryQueryClient {
            store: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            next_fetch: Arc::new(AtomicU64::new(0)),
            metrics: Arc::new(NoOpMetrics),
            stale_policy: StalePolicy::default(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn ClientMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom stale policy.
    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Number of cached slots.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of fetches currently awaiting their fetcher.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Staleness of a slot, or `None` if nothing is cached for it.
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.store
            .get(&key.to_string())
            .map(|entry| entry.is_stale(&self.stale_policy))
    }

    pub fn stats(&self) -> ClientStats {
        let stale_entries = self
            .store
            .iter()
            .filter(|entry| entry.is_stale(&self.stale_policy))
            .count();

        ClientStats {
            total_entries: self.store.len(),
            stale_entries,
            in_flight: self.in_flight.len(),
        }
    }

    /// Print client statistics to debug log.
    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "Query Stats: {} entries ({} stale), {} in flight",
            stats.total_entries, stats.stale_entries, stats.in_flight
        );
    }

    /// Drop every cached slot. In-flight fetches are left running.
    pub fn clear_all(&self) {
        self.store.clear();
        warn!("⚠ InMemory CLEAR_ALL executed - all query data cleared!");
    }

    /// Read through the cache according to `strategy`.
    ///
    /// # Returns
    /// - `Ok(Some(data))` - cached or freshly fetched data
    /// - `Ok(None)` - `Fresh` strategy and nothing cached
    ///
    /// # Errors
    ///
    /// - `Error::Cancelled`: the fetch was aborted by `cancel` or `invalidate`
    /// - any error returned by `fetcher`, unchanged
    pub async fn fetch_query<F, Fut>(
        &self,
        key: &CacheKey,
        strategy: CacheStrategy,
        fetcher: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let timer = Instant::now();
        let slot = key.to_string();

        debug!("» Query fetch for {} (strategy: {})", slot, strategy);

        match strategy {
            CacheStrategy::Fresh => {
                let cached = self.store.get(&slot).map(|entry| entry.data.clone());
                if cached.is_some() {
                    self.metrics.record_hit(&slot, timer.elapsed());
                } else {
                    self.metrics.record_miss(&slot, timer.elapsed());
                }
                return Ok(cached);
            }
            CacheStrategy::Refresh => {
                if let Some(data) = self.fresh_data(&slot) {
                    self.metrics.record_hit(&slot, timer.elapsed());
                    return Ok(Some(data));
                }
                self.metrics.record_miss(&slot, timer.elapsed());
            }
            CacheStrategy::Invalidate => {
                if let Some(mut entry) = self.store.get_mut(&slot) {
                    entry.invalidated = true;
                }
            }
            CacheStrategy::Bypass => {}
        }

        self.run_fetch(key, &slot, fetcher).await.map(Some)
    }

    fn fresh_data(&self, slot: &str) -> Option<Value> {
        let entry = self.store.get(slot)?;
        if entry.is_stale(&self.stale_policy) {
            None
        } else {
            Some(entry.data.clone())
        }
    }

    async fn run_fetch<F, Fut>(&self, key: &CacheKey, slot: &str, fetcher: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let fetch_id = self.next_fetch.fetch_add(1, Ordering::Relaxed);
        let (fetch, handle) = abortable(fetcher());
        self.in_flight.insert(
            fetch_id,
            InFlight {
                key: key.clone(),
                handle,
            },
        );
        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            fetch_id,
        };

        let outcome = fetch.await;
        drop(guard);

        match outcome {
            Err(Aborted) => {
                debug!("✗ Query fetch for {} cancelled", slot);
                Err(Error::Cancelled(slot.to_string()))
            }
            Ok(Err(e)) => {
                self.metrics.record_error(slot, &e.to_string());
                Err(e)
            }
            Ok(Ok(data)) => {
                self.store
                    .insert(slot.to_string(), QueryEntry::new(key.clone(), data.clone()));
                self.metrics.record_set(slot);
                Ok(data)
            }
        }
    }

    fn abort_matching(&self, filter: &CacheKey, exact: bool) -> usize {
        let mut aborted = 0;
        for fetch in self.in_flight.iter() {
            let hit = if exact {
                fetch.key == *filter
            } else {
                fetch.key.matches(filter)
            };
            if hit {
                fetch.handle.abort();
                aborted += 1;
            }
        }
        aborted
    }
}

impl Default for InMemoryQueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient for InMemoryQueryClient {
    fn get_entry(&self, key: &CacheKey) -> Option<Value> {
        self.store.get(&key.to_string()).map(|entry| entry.data.clone())
    }

    /// The updater runs under the slot's shard lock, so concurrent updates of one
    /// slot are applied one after another. It must not call back into this client.
    fn set_entry(&self, key: &CacheKey, updater: EntryUpdater<'_>) -> Result<()> {
        let slot = key.to_string();

        let written = match self.store.entry(slot.clone()) {
            Entry::Occupied(mut occupied) => match updater(Some(occupied.get().data.clone())) {
                Some(data) => {
                    occupied.insert(QueryEntry::new(key.clone(), data));
                    true
                }
                None => {
                    occupied.remove();
                    false
                }
            },
            Entry::Vacant(vacant) => match updater(None) {
                Some(data) => {
                    vacant.insert(QueryEntry::new(key.clone(), data));
                    true
                }
                None => false,
            },
        };

        if written {
            self.metrics.record_set(&slot);
        } else {
            debug!("✓ InMemory CLEAR {}", slot);
        }

        Ok(())
    }

    fn invalidate(&self, key: &CacheKey, options: &InvalidateOptions) -> Result<()> {
        let mut matched = 0;
        for mut entry in self.store.iter_mut() {
            let hit = if options.exact {
                entry.key == *key
            } else {
                entry.key.matches(key)
            };
            if hit {
                entry.invalidated = true;
                matched += 1;
            }
        }
        self.metrics.record_invalidate(&key.to_string(), matched);

        if options.cancel_in_flight {
            self.abort_matching(key, options.exact);
        }

        Ok(())
    }

    fn cancel(&self, key: &CacheKey) -> Result<()> {
        let aborted = self.abort_matching(key, false);
        self.metrics.record_cancel(&key.to_string(), aborted);
        Ok(())
    }
}

/// Client statistics.
#[derive(Clone, Debug)]
pub struct ClientStats {
    pub total_entries: usize,
    pub stale_entries: usize,
    pub in_flight: usize,
}
