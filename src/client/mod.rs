//! Query client abstraction.
//!
//! The key layer never owns a cache. Every function that touches cached data takes a
//! [`QueryClient`] explicitly, so several independent cache scopes can coexist and
//! tests can swap in a fake.

use crate::error::Result;
use crate::key::CacheKey;
use serde_json::Value;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "inmemory")]
pub use inmemory::{ClientStats, InMemoryQueryClient};

/// Updater passed to [`QueryClient::set_entry`].
///
/// Receives the current data (`None` if the slot is empty) and returns the new data.
/// Returning `None` clears the slot. Engines may run it while the slot is locked,
/// so it must not call back into the client.
pub type EntryUpdater<'a> = &'a dyn Fn(Option<Value>) -> Option<Value>;

/// Options forwarded to [`QueryClient::invalidate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidateOptions {
    /// Only invalidate the slot equal to the key, instead of every slot the key
    /// partially matches.
    pub exact: bool,

    /// Abort in-flight fetches of matching slots so a refetch starts clean.
    pub cancel_in_flight: bool,
}

impl Default for InvalidateOptions {
    fn default() -> Self {
        InvalidateOptions {
            exact: false,
            cancel_in_flight: true,
        }
    }
}

impl InvalidateOptions {
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn cancel_in_flight(mut self, cancel: bool) -> Self {
        self.cancel_in_flight = cancel;
        self
    }
}

/// Trait for request-caching engines addressed by [`CacheKey`].
///
/// Object safe: the key layer works with `&dyn QueryClient`.
///
/// All methods use `&self`. Implementations should use interior mutability
/// (DashMap, RwLock) or external storage.
pub trait QueryClient: Send + Sync {
    /// Read the data cached for exactly this key.
    fn get_entry(&self, key: &CacheKey) -> Option<Value>;

    /// Replace the data cached for exactly this key with `updater(old)`.
    ///
    /// # Errors
    /// Returns `Err` if the engine fails to store the value
    fn set_entry(&self, key: &CacheKey, updater: EntryUpdater<'_>) -> Result<()>;

    /// Mark matching slots stale so they are refetched on next access.
    ///
    /// # Errors
    /// Returns `Err` if the engine fails; the key layer forwards it unchanged
    fn invalidate(&self, key: &CacheKey, options: &InvalidateOptions) -> Result<()>;

    /// Abort in-flight fetches of matching slots.
    ///
    /// # Errors
    /// Returns `Err` if the engine fails; the key layer forwards it unchanged
    fn cancel(&self, key: &CacheKey) -> Result<()>;

    /// Store `data` for exactly this key (optional convenience).
    ///
    /// # Errors
    /// Returns `Err` if the engine fails to store the value
    fn set_data(&self, key: &CacheKey, data: Value) -> Result<()> {
        self.set_entry(key, &move |_| Some(data.clone()))
    }
}
