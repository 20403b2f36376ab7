//! Fetch strategies for [`InMemoryQueryClient::fetch_query`](crate::client::InMemoryQueryClient::fetch_query).
//!
//! | Strategy | Fresh hit | Stale / miss | Use Case |
//! |----------|-----------|--------------|----------|
//! | **Fresh** | Return | Return cached or None | Render from cache only |
//! | **Refresh** | Return | Fetch and store | Default read path |
//! | **Invalidate** | Mark stale, fetch | Fetch and store | Force a refetch after a mutation |
//! | **Bypass** | Fetch and store | Fetch and store | Polling, debugging |

/// Strategy controlling how a fetch uses the cache.
///
/// # Examples
///
/// ```
/// use query_key_kit::strategy::CacheStrategy;
///
/// let _strategy = CacheStrategy::Fresh;
/// let _strategy = CacheStrategy::Refresh;
/// let _strategy = CacheStrategy::Invalidate;
/// let _strategy = CacheStrategy::Bypass;
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// **Fresh**: Cache only, never call the fetcher.
    ///
    /// Returns whatever is cached (even if stale), or `None` on a miss.
    Fresh,

    /// **Refresh**: Serve a fresh hit, otherwise fetch.
    ///
    /// Flow:
    /// 1. Check cache
    /// 2. If present and fresh: return it
    /// 3. Otherwise: fetch, store, return
    #[default]
    Refresh,

    /// **Invalidate**: Mark the slot stale, then fetch.
    Invalidate,

    /// **Bypass**: Always fetch; the result is still stored for other readers.
    Bypass,
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStrategy::Fresh => write!(f, "Fresh"),
            CacheStrategy::Refresh => write!(f, "Refresh"),
            CacheStrategy::Invalidate => write!(f, "Invalidate"),
            CacheStrategy::Bypass => write!(f, "Bypass"),
        }
    }
}
