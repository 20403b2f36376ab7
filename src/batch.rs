//! Batch invalidation and cancellation.
//!
//! Both functions walk the keys in order and forward each present key to the
//! client; `None` entries (typically from conditional expressions) are skipped.
//! There is no deduplication and no aggregation: each client call completes, or
//! queues its effect, before the next one starts. The first client error is
//! returned unchanged and the remaining keys are not attempted.

use crate::client::{InvalidateOptions, QueryClient};
use crate::error::Result;
use crate::key::CacheKey;

/// Invalidate every present key, in order.
///
/// # Example
///
/// ```
/// use query_key_kit::batch::invalidate_all;
/// use query_key_kit::client::{InMemoryQueryClient, InvalidateOptions};
/// use query_key_kit::key::CacheKey;
///
/// let client = InMemoryQueryClient::new();
/// let accounts = CacheKey::new("accounts");
/// let only_if_admin: Option<&CacheKey> = None;
///
/// invalidate_all(&client, [Some(&accounts), only_if_admin], &InvalidateOptions::default())?;
/// # Ok::<(), query_key_kit::Error>(())
/// ```
///
/// # Errors
///
/// Returns the first error reported by `client.invalidate`, unchanged.
pub fn invalidate_all<'a, C, I, K>(client: &C, keys: I, options: &InvalidateOptions) -> Result<()>
where
    C: QueryClient + ?Sized,
    I: IntoIterator<Item = K>,
    K: Into<Option<&'a CacheKey>>,
{
    let mut forwarded = 0;
    for key in keys {
        let key: Option<&CacheKey> = key.into();
        if let Some(key) = key {
            client.invalidate(key, options)?;
            forwarded += 1;
        }
    }
    debug!("✓ Batch INVALIDATE forwarded {} key(s)", forwarded);
    Ok(())
}

/// Cancel in-flight fetches for every present key, in order.
///
/// Call this before an optimistic write so a fetch already in flight cannot
/// overwrite it with older data.
///
/// # Errors
///
/// Returns the first error reported by `client.cancel`, unchanged.
pub fn cancel_all<'a, C, I, K>(client: &C, keys: I) -> Result<()>
where
    C: QueryClient + ?Sized,
    I: IntoIterator<Item = K>,
    K: Into<Option<&'a CacheKey>>,
{
    let mut forwarded = 0;
    for key in keys {
        let key: Option<&CacheKey> = key.into();
        if let Some(key) = key {
            client.cancel(key)?;
            forwarded += 1;
        }
    }
    debug!("✓ Batch CANCEL forwarded {} key(s)", forwarded);
    Ok(())
}
