//! Static-or-dynamic key sources and their resolution.
//!
//! An operation's key is either fixed (`{entity, method:"list"}`) or produced from
//! identifier arguments (`id -> {entity, method:"detail", id}`). Both shapes are
//! explicit variants, so resolution is a `match` rather than a runtime type test.

use crate::key::{CacheKey, KeyId};
use std::fmt;
use std::sync::Arc;

/// Function producing a key from identifier arguments.
pub type KeyFn<T> = dyn Fn(&T) -> CacheKey + Send + Sync;

/// Function producing the keys to invalidate from identifier arguments.
pub type KeysFn<T> = dyn Fn(&T) -> Vec<CacheKey> + Send + Sync;

/// A cache key, or a function producing one.
pub enum KeySource<T> {
    Static(CacheKey),
    Dynamic(Arc<KeyFn<T>>),
}

impl<T: KeyId> KeySource<T> {
    pub fn fixed(key: CacheKey) -> Self {
        KeySource::Static(key)
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&T) -> CacheKey + Send + Sync + 'static,
    {
        KeySource::Dynamic(Arc::new(f))
    }

    /// Resolve into a concrete key.
    ///
    /// Dynamic sources are invoked with `args`; static sources ignore them.
    pub fn resolve(&self, args: &T) -> CacheKey {
        match self {
            KeySource::Static(key) => key.clone(),
            KeySource::Dynamic(f) => f(args),
        }
    }

    /// The key itself, if this source is static.
    pub fn as_static(&self) -> Option<&CacheKey> {
        match self {
            KeySource::Static(key) => Some(key),
            KeySource::Dynamic(_) => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, KeySource::Dynamic(_))
    }
}

impl<T> Clone for KeySource<T> {
    fn clone(&self) -> Self {
        match self {
            KeySource::Static(key) => KeySource::Static(key.clone()),
            KeySource::Dynamic(f) => KeySource::Dynamic(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for KeySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeySource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl<T> From<CacheKey> for KeySource<T> {
    fn from(key: CacheKey) -> Self {
        KeySource::Static(key)
    }
}

/// Keys to invalidate after an operation succeeds.
pub enum Invalidates<T> {
    Static(CacheKey),
    Dynamic(Arc<KeysFn<T>>),
}

impl<T: KeyId> Invalidates<T> {
    pub fn fixed(key: CacheKey) -> Self {
        Invalidates::Static(key)
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&T) -> Vec<CacheKey> + Send + Sync + 'static,
    {
        Invalidates::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self, args: &T) -> Vec<CacheKey> {
        match self {
            Invalidates::Static(key) => vec![key.clone()],
            Invalidates::Dynamic(f) => f(args),
        }
    }

    pub fn as_static(&self) -> Option<&CacheKey> {
        match self {
            Invalidates::Static(key) => Some(key),
            Invalidates::Dynamic(_) => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Invalidates::Dynamic(_))
    }
}

impl<T> Clone for Invalidates<T> {
    fn clone(&self) -> Self {
        match self {
            Invalidates::Static(key) => Invalidates::Static(key.clone()),
            Invalidates::Dynamic(f) => Invalidates::Dynamic(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Invalidates<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidates::Static(key) => f.debug_tuple("Static").field(key).finish(),
            Invalidates::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
