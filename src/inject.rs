//! Stamping shared fields onto every key of a structure.
//!
//! [`inject_extra_fields`] walks any [`InjectKeys`] structure depth-first and
//! returns a rebuilt copy in which every query key carries the extra fields (extra
//! wins on conflict). Key functions are wrapped so the keys they produce are
//! stamped too. The input is left as it was.
//!
//! Only query keys are stamped. `invalidates` sets are carried over unchanged;
//! clients that match invalidation filters partially still reach the stamped slots.
//!
//! Nesting is covered through the container impls (`Vec`, `Option`, `Box`, `Arc`,
//! `BTreeMap`, `HashMap`). Application structs join in by delegating per field:
//!
//! ```
//! use query_key_kit::group::{build_crud_group, QueryGroup};
//! use query_key_kit::inject::{inject_extra_fields, InjectKeys};
//! use query_key_kit::key::ExtraFields;
//!
//! #[derive(Clone)]
//! struct AppQueries {
//!     accounts: QueryGroup<String>,
//!     invoices: QueryGroup<u64>,
//! }
//!
//! impl InjectKeys for AppQueries {
//!     fn inject_keys(&self, extra: &ExtraFields) -> Self {
//!         AppQueries {
//!             accounts: self.accounts.inject_keys(extra),
//!             invoices: self.invoices.inject_keys(extra),
//!         }
//!     }
//! }
//!
//! let queries = AppQueries {
//!     accounts: build_crud_group("accounts"),
//!     invoices: build_crud_group("invoices"),
//! };
//! let scoped = inject_extra_fields(&queries, &ExtraFields::new().with("tenantId", "t-1"));
//! let key = scoped.invoices.detail.query_key.resolve(&9);
//! assert_eq!(key.get("tenantId"), Some(&serde_json::json!("t-1")));
//! ```

use crate::group::QueryGroup;
use crate::key::{CacheKey, ExtraFields, KeyId};
use crate::operation::Operation;
use crate::resolver::KeySource;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Property name marking a query key in loosely typed JSON trees.
pub const QUERY_KEY_FIELD: &str = "queryKey";

/// Structures whose cache keys can be stamped with extra fields.
pub trait InjectKeys: Sized {
    /// Return a copy with `extra` merged into every reachable query key.
    fn inject_keys(&self, extra: &ExtraFields) -> Self;
}

/// Stamp `extra` onto every query key reachable from `root`.
///
/// Injecting twice is allowed: the fields appear once per key, and key functions
/// end up wrapped twice.
pub fn inject_extra_fields<G: InjectKeys>(root: &G, extra: &ExtraFields) -> G {
    debug!("Injecting {} extra field(s) into query keys", extra.len());
    root.inject_keys(extra)
}

impl InjectKeys for CacheKey {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        self.merged(extra)
    }
}

impl<T: KeyId> InjectKeys for KeySource<T> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        match self {
            KeySource::Static(key) => KeySource::Static(key.merged(extra)),
            KeySource::Dynamic(f) => {
                let f = Arc::clone(f);
                let extra = extra.clone();
                KeySource::Dynamic(Arc::new(move |args: &T| f(args).merged(&extra)))
            }
        }
    }
}

impl<T: KeyId> InjectKeys for Operation<T> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        Operation {
            query_key: self.query_key.inject_keys(extra),
            ..self.clone()
        }
    }
}

impl<T: KeyId> InjectKeys for QueryGroup<T> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        self.map_operations(|operation| operation.inject_keys(extra))
    }
}

impl<N: InjectKeys> InjectKeys for Vec<N> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        self.iter().map(|node| node.inject_keys(extra)).collect()
    }
}

impl<N: InjectKeys> InjectKeys for Option<N> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        self.as_ref().map(|node| node.inject_keys(extra))
    }
}

impl<N: InjectKeys> InjectKeys for Box<N> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        Box::new(self.as_ref().inject_keys(extra))
    }
}

impl<N: InjectKeys> InjectKeys for Arc<N> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        Arc::new(self.as_ref().inject_keys(extra))
    }
}

impl<K: Ord + Clone, N: InjectKeys> InjectKeys for BTreeMap<K, N> {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        self.iter()
            .map(|(name, node)| (name.clone(), node.inject_keys(extra)))
            .collect()
    }
}

impl<K, N, S> InjectKeys for HashMap<K, N, S>
where
    K: Eq + Hash + Clone,
    N: InjectKeys,
    S: BuildHasher + Clone,
{
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        let mut out = HashMap::with_capacity_and_hasher(self.len(), self.hasher().clone());
        for (name, node) in self {
            out.insert(name.clone(), node.inject_keys(extra));
        }
        out
    }
}

/// Loosely typed trees: every object owning a `queryKey` object gets it merged,
/// every other property is visited, arrays keep their order, scalars pass through.
impl InjectKeys for Value {
    fn inject_keys(&self, extra: &ExtraFields) -> Self {
        match self {
            Value::Array(items) => Value::Array(items.inject_keys(extra)),
            Value::Object(properties) => {
                let mut out = Map::new();
                for (name, value) in properties {
                    let injected = if name == QUERY_KEY_FIELD {
                        match value {
                            Value::Object(fields) => Value::Object(
                                CacheKey::from_fields(fields.clone())
                                    .merged(extra)
                                    .into_fields(),
                            ),
                            other => other.clone(),
                        }
                    } else {
                        value.inject_keys(extra)
                    };
                    out.insert(name.clone(), injected);
                }
                Value::Object(out)
            }
            scalar => scalar.clone(),
        }
    }
}
