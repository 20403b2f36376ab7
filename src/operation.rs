//! Named cache-affecting operations.

use crate::client::QueryClient;
use crate::error::{Error, Result};
use crate::key::{KeyId, ID_FIELD};
use crate::resolver::{Invalidates, KeySource};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback reconciling the cache after a mutation succeeds.
pub type NormalizeFn<T> = dyn Fn(&NormalizeContext<'_, T>, &Value) -> Result<()> + Send + Sync;

/// Descriptive tag. Nothing in the key layer branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// What a normalizer sees when it runs.
///
/// The sibling `list` and `detail` sources are the group's current ones, so a
/// normalizer on an injected group writes to the injected slots.
pub struct NormalizeContext<'a, T> {
    pub client: &'a dyn QueryClient,
    pub entity: &'a str,
    pub list: &'a KeySource<T>,
    pub detail: &'a KeySource<T>,
}

impl<'a, T: KeyId> NormalizeContext<'a, T> {
    /// The `id` of a mutation result, both as stored JSON and decoded as `T`.
    ///
    /// # Errors
    ///
    /// `Error::ValidationError` if `data` has no `id`, or it does not decode as `T`.
    pub fn result_id(&self, data: &Value) -> Result<(Value, T)> {
        let raw = data.get(ID_FIELD).ok_or_else(|| {
            Error::ValidationError(format!("{} result carries no id", self.entity))
        })?;
        let id = T::from_key_value(raw).ok_or_else(|| {
            Error::ValidationError(format!(
                "{} result id {} does not match the identifier type",
                self.entity, raw
            ))
        })?;
        Ok((raw.clone(), id))
    }
}

/// One named unit within a [`QueryGroup`](crate::group::QueryGroup).
pub struct Operation<T> {
    pub query_key: KeySource<T>,
    pub invalidates: Option<Invalidates<T>>,
    pub kind: Option<OperationKind>,
    pub normalize: Option<Arc<NormalizeFn<T>>>,
}

impl<T: KeyId> Operation<T> {
    pub fn new(query_key: impl Into<KeySource<T>>) -> Self {
        Operation {
            query_key: query_key.into(),
            invalidates: None,
            kind: None,
            normalize: None,
        }
    }

    pub fn query(query_key: impl Into<KeySource<T>>) -> Self {
        Self::new(query_key).with_kind(OperationKind::Query)
    }

    pub fn mutation(query_key: impl Into<KeySource<T>>) -> Self {
        Self::new(query_key).with_kind(OperationKind::Mutation)
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn invalidating(mut self, invalidates: Invalidates<T>) -> Self {
        self.invalidates = Some(invalidates);
        self
    }

    pub fn with_normalize<F>(mut self, normalize: F) -> Self
    where
        F: Fn(&NormalizeContext<'_, T>, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.normalize = Some(Arc::new(normalize));
        self
    }

    /// Run the normalizer, if any. Operations without one succeed without effect.
    pub fn run_normalize(&self, ctx: &NormalizeContext<'_, T>, data: &Value) -> Result<()> {
        match &self.normalize {
            Some(normalize) => normalize(ctx, data),
            None => Ok(()),
        }
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Operation {
            query_key: self.query_key.clone(),
            invalidates: self.invalidates.clone(),
            kind: self.kind,
            normalize: self.normalize.clone(),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("query_key", &self.query_key)
            .field("invalidates", &self.invalidates)
            .field("kind", &self.kind)
            .field("normalize", &self.normalize.as_ref().map(|_| ".."))
            .finish()
    }
}
