//! Shared handle tying groups, batches and a client together.
//!
//! Wraps the client in `Arc` so one handle can be cloned into every request
//! handler or task.

use crate::batch::{cancel_all, invalidate_all};
use crate::client::{InvalidateOptions, QueryClient};
use crate::error::{Error, Result};
use crate::group::QueryGroup;
use crate::key::{CacheKey, KeyId, ID_FIELD};
use crate::resolver::Invalidates;
use serde_json::Value;
use std::sync::Arc;

/// Query client handle for application code.
///
/// # Example
///
/// ```ignore
/// use query_key_kit::{build_crud_group, QueryService, client::InMemoryQueryClient};
///
/// let queries = QueryService::new(InMemoryQueryClient::new());
/// let accounts = build_crud_group::<String>("accounts");
///
/// // after `PUT /accounts/42` succeeded with `updated`
/// queries.on_mutation_success(&accounts, "update", Some(&"42".to_string()), &updated)?;
/// ```
pub struct QueryService<C: QueryClient> {
    client: Arc<C>,
    invalidate_options: InvalidateOptions,
}

impl<C: QueryClient> Clone for QueryService<C> {
    fn clone(&self) -> Self {
        QueryService {
            client: Arc::clone(&self.client),
            invalidate_options: self.invalidate_options.clone(),
        }
    }
}

impl<C: QueryClient> QueryService<C> {
    /// Create a new service around `client`.
    pub fn new(client: C) -> Self {
        Self::from_arc(Arc::new(client))
    }

    /// Create a service sharing an existing client handle.
    pub fn from_arc(client: Arc<C>) -> Self {
        QueryService {
            client,
            invalidate_options: InvalidateOptions::default(),
        }
    }

    /// Options used by [`on_mutation_success`](Self::on_mutation_success) and
    /// [`invalidate_all`](Self::invalidate_all).
    pub fn with_invalidate_options(mut self, options: InvalidateOptions) -> Self {
        self.invalidate_options = options;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn invalidate_all<'a, I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<Option<&'a CacheKey>>,
    {
        invalidate_all(self.client.as_ref(), keys, &self.invalidate_options)
    }

    pub fn cancel_all<'a, I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<Option<&'a CacheKey>>,
    {
        cancel_all(self.client.as_ref(), keys)
    }

    /// Cancel in-flight fetches for `keys` ahead of an optimistic write.
    pub fn prepare_optimistic(&self, keys: &[CacheKey]) -> Result<()> {
        debug!("Preparing optimistic write, cancelling {} key(s)", keys.len());
        self.cancel_all(keys)
    }

    /// Cancel in-flight fetches, then apply an optimistic write.
    ///
    /// # Errors
    ///
    /// Any client error from cancelling or writing, unchanged.
    pub fn write_optimistic(&self, cancel: &[CacheKey], key: &CacheKey, data: Value) -> Result<()> {
        self.prepare_optimistic(cancel)?;
        self.client.set_data(key, data)
    }

    /// Run a group operation's normalizer against this service's client.
    pub fn normalize<T: KeyId>(&self, group: &QueryGroup<T>, operation: &str, data: &Value) -> Result<()> {
        group.normalize(operation, self.client.as_ref(), data)
    }

    /// Reconcile the cache after a mutation succeeded.
    ///
    /// Runs the operation's normalizer, then invalidates its `invalidates` keys.
    /// Dynamic invalidation sets are resolved with `args`, or with the result's
    /// `id` when `args` is `None`.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownOperation`: `operation` is not in the group
    /// - `Error::ValidationError`: no arguments and no usable `id` in `data`
    /// - any client error, unchanged
    pub fn on_mutation_success<T: KeyId>(
        &self,
        group: &QueryGroup<T>,
        operation: &str,
        args: Option<&T>,
        data: &Value,
    ) -> Result<()> {
        let op = group
            .operation(operation)
            .ok_or_else(|| Error::UnknownOperation(format!("{}.{}", group.entity(), operation)))?;

        group.normalize(operation, self.client.as_ref(), data)?;

        let keys = match &op.invalidates {
            None => Vec::new(),
            Some(Invalidates::Static(key)) => vec![key.clone()],
            Some(dynamic @ Invalidates::Dynamic(_)) => {
                let args = match args {
                    Some(args) => args.clone(),
                    None => data
                        .get(ID_FIELD)
                        .and_then(T::from_key_value)
                        .ok_or_else(|| {
                            Error::ValidationError(format!(
                                "{}.{} needs arguments or a result id to invalidate",
                                group.entity(),
                                operation
                            ))
                        })?,
                };
                dynamic.resolve(&args)
            }
        };

        debug!(
            "Mutation {}.{} succeeded, invalidating {} key(s)",
            group.entity(),
            operation,
            keys.len()
        );
        self.invalidate_all(&keys)
    }
}
