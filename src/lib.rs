//! # query-key-kit
//!
//! Structured, injectable query keys for client-side data caches.
//!
//! ## Features
//!
//! - **Structured Keys:** Every cache slot is addressed by an open [`CacheKey`] mapping
//! - **CRUD Groups:** [`build_crud_group`] derives list/detail/create/update/remove keys for an entity
//! - **Key Injection:** Stamp `auth`, tenant or locale fields onto every key of a tree of groups
//! - **Cache Normalization:** Mutation results are folded into cached lists and detail slots
//! - **Client Agnostic:** Anything implementing [`QueryClient`] can sit underneath
//! - **Production Ready:** Built-in logging, metrics hooks and error handling
//!
//! ## Quick Start
//!
//! ```ignore
//! use query_key_kit::{
//!     build_crud_group, inject_extra_fields, ExtraFields, InjectKeys, QueryGroup,
//!     QueryService, client::InMemoryQueryClient,
//! };
//!
//! // 1. Declare the application's groups
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
//!
//! // 2. Separate signed-in caches from anonymous ones
//! let queries = inject_extra_fields(&queries, &ExtraFields::new().with("auth", true));
//!
//! // 3. Fetch and reconcile through a shared service
//! let service = QueryService::new(InMemoryQueryClient::new());
//! let key = queries.accounts.detail.query_key.resolve(&"42".to_string());
//! let account = service.client().fetch_query(&key, Default::default(), || load_account("42")).await?;
//!
//! service.on_mutation_success(&queries.accounts, "update", None, &updated)?;
//! ```

#[macro_use]
extern crate log;

pub mod batch;
pub mod client;
pub mod error;
pub mod group;
pub mod inject;
pub mod key;
pub mod observability;
pub mod operation;
pub mod resolver;
pub mod service;
pub mod strategy;

// Re-exports for convenience
pub use batch::{cancel_all, invalidate_all};
#[cfg(feature = "inmemory")]
pub use client::InMemoryQueryClient;
pub use client::{InvalidateOptions, QueryClient};
pub use error::{Error, Result};
pub use group::{build_crud_group, QueryGroup};
pub use inject::{inject_extra_fields, InjectKeys};
pub use key::{CacheKey, ExtraFields, KeyId, Method};
pub use operation::{NormalizeContext, Operation, OperationKind};
pub use resolver::{Invalidates, KeySource};
pub use service::QueryService;
pub use strategy::CacheStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
