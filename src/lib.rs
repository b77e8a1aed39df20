//! Cache-aware GraphQL query deduplication.
//!
//! This crate is the core of a middleware that sits between an application
//! issuing GraphQL queries and the transport that executes them: before a
//! query goes out, it is resolved against a snapshot of a normalized object
//! cache, fields the cache can already answer are pruned, and only the
//! remainder is forwarded downstream. The final response is the deep merge
//! of both halves.
//!
//! The crate is side-effect free: reading the external cache, sending the
//! pruned query, and relaying the merged response are the integrating
//! pipeline's responsibility. What lives here is the split and the merge:
//!
//! 1. Capture the cache as a [`CacheSnapshot`] keyed by entity identifier.
//! 2. Run [`dedup_operation`] (or [`execute_query`] directly with a custom
//!    resolver) to classify the operation as a complete hit, a partial hit
//!    with a rewritten query, or a bypass.
//! 3. On a partial hit, forward the rewritten query and reassemble with
//!    [`merge_downstream`].
//!
//! Missing cache data is never an error here: it only widens the rewritten
//! query. The input document is never mutated; the rewritten query is a
//! freshly built document.

#![warn(unreachable_pub)]

mod dedup;
mod error;
mod execution;
pub mod json_ext;
mod resolver;
mod store;

pub use crate::dedup::DedupOutcome;
pub use crate::dedup::DedupRequest;
pub use crate::dedup::dedup_operation;
pub use crate::dedup::merge_downstream;
pub use crate::error::DedupError;
pub use crate::execution::ExecutionResult;
pub use crate::execution::execute_query;
pub use crate::resolver::CacheRedirects;
pub use crate::resolver::CacheResolver;
pub use crate::resolver::DataIdFn;
pub use crate::resolver::FieldResolver;
pub use crate::resolver::RedirectContext;
pub use crate::resolver::RedirectFn;
pub use crate::resolver::ResolutionContext;
pub use crate::resolver::default_data_id;
pub use crate::resolver::storage_key;
pub use crate::store::CacheSnapshot;
pub use crate::store::EntityRef;
pub use crate::store::JsonScalar;
pub use crate::store::ROOT_QUERY_ID;
pub use crate::store::StoreObject;
pub use crate::store::StoreValue;
