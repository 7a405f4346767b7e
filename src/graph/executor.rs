use async_trait::async_trait;

use super::{RawPath, Record};
use crate::error::Result;
use crate::query::TraversalRequest;

/// Key of a secondary lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// A show by `tv_id`.
    Show(i64),
}

/// Graph store the path finder runs against. Implementations own their
/// connections; each call acquires and releases whatever session it needs.
#[async_trait]
pub trait GraphExecutor: Send + Sync {
    /// Run a constrained shortest-path search. `Ok(None)` means no path exists
    /// under the request's constraints.
    async fn execute_traversal(&self, request: &TraversalRequest) -> Result<Option<RawPath>>;

    /// Fetch a single record. `Ok(None)` means the key does not exist.
    async fn execute_lookup(&self, key: &LookupKey) -> Result<Option<Record>>;
}
