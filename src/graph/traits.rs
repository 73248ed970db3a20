//! The I/O boundary between the query engine and the graph store.

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::graph::row::RowStream;
use crate::query::{DomainType, QueryObject, RawQuery};

/// Executes materialized queries against a Gremlin-compatible store.
///
/// This is the only place the engine performs I/O. Implementations own
/// connection handling, timeouts and the mapping of graph elements into
/// [`Row`](crate::graph::Row) columns; the engine propagates their errors
/// unchanged.
#[async_trait]
pub trait GraphExecutionService: Send + Sync {
    /// Executes a structured query object.
    ///
    /// # Arguments
    ///
    /// * `query` - The bound query with its field spec, sort and paging
    /// * `domain_type` - The entity type the rows will be mapped onto
    async fn execute(
        &self,
        query: &QueryObject,
        domain_type: &DomainType,
    ) -> Result<RowStream<'_>, ExecutionError>;

    /// Executes a native script verbatim.
    ///
    /// Used for queries declared as native; the script is sent as-is with
    /// its bindings.
    async fn execute_raw(
        &self,
        query: &RawQuery,
        domain_type: &DomainType,
    ) -> Result<RowStream<'_>, ExecutionError>;
}
