//! Graph store abstraction consumed by the query engine.
//!
//! The engine never talks to a database directly. Everything it needs from
//! the store is expressed by [`GraphExecutionService`], which receives fully
//! bound queries and yields a [`RowStream`] of JSON-valued [`Row`]s.
//!
//! # Usage
//!
//! ```ignore
//! use gremlin_repository::graph::{GraphExecutionService, RowStream};
//!
//! struct GremlinServer { /* client */ }
//!
//! #[async_trait::async_trait]
//! impl GraphExecutionService for GremlinServer {
//!     async fn execute(&self, query: &QueryObject, domain: &DomainType)
//!         -> Result<RowStream<'_>, ExecutionError> { /* submit query.query_text */ }
//!
//!     async fn execute_raw(&self, query: &RawQuery, domain: &DomainType)
//!         -> Result<RowStream<'_>, ExecutionError> { /* submit query.text */ }
//! }
//! ```

mod row;
mod traits;

pub use row::{Params, Row, RowStream};
pub use traits::GraphExecutionService;
