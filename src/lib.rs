//! Gremlin Repository - query resolution and parameter binding for graph repositories
//!
//! Repository methods declare Gremlin query templates (or rely on named or
//! derived queries). This crate decides how each method executes, binds call
//! arguments into the chosen template, and hands the bound query to a
//! [`GraphExecutionService`](graph::GraphExecutionService) that talks to the
//! store.

pub mod config;
pub mod error;
pub mod graph;
pub mod query;
pub mod repository;

pub use config::{ConfigError, EngineConfig};
pub use error::{BindingError, ConfigurationError, ExecutionError, QueryError};
pub use repository::{Repository, RepositoryFactory};
