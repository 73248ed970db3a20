//! Error types for query resolution, binding and execution.
//!
//! Errors fall into two phases:
//!
//! - [`ConfigurationError`] is raised while a repository is assembled and
//!   aborts construction entirely.
//! - [`BindingError`], [`ExecutionError`] and the remaining [`QueryError`]
//!   variants surface from a single method invocation.

use thiserror::Error;

use crate::query::MethodId;

/// Construction-time errors. A repository with any of these is never built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Ambiguous execution strategy for {method}: only one of count, exists, delete may be set")]
    AmbiguousStrategy { method: MethodId },

    #[error("Malformed query template `{template}`: {message}")]
    MalformedTemplate { template: String, message: String },

    #[error("Unterminated expression at offset {offset} in `{template}`")]
    UnterminatedExpression { template: String, offset: usize },

    #[error("Malformed expression `{expression}`: {message}")]
    MalformedExpression { expression: String, message: String },

    #[error("{method} declares {declared} bindable parameter(s) but its template uses {used} positional marker(s)")]
    PositionalOverflow {
        method: MethodId,
        declared: usize,
        used: usize,
    },

    #[error("{method} has no bindable parameter at position {index} (declares {declared})")]
    PositionalOutOfRange {
        method: MethodId,
        index: usize,
        declared: usize,
    },

    #[error("Named query `{0}` is registered without query text")]
    MissingNamedQuery(String),

    #[error("Repository method declared twice: {0}")]
    DuplicateMethod(MethodId),
}

/// Per-call errors raised while binding argument values into a template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("No parameter named `{0}` is declared on the method")]
    UnknownParameter(String),

    #[error("No argument value supplied for parameter {index}")]
    MissingArgument { index: usize },

    #[error("Expression `{expression}` failed: {message}")]
    Expression { expression: String, message: String },

    #[error("Sort directives cannot be applied to a native query")]
    SortOnNativeQuery,

    #[error("Derived query failed: {0}")]
    Derivation(String),
}

impl BindingError {
    pub(crate) fn expression(expression: &str, message: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}

/// Error reported by a [`GraphExecutionService`](crate::graph::GraphExecutionService).
///
/// The engine never inspects the wrapped error; it is handed back to the
/// caller as it was produced.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ExecutionError(#[from] Box<dyn std::error::Error + Send + Sync>);

impl ExecutionError {
    /// Wraps any error raised by the backing store.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(err))
    }

    /// Returns the wrapped error.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync> {
        self.0
    }
}

/// Errors surfaced from invoking a repository method.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Failed to map result row: {0}")]
    Mapping(String),

    #[error("Repository has no method named `{0}`")]
    UnknownMethod(String),
}
