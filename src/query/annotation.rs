//! Declared query metadata and its per-method cache.
//!
//! Repository methods declare their queries in a registration table
//! ([`StaticAnnotationSource`]) that is assembled once, alongside the
//! repository. [`AnnotationCache`] snapshots the table for the repository's
//! methods so lookups during query resolution are plain map reads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::query::execution::ExecutionStrategy;
use crate::query::method::{MethodDescriptor, MethodId};

/// Query text and flags declared on a repository method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredQuery {
    pub text: String,
    /// Optional field/projection specification, itself a template.
    pub fields: Option<String>,
    pub native: bool,
    pub count: bool,
    pub exists: bool,
    pub delete: bool,
}

impl DeclaredQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A declaration that only carries flags; the text must come from a
    /// named query.
    pub fn flags_only() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn exists(mut self) -> Self {
        self.exists = true;
        self
    }

    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Whether the declaration provides query text of its own.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Resolves the flags into a single execution strategy.
    ///
    /// # Errors
    ///
    /// More than one of `count`, `exists` and `delete` is a
    /// [`ConfigurationError::AmbiguousStrategy`].
    pub fn strategy(&self, method: &MethodId) -> Result<ExecutionStrategy, ConfigurationError> {
        match (self.count, self.exists, self.delete) {
            (false, false, false) => Ok(ExecutionStrategy::Find),
            (true, false, false) => Ok(ExecutionStrategy::Count),
            (false, true, false) => Ok(ExecutionStrategy::Exists),
            (false, false, true) => Ok(ExecutionStrategy::Delete),
            _ => Err(ConfigurationError::AmbiguousStrategy {
                method: method.clone(),
            }),
        }
    }
}

/// Source of declared queries, keyed by method.
pub trait AnnotationSource: Send + Sync {
    fn find_declared_query(&self, method: &MethodId) -> Option<DeclaredQuery>;
}

/// Registration table mapping methods to their declared queries.
///
/// # Example
///
/// ```
/// use gremlin_repository::query;
/// use gremlin_repository::query::{AnnotationSource, MethodId, StaticAnnotationSource};
///
/// let source = StaticAnnotationSource::new()
///     .register("PersonRepository", "find_by_name", query!("g.V().has('name', ?)"))
///     .register("PersonRepository", "count_adults", query!("g.V().has('age', gte(18))", count));
///
/// let declared = source
///     .find_declared_query(&MethodId::new("PersonRepository", "count_adults"))
///     .unwrap();
/// assert!(declared.count);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticAnnotationSource {
    entries: HashMap<MethodId, DeclaredQuery>,
}

impl StaticAnnotationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the declared query of `repository.method`, replacing any
    /// previous registration.
    pub fn register(mut self, repository: &str, method: &str, query: DeclaredQuery) -> Self {
        self.entries.insert(MethodId::new(repository, method), query);
        self
    }
}

impl AnnotationSource for StaticAnnotationSource {
    fn find_declared_query(&self, method: &MethodId) -> Option<DeclaredQuery> {
        self.entries.get(method).cloned()
    }
}

/// Memoized declared-query lookups for a fixed set of methods.
///
/// The map is filled once during repository assembly and never changes,
/// so concurrent readers need no synchronization.
pub struct AnnotationCache {
    entries: HashMap<MethodId, Option<Arc<DeclaredQuery>>>,
    source: Arc<dyn AnnotationSource>,
}

impl AnnotationCache {
    /// Looks up every method once and keeps the answers.
    pub fn build<'a>(
        source: Arc<dyn AnnotationSource>,
        methods: impl IntoIterator<Item = &'a MethodDescriptor>,
    ) -> Self {
        let entries = methods
            .into_iter()
            .map(|method| {
                let declared = source.find_declared_query(method.id()).map(Arc::new);
                (method.id().clone(), declared)
            })
            .collect();
        Self { entries, source }
    }

    /// Returns the declared query of `method`, if any.
    ///
    /// Methods outside the cached set are answered by the source directly.
    pub fn lookup(&self, method: &MethodId) -> Option<Arc<DeclaredQuery>> {
        match self.entries.get(method) {
            Some(declared) => declared.clone(),
            None => {
                tracing::warn!(%method, "Declared query lookup for uncached method");
                self.source.find_declared_query(method).map(Arc::new)
            }
        }
    }
}
