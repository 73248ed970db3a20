//! Repository assembly and invocation.
//!
//! [`RepositoryFactory`] resolves every declared method once and fails on the
//! first configuration error. The resulting [`Repository`] is immutable and
//! can be shared across tasks; each [`Repository::invoke`] binds its own
//! arguments and runs one query.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::EngineConfig;
use crate::error::{ConfigurationError, QueryError};
use crate::graph::GraphExecutionService;
use crate::query::{
    AnnotationCache, AnnotationSource, Binder, MethodDescriptor, MethodNameQueryDeriver,
    NamedQueries, NamedQueryRegistry, NoDerivation, ParameterValueAccessor, QueryLookupStrategy,
    QueryResult, RepositoryQuery, SubstitutionPolicy,
};

/// Builds repositories from declared methods.
#[derive(Clone)]
pub struct RepositoryFactory {
    annotations: Arc<dyn AnnotationSource>,
    named_queries: Arc<dyn NamedQueryRegistry>,
    deriver: Arc<dyn MethodNameQueryDeriver>,
    binder: Binder,
}

impl RepositoryFactory {
    /// Factory with no named queries, no deriver and literal substitution.
    pub fn new(annotations: Arc<dyn AnnotationSource>) -> Self {
        Self {
            annotations,
            named_queries: Arc::new(NamedQueries::new()),
            deriver: Arc::new(NoDerivation),
            binder: Binder::default(),
        }
    }

    /// Factory using the substitution policy and named queries of `config`.
    pub fn from_config(config: &EngineConfig, annotations: Arc<dyn AnnotationSource>) -> Self {
        Self::new(annotations)
            .with_named_queries(Arc::new(config.named_queries()))
            .with_policy(config.query.substitution)
    }

    pub fn with_named_queries(mut self, named_queries: Arc<dyn NamedQueryRegistry>) -> Self {
        self.named_queries = named_queries;
        self
    }

    pub fn with_deriver(mut self, deriver: Arc<dyn MethodNameQueryDeriver>) -> Self {
        self.deriver = deriver;
        self
    }

    pub fn with_policy(mut self, policy: SubstitutionPolicy) -> Self {
        self.binder = Binder::new(policy);
        self
    }

    /// Resolves `methods` and assembles a repository executing on `service`.
    ///
    /// # Errors
    ///
    /// The first [`ConfigurationError`] met while resolving any method,
    /// or [`ConfigurationError::DuplicateMethod`] when two methods share a name.
    pub fn build<S>(
        &self,
        methods: impl IntoIterator<Item = MethodDescriptor>,
        service: Arc<S>,
    ) -> Result<Repository<S>, ConfigurationError>
    where
        S: GraphExecutionService + ?Sized,
    {
        let methods: Vec<Arc<MethodDescriptor>> = methods.into_iter().map(Arc::new).collect();

        let mut seen = HashMap::new();
        for method in &methods {
            if seen.insert(method.name(), method.id()).is_some() {
                return Err(ConfigurationError::DuplicateMethod(method.id().clone()));
            }
        }

        let lookup = QueryLookupStrategy::new(
            AnnotationCache::build(
                Arc::clone(&self.annotations),
                methods.iter().map(|m| m.as_ref()),
            ),
            Arc::clone(&self.named_queries),
            Arc::clone(&self.deriver),
            self.binder,
        );

        let queries = methods
            .into_iter()
            .map(|method| {
                let name = method.name().to_string();
                lookup.resolve(method).map(|query| (name, query))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        tracing::info!(
            methods = queries.len(),
            substitution = ?self.binder.policy(),
            "Assembled repository"
        );

        Ok(Repository { queries, service })
    }
}

/// A set of resolved repository methods bound to an execution service.
pub struct Repository<S: GraphExecutionService + ?Sized> {
    queries: HashMap<String, RepositoryQuery>,
    service: Arc<S>,
}

impl<S: GraphExecutionService + ?Sized> Repository<S> {
    /// Runs the method called `method` with the given arguments.
    ///
    /// # Errors
    ///
    /// - [`QueryError::UnknownMethod`] when no such method was declared
    /// - [`QueryError::Binding`] when the arguments cannot be bound
    /// - [`QueryError::Unsupported`] for delete queries
    /// - [`QueryError::Execution`] and [`QueryError::Mapping`] from running
    ///   the query
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        method: &str,
        accessor: &ParameterValueAccessor,
    ) -> Result<QueryResult<T>, QueryError> {
        let query = self
            .query(method)
            .ok_or_else(|| QueryError::UnknownMethod(method.to_string()))?;
        query.execute(self.service.as_ref(), accessor).await
    }

    /// The resolved query of `method`.
    pub fn query(&self, method: &str) -> Option<&RepositoryQuery> {
        self.queries.get(method)
    }

    /// Names of the declared methods, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }
}
