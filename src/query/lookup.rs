//! Resolving repository methods into executable queries.
//!
//! Every method resolves to exactly one [`RepositoryQuery`], chosen in this
//! order:
//!
//! 1. **Named**: a query registered under `{DomainType}.{method}`.
//! 2. **Annotated**: query text declared on the method itself.
//! 3. **Derived**: a query object built from the method name by a
//!    [`MethodNameQueryDeriver`].
//!
//! Resolution happens once, when the repository is assembled. Templates are
//! parsed and checked against the method's parameters at that point, so a
//! badly declared method fails the build instead of its first call.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{BindingError, ConfigurationError, QueryError};
use crate::graph::GraphExecutionService;
use crate::query::annotation::{AnnotationCache, DeclaredQuery};
use crate::query::binder::{Binder, BindingContext};
use crate::query::execution::{Dispatcher, ExecutionStrategy, QueryResult};
use crate::query::method::MethodDescriptor;
use crate::query::object::{QueryObject, RawQuery, Statement};
use crate::query::parameter::ParameterValueAccessor;
use crate::query::template::QueryTemplate;

/// Externally registered query texts, keyed by `{DomainType}.{method}`.
pub trait NamedQueryRegistry: Send + Sync {
    fn has_query(&self, name: &str) -> bool;
    fn get_query(&self, name: &str) -> Option<&str>;
}

/// Map-backed [`NamedQueryRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedQueries {
    queries: HashMap<String, String>,
}

impl NamedQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `text` under `name`, replacing any previous text.
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.queries.insert(name.into(), text.into());
        self
    }
}

impl From<HashMap<String, String>> for NamedQueries {
    fn from(queries: HashMap<String, String>) -> Self {
        Self { queries }
    }
}

impl NamedQueryRegistry for NamedQueries {
    fn has_query(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    fn get_query(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(String::as_str)
    }
}

/// Builds query objects from method names.
pub trait MethodNameQueryDeriver: Send + Sync {
    /// Builds the query object for one call of `method`.
    fn derive(
        &self,
        method: &MethodDescriptor,
        accessor: &ParameterValueAccessor,
    ) -> Result<QueryObject, BindingError>;

    /// Strategy used for derived queries of `method`.
    fn execution_strategy(&self, method: &MethodDescriptor) -> ExecutionStrategy {
        ExecutionStrategy::from_method_name(method.name())
    }
}

/// Deriver for repositories that declare every query explicitly.
///
/// Methods that end up derived fail on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDerivation;

impl MethodNameQueryDeriver for NoDerivation {
    fn derive(
        &self,
        method: &MethodDescriptor,
        _accessor: &ParameterValueAccessor,
    ) -> Result<QueryObject, BindingError> {
        Err(BindingError::Derivation(format!(
            "no query declared for {} and no method name deriver configured",
            method.id()
        )))
    }
}

/// A query backed by a template, either named or declared on the method.
#[derive(Debug, Clone)]
pub struct StringQuery {
    method: Arc<MethodDescriptor>,
    template: QueryTemplate,
    context: BindingContext,
    fields: Option<(QueryTemplate, BindingContext)>,
    native: bool,
    strategy: ExecutionStrategy,
    binder: Binder,
}

impl StringQuery {
    /// Parses `text` (and the declared field specification, if any) and checks
    /// both against the method's parameters.
    pub fn new(
        method: Arc<MethodDescriptor>,
        text: &str,
        declared: Option<&DeclaredQuery>,
        strategy: ExecutionStrategy,
        binder: Binder,
    ) -> Result<Self, ConfigurationError> {
        let template = QueryTemplate::parse(text)?;
        let context = BindingContext::new(&method, &template)?;
        let native = declared.is_some_and(|d| d.native);

        let fields = match declared.and_then(|d| d.fields.as_deref()) {
            Some(spec) if !spec.trim().is_empty() => {
                if native {
                    tracing::warn!(
                        method = %method.id(),
                        "Field specification ignored on native query"
                    );
                    None
                } else {
                    let fields = QueryTemplate::parse(spec)?;
                    let fields_context = BindingContext::new(&method, &fields)?;
                    Some((fields, fields_context))
                }
            }
            _ => None,
        };

        Ok(Self {
            method,
            template,
            context,
            fields,
            native,
            strategy,
            binder,
        })
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Binds the call's arguments and assembles the statement to execute.
    ///
    /// Find queries with a non-empty page get the range clause appended.
    /// Sort criteria travel on the query object; native scripts cannot carry
    /// them.
    pub fn materialize(&self, accessor: &ParameterValueAccessor) -> Result<Statement, BindingError> {
        let bound = self.binder.bind(&self.template, accessor, &self.context)?;
        let paging = accessor
            .paging()
            .filter(|_| self.strategy == ExecutionStrategy::Find);

        if self.native {
            if accessor.sort.is_sorted() {
                return Err(BindingError::SortOnNativeQuery);
            }
            let mut raw = RawQuery::from(bound);
            if let Some(range) = paging.and_then(|p| p.range_clause()) {
                raw.text.push_str(&range);
            }
            return Ok(Statement::Script(raw));
        }

        let mut query = QueryObject::from_bound(bound);
        if let Some((fields, context)) = &self.fields {
            query = query.with_fields(self.binder.bind_fields(fields, accessor, context)?);
        }
        query = query.with_sort(&accessor.sort);
        if let Some(pageable) = paging {
            query = query.with_page(pageable);
        }
        Ok(Statement::Object(query))
    }
}

/// A query whose object is built per call by a [`MethodNameQueryDeriver`].
#[derive(Clone)]
pub struct DerivedQuery {
    method: Arc<MethodDescriptor>,
    deriver: Arc<dyn MethodNameQueryDeriver>,
    strategy: ExecutionStrategy,
}

impl DerivedQuery {
    pub fn new(
        method: Arc<MethodDescriptor>,
        deriver: Arc<dyn MethodNameQueryDeriver>,
        strategy: ExecutionStrategy,
    ) -> Self {
        Self {
            method,
            deriver,
            strategy,
        }
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn materialize(&self, accessor: &ParameterValueAccessor) -> Result<Statement, BindingError> {
        self.deriver
            .derive(&self.method, accessor)
            .map(Statement::Object)
    }
}

impl std::fmt::Debug for DerivedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedQuery")
            .field("method", &self.method.id())
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// The executable form of one repository method.
#[derive(Debug, Clone)]
pub enum RepositoryQuery {
    Named(StringQuery),
    Annotated(StringQuery),
    Derived(DerivedQuery),
}

impl RepositoryQuery {
    pub fn method(&self) -> &MethodDescriptor {
        match self {
            RepositoryQuery::Named(q) | RepositoryQuery::Annotated(q) => q.method(),
            RepositoryQuery::Derived(q) => q.method(),
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        match self {
            RepositoryQuery::Named(q) | RepositoryQuery::Annotated(q) => q.strategy(),
            RepositoryQuery::Derived(q) => q.strategy(),
        }
    }

    /// Short label of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RepositoryQuery::Named(_) => "named",
            RepositoryQuery::Annotated(_) => "annotated",
            RepositoryQuery::Derived(_) => "derived",
        }
    }

    /// Builds the statement for one call.
    pub fn materialize(&self, accessor: &ParameterValueAccessor) -> Result<Statement, BindingError> {
        match self {
            RepositoryQuery::Named(q) | RepositoryQuery::Annotated(q) => q.materialize(accessor),
            RepositoryQuery::Derived(q) => q.materialize(accessor),
        }
    }

    /// Binds `accessor`, executes the statement on `service` and shapes the
    /// rows into the method's return type.
    ///
    /// Delete methods fail with [`QueryError::Unsupported`] before any
    /// argument is bound.
    pub async fn execute<T, S>(
        &self,
        service: &S,
        accessor: &ParameterValueAccessor,
    ) -> Result<QueryResult<T>, QueryError>
    where
        T: DeserializeOwned,
        S: GraphExecutionService + ?Sized,
    {
        let method = self.method();
        if self.strategy() == ExecutionStrategy::Delete {
            return Err(QueryError::Unsupported(format!(
                "delete queries are not supported (method: {})",
                method.id()
            )));
        }

        let statement = self.materialize(accessor)?;
        tracing::debug!(
            method = %method.id(),
            kind = self.kind(),
            strategy = ?self.strategy(),
            query = %statement.text(),
            "Executing repository query"
        );

        Dispatcher::new(service)
            .execute(
                statement,
                method.domain_type(),
                self.strategy(),
                method.return_shape(),
                accessor.paging(),
            )
            .await
    }
}

/// Chooses how each repository method is executed.
pub struct QueryLookupStrategy {
    annotations: AnnotationCache,
    named_queries: Arc<dyn NamedQueryRegistry>,
    deriver: Arc<dyn MethodNameQueryDeriver>,
    binder: Binder,
}

impl QueryLookupStrategy {
    pub fn new(
        annotations: AnnotationCache,
        named_queries: Arc<dyn NamedQueryRegistry>,
        deriver: Arc<dyn MethodNameQueryDeriver>,
        binder: Binder,
    ) -> Self {
        Self {
            annotations,
            named_queries,
            deriver,
            binder,
        }
    }

    /// Resolves `method` into its executable query.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::AmbiguousStrategy`] when the declared flags
    ///   conflict
    /// - template and positional errors from parsing the query text
    /// - [`ConfigurationError::MissingNamedQuery`] when the registry reports
    ///   a name it cannot return text for
    pub fn resolve(&self, method: Arc<MethodDescriptor>) -> Result<RepositoryQuery, ConfigurationError> {
        let declared = self.annotations.lookup(method.id());
        let id = method.id().clone();

        let query = match self.resolve_named(&method, declared.as_deref())? {
            Some(named) => named,
            None => match declared.as_deref().filter(|d| d.has_text()) {
                Some(declared) => {
                    let strategy = declared.strategy(&id)?;
                    RepositoryQuery::Annotated(StringQuery::new(
                        method,
                        &declared.text,
                        Some(declared),
                        strategy,
                        self.binder,
                    )?)
                }
                None => {
                    let strategy = self.derived_strategy(&method, declared.as_deref())?;
                    RepositoryQuery::Derived(DerivedQuery::new(
                        method,
                        Arc::clone(&self.deriver),
                        strategy,
                    ))
                }
            },
        };

        tracing::debug!(
            method = %id,
            kind = query.kind(),
            strategy = ?query.strategy(),
            "Resolved repository query"
        );
        Ok(query)
    }

    fn resolve_named(
        &self,
        method: &Arc<MethodDescriptor>,
        declared: Option<&DeclaredQuery>,
    ) -> Result<Option<RepositoryQuery>, ConfigurationError> {
        let name = method.named_query_name();
        if !self.named_queries.has_query(&name) {
            return Ok(None);
        }

        let text = self
            .named_queries
            .get_query(&name)
            .ok_or_else(|| ConfigurationError::MissingNamedQuery(name.clone()))?;
        let strategy = match declared {
            Some(declared) => declared.strategy(method.id())?,
            None => ExecutionStrategy::Find,
        };

        Ok(Some(RepositoryQuery::Named(StringQuery::new(
            Arc::clone(method),
            text,
            declared,
            strategy,
            self.binder,
        )?)))
    }

    /// Declared flags win over the deriver's choice.
    fn derived_strategy(
        &self,
        method: &MethodDescriptor,
        declared: Option<&DeclaredQuery>,
    ) -> Result<ExecutionStrategy, ConfigurationError> {
        match declared.map(|d| d.strategy(method.id())).transpose()? {
            Some(strategy) if strategy != ExecutionStrategy::Find => Ok(strategy),
            _ => Ok(self.deriver.execution_strategy(method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::annotation::StaticAnnotationSource;
    use crate::query::binder::SubstitutionPolicy;
    use crate::query::method::DomainType;
    use crate::error::ExecutionError;
    use crate::graph::RowStream;
    use crate::query::parameter::{Direction, Pageable, Sort};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDeriver;

    impl MethodNameQueryDeriver for FixedDeriver {
        fn derive(
            &self,
            method: &MethodDescriptor,
            accessor: &ParameterValueAccessor,
        ) -> Result<QueryObject, BindingError> {
            let value = accessor
                .value(0)
                .cloned()
                .ok_or(BindingError::MissingArgument { index: 0 })?;
            Ok(QueryObject::new(format!("derived:{}", method.name())).param("arg0", value))
        }
    }

    fn method(name: &str) -> Arc<MethodDescriptor> {
        Arc::new(
            MethodDescriptor::builder("PersonRepository", name, DomainType::new("Person"))
                .param("name")
                .pageable()
                .sort()
                .build(),
        )
    }

    fn lookup(source: StaticAnnotationSource, named: NamedQueries) -> QueryLookupStrategy {
        let methods = [method("find_by_name"), method("count_by_name")];
        QueryLookupStrategy::new(
            AnnotationCache::build(Arc::new(source), methods.iter().map(|m| m.as_ref())),
            Arc::new(named),
            Arc::new(FixedDeriver),
            Binder::default(),
        )
    }

    fn alice() -> ParameterValueAccessor {
        ParameterValueAccessor::new(vec![json!("alice")])
    }

    #[test]
    fn test_named_query_beats_annotation() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('annotated', ?)"),
            ),
            NamedQueries::new().with("Person.find_by_name", "g.V().has('named', ?)"),
        );

        let query = strategy.resolve(method("find_by_name")).unwrap();
        assert!(matches!(query, RepositoryQuery::Named(_)));
        let statement = query.materialize(&alice()).unwrap();
        assert_eq!(statement.text(), "g.V().has('named', alice)");
    }

    #[test]
    fn test_named_query_takes_flags_from_declaration() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "count_by_name",
                DeclaredQuery::flags_only().count(),
            ),
            NamedQueries::new().with("Person.count_by_name", "g.V().has('name', ?).count()"),
        );

        let query = strategy.resolve(method("count_by_name")).unwrap();
        assert!(matches!(query, RepositoryQuery::Named(_)));
        assert_eq!(query.strategy(), ExecutionStrategy::Count);
    }

    #[test]
    fn test_annotated_query() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('name', ?)"),
            ),
            NamedQueries::new(),
        );

        let query = strategy.resolve(method("find_by_name")).unwrap();
        assert!(matches!(query, RepositoryQuery::Annotated(_)));
        assert_eq!(query.strategy(), ExecutionStrategy::Find);
    }

    #[test]
    fn test_blank_annotation_falls_through_to_derived() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("  "),
            ),
            NamedQueries::new(),
        );

        let query = strategy.resolve(method("find_by_name")).unwrap();
        assert!(matches!(query, RepositoryQuery::Derived(_)));
        let statement = query.materialize(&alice()).unwrap();
        assert_eq!(statement.text(), "derived:find_by_name");
    }

    #[test]
    fn test_derived_strategy_from_method_name() {
        let strategy = lookup(StaticAnnotationSource::new(), NamedQueries::new());
        let query = strategy.resolve(method("count_by_name")).unwrap();
        assert_eq!(query.strategy(), ExecutionStrategy::Count);
    }

    #[test]
    fn test_conflicting_flags_fail_resolution() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V()").count().delete(),
            ),
            NamedQueries::new(),
        );

        let err = strategy.resolve(method("find_by_name")).unwrap_err();
        assert!(matches!(err, ConfigurationError::AmbiguousStrategy { .. }));
    }

    #[test]
    fn test_positional_overflow_fails_resolution() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('a', ?).has('b', ?)"),
            ),
            NamedQueries::new(),
        );

        let err = strategy.resolve(method("find_by_name")).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::PositionalOverflow { declared: 1, used: 2, .. }
        ));
    }

    #[test]
    fn test_find_appends_page_and_carries_sort() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('name', ?)").fields("name, age"),
            ),
            NamedQueries::new(),
        );
        let query = strategy.resolve(method("find_by_name")).unwrap();
        let accessor = alice()
            .with_pageable(Pageable::new(10, 5))
            .with_sort(Sort::by("age", Direction::Desc));

        match query.materialize(&accessor).unwrap() {
            Statement::Object(object) => {
                assert_eq!(object.query_text, "g.V().has('name', alice)[10..14]");
                assert_eq!(object.fields.as_deref(), Some("name, age"));
                assert_eq!(object.sort, Sort::by("age", Direction::Desc));
                assert_eq!(object.pageable, Some(Pageable::new(10, 5)));
            }
            other => panic!("expected a query object, got {:?}", other),
        }
    }

    #[test]
    fn test_count_ignores_paging() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "count_by_name",
                DeclaredQuery::new("g.V().has('name', ?).count()").count(),
            ),
            NamedQueries::new(),
        );
        let query = strategy.resolve(method("count_by_name")).unwrap();
        let statement = query
            .materialize(&alice().with_pageable(Pageable::new(0, 10)))
            .unwrap();
        assert_eq!(statement.text(), "g.V().has('name', alice).count()");
    }

    #[test]
    fn test_native_query_is_a_script() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('name', ?)").native(),
            ),
            NamedQueries::new(),
        );
        let query = strategy.resolve(method("find_by_name")).unwrap();

        let statement = query.materialize(&alice()).unwrap();
        assert!(matches!(statement, Statement::Script(_)));

        let err = query
            .materialize(&alice().with_sort(Sort::by("name", Direction::Asc)))
            .unwrap_err();
        assert!(matches!(err, BindingError::SortOnNativeQuery));
    }

    #[test]
    fn test_quoted_policy_applies_to_resolved_queries() {
        let methods = [method("find_by_name")];
        let strategy = QueryLookupStrategy::new(
            AnnotationCache::build(
                Arc::new(StaticAnnotationSource::new().register(
                    "PersonRepository",
                    "find_by_name",
                    DeclaredQuery::new("g.V().has('name', ?0)"),
                )),
                methods.iter().map(|m| m.as_ref()),
            ),
            Arc::new(NamedQueries::new()),
            Arc::new(NoDerivation),
            Binder::new(SubstitutionPolicy::Quoted),
        );
        let query = strategy.resolve(method("find_by_name")).unwrap();
        let statement = query
            .materialize(&ParameterValueAccessor::new(vec![json!("o'neil")]))
            .unwrap();
        assert_eq!(statement.text(), r"g.V().has('name', 'o\'neil')");
    }

    struct PhantomRegistry;

    impl NamedQueryRegistry for PhantomRegistry {
        fn has_query(&self, _name: &str) -> bool {
            true
        }

        fn get_query(&self, _name: &str) -> Option<&str> {
            None
        }
    }

    struct UnreachableService {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl GraphExecutionService for UnreachableService {
        async fn execute(
            &self,
            _query: &QueryObject,
            _domain_type: &DomainType,
        ) -> Result<RowStream<'_>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn execute_raw(
            &self,
            _query: &RawQuery,
            _domain_type: &DomainType,
        ) -> Result<RowStream<'_>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    #[test]
    fn test_registry_without_text_is_missing_named_query() {
        let methods = [method("find_by_name")];
        let strategy = QueryLookupStrategy::new(
            AnnotationCache::build(
                Arc::new(StaticAnnotationSource::new()),
                methods.iter().map(|m| m.as_ref()),
            ),
            Arc::new(PhantomRegistry),
            Arc::new(FixedDeriver),
            Binder::default(),
        );

        let err = strategy.resolve(method("find_by_name")).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingNamedQuery("Person.find_by_name".to_string())
        );
    }

    #[test]
    fn test_native_find_appends_range_to_script() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('name', ?)").native(),
            ),
            NamedQueries::new(),
        );
        let query = strategy.resolve(method("find_by_name")).unwrap();

        match query
            .materialize(&alice().with_pageable(Pageable::new(10, 5)))
            .unwrap()
        {
            Statement::Script(raw) => {
                assert_eq!(raw.text, "g.V().has('name', alice)[10..14]");
                assert!(raw.text.ends_with("[10..14]"));
            }
            other => panic!("expected a script, got {:?}", other),
        }
    }

    #[test]
    fn test_native_query_drops_fields() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "find_by_name",
                DeclaredQuery::new("g.V().has('name', ?)")
                    .native()
                    .fields("name, :nobody"),
            ),
            NamedQueries::new(),
        );
        let query = strategy.resolve(method("find_by_name")).unwrap();

        match query.materialize(&alice()).unwrap() {
            Statement::Script(raw) => {
                assert_eq!(raw.text, "g.V().has('name', alice)");
                assert!(!raw.text.contains("name, "));
            }
            other => panic!("expected a script, got {:?}", other),
        }
    }

    #[test]
    fn test_derived_name_sharing_a_keyword_prefix_finds() {
        let strategy = lookup(StaticAnnotationSource::new(), NamedQueries::new());
        for name in ["countries_by_region", "deleted_accounts", "removed_items"] {
            let query = strategy.resolve(method(name)).unwrap();
            assert!(matches!(query, RepositoryQuery::Derived(_)));
            assert_eq!(query.strategy(), ExecutionStrategy::Find, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_delete_is_unsupported_before_binding() {
        let strategy = lookup(
            StaticAnnotationSource::new().register(
                "PersonRepository",
                "delete_by_name",
                DeclaredQuery::new("g.V().has('name', :who).drop()").delete(),
            ),
            NamedQueries::new(),
        );
        let query = strategy.resolve(method("delete_by_name")).unwrap();
        assert!(matches!(
            query.materialize(&alice()),
            Err(BindingError::UnknownParameter(_))
        ));

        let service = UnreachableService {
            calls: AtomicUsize::new(0),
        };
        let err = query
            .execute::<serde_json::Value, _>(&service, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_derived_delete_is_unsupported_without_deriver() {
        let methods = [method("delete_by_name")];
        let strategy = QueryLookupStrategy::new(
            AnnotationCache::build(
                Arc::new(StaticAnnotationSource::new()),
                methods.iter().map(|m| m.as_ref()),
            ),
            Arc::new(NamedQueries::new()),
            Arc::new(NoDerivation),
            Binder::default(),
        );
        let query = strategy.resolve(method("delete_by_name")).unwrap();

        let service = UnreachableService {
            calls: AtomicUsize::new(0),
        };
        let err = query
            .execute::<serde_json::Value, _>(&service, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_derivation_fails_at_call_time() {
        let err = NoDerivation
            .derive(&method("find_by_name"), &alice())
            .unwrap_err();
        assert!(matches!(err, BindingError::Derivation(_)));
    }
}
