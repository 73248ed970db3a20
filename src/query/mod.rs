//! Query resolution and parameter binding for repository methods.
//!
//! # Architecture
//!
//! A repository method flows through these pieces:
//!
//! - [`MethodDescriptor`] - what the method is called, its parameters and return shape
//! - [`AnnotationCache`] - the query text and flags declared on the method
//! - [`QueryLookupStrategy`] - picks named, annotated or derived execution
//! - [`QueryTemplate`] - the declared text split into text and placeholder slots
//! - [`Binder`] - fills the slots with call arguments
//! - [`QueryObject`] / [`RawQuery`] - what is handed to the store
//! - [`Dispatcher`] - runs the statement and shapes rows into a [`QueryResult`]
//!
//! Everything up to the dispatcher is synchronous and performs no I/O.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use gremlin_repository::query;
//! use gremlin_repository::query::{
//!     AnnotationCache, Binder, DomainType, MethodDescriptor, NamedQueries, NoDerivation,
//!     ParameterValueAccessor, QueryLookupStrategy, StaticAnnotationSource,
//! };
//! use serde_json::json;
//!
//! let method = Arc::new(
//!     MethodDescriptor::builder("PersonRepository", "find_by_name", DomainType::new("Person"))
//!         .param("name")
//!         .build(),
//! );
//! let source = StaticAnnotationSource::new()
//!     .register("PersonRepository", "find_by_name", query!("g.V().has('name', ?)"));
//!
//! let lookup = QueryLookupStrategy::new(
//!     AnnotationCache::build(Arc::new(source), [method.as_ref()]),
//!     Arc::new(NamedQueries::new()),
//!     Arc::new(NoDerivation),
//!     Binder::default(),
//! );
//!
//! let query = lookup.resolve(method).unwrap();
//! let statement = query
//!     .materialize(&ParameterValueAccessor::new(vec![json!("alice")]))
//!     .unwrap();
//! assert_eq!(statement.text(), "g.V().has('name', alice)");
//! ```

#[macro_use]
mod macros;

mod annotation;
mod binder;
mod execution;
mod expression;
mod lookup;
mod method;
mod object;
mod parameter;
mod template;

pub use annotation::{AnnotationCache, AnnotationSource, DeclaredQuery, StaticAnnotationSource};
pub use binder::{gremlin_literal, literal_text, Binder, BindingContext, BoundText, SubstitutionPolicy};
pub use execution::{Dispatcher, ExecutionStrategy, Page, QueryResult};
pub use expression::{EvaluationContext, Expression};
pub use lookup::{
    DerivedQuery, MethodNameQueryDeriver, NamedQueries, NamedQueryRegistry, NoDerivation,
    QueryLookupStrategy, RepositoryQuery, StringQuery,
};
pub use method::{
    DomainType, MethodDescriptor, MethodDescriptorBuilder, MethodId, Parameter, ParameterKind,
    ReturnShape,
};
pub use object::{QueryObject, RawQuery, Statement};
pub use parameter::{Direction, Order, Pageable, ParameterValueAccessor, Sort};
pub use template::{ParameterBinding, QueryTemplate, SLOT_TOKEN_PREFIX};
