//! Execution strategies and result dispatch.

use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::QueryError;
use crate::graph::{GraphExecutionService, Row, RowStream};
use crate::query::method::{DomainType, ReturnShape};
use crate::query::object::Statement;
use crate::query::parameter::Pageable;

/// How the rows of a query are turned into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    Find,
    Count,
    Exists,
    Delete,
}

impl ExecutionStrategy {
    /// Strategy implied by the first word of a method name (`count_by_..`,
    /// `existsByName`, `delete`). The keyword must be followed by `_`, an
    /// uppercase letter or the end of the name, so `countries_by_region`
    /// finds. Anything else finds.
    pub fn from_method_name(name: &str) -> Self {
        const PREFIXES: [(&str, ExecutionStrategy); 4] = [
            ("count", ExecutionStrategy::Count),
            ("exists", ExecutionStrategy::Exists),
            ("delete", ExecutionStrategy::Delete),
            ("remove", ExecutionStrategy::Delete),
        ];

        PREFIXES
            .iter()
            .find(|(keyword, _)| {
                name.strip_prefix(keyword).is_some_and(|rest| {
                    rest.chars()
                        .next()
                        .map_or(true, |c| c == '_' || c.is_ascii_uppercase())
                })
            })
            .map_or(Self::Find, |(_, strategy)| *strategy)
    }
}

/// One page of entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// The page that was requested; `None` when the call was unpaged.
    pub pageable: Option<Pageable>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Typed outcome of a repository call.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<T> {
    One(Option<T>),
    Many(Vec<T>),
    Page(Page<T>),
    Count(u64),
    Exists(bool),
}

impl<T> QueryResult<T> {
    /// The entity of a single-entity result.
    pub fn into_one(self) -> Option<T> {
        match self {
            QueryResult::One(entity) => entity,
            QueryResult::Many(entities) => entities.into_iter().next(),
            QueryResult::Page(page) => page.content.into_iter().next(),
            QueryResult::Count(_) | QueryResult::Exists(_) => None,
        }
    }

    /// The entities of an entity result, in row order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            QueryResult::One(entity) => entity.into_iter().collect(),
            QueryResult::Many(entities) => entities,
            QueryResult::Page(page) => page.content,
            QueryResult::Count(_) | QueryResult::Exists(_) => Vec::new(),
        }
    }
}

/// Sends statements to a [`GraphExecutionService`] and shapes the rows.
pub struct Dispatcher<'a, S: GraphExecutionService + ?Sized> {
    service: &'a S,
}

impl<'a, S: GraphExecutionService + ?Sized> Dispatcher<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Executes `statement` and shapes its rows according to `strategy` and
    /// `shape`.
    ///
    /// Script statements go to [`GraphExecutionService::execute_raw`], query
    /// objects to [`GraphExecutionService::execute`].
    ///
    /// # Errors
    ///
    /// - [`QueryError::Unsupported`] for [`ExecutionStrategy::Delete`]; the
    ///   service is not called
    /// - [`QueryError::Execution`] with the service's error, unchanged
    /// - [`QueryError::Mapping`] when a row does not fit `T`
    pub async fn execute<T: DeserializeOwned>(
        &self,
        statement: Statement,
        domain_type: &DomainType,
        strategy: ExecutionStrategy,
        shape: ReturnShape,
        pageable: Option<Pageable>,
    ) -> Result<QueryResult<T>, QueryError> {
        match strategy {
            ExecutionStrategy::Delete => Err(QueryError::Unsupported(format!(
                "delete queries are not supported (query: {})",
                statement.text()
            ))),
            ExecutionStrategy::Find => {
                let rows = self.rows(&statement, domain_type).await?;
                match shape {
                    ReturnShape::Single => {
                        let first = rows.into_first().await?;
                        Ok(QueryResult::One(
                            first.map(|row| row.to_entity::<T>()).transpose()?,
                        ))
                    }
                    ReturnShape::Collection => Ok(QueryResult::Many(rows.into_entities().await?)),
                    ReturnShape::Page => Ok(QueryResult::Page(Page {
                        content: rows.into_entities().await?,
                        pageable,
                    })),
                }
            }
            ExecutionStrategy::Count => {
                let rows = self.rows(&statement, domain_type).await?.collect().await?;
                Ok(QueryResult::Count(count_of(&rows)?))
            }
            ExecutionStrategy::Exists => {
                let rows = self.rows(&statement, domain_type).await?.collect().await?;
                Ok(QueryResult::Exists(exists_of(&rows)))
            }
        }
    }

    async fn rows(
        &self,
        statement: &Statement,
        domain_type: &DomainType,
    ) -> Result<Rows<'a>, QueryError> {
        let service: &'a S = self.service;
        let stream = match statement {
            Statement::Script(raw) => service.execute_raw(raw, domain_type).await?,
            Statement::Object(query) => service.execute(query, domain_type).await?,
        };
        Ok(Rows(stream))
    }
}

struct Rows<'a>(RowStream<'a>);

impl Rows<'_> {
    async fn collect(self) -> Result<Vec<Row>, QueryError> {
        Ok(self.0.try_collect().await?)
    }

    async fn into_first(mut self) -> Result<Option<Row>, QueryError> {
        Ok(self.0.next().await.transpose()?)
    }

    async fn into_entities<T: DeserializeOwned>(self) -> Result<Vec<T>, QueryError> {
        self.collect()
            .await?
            .iter()
            .map(|row| row.to_entity::<T>())
            .collect()
    }
}

/// A lone row with a lone integer column is the count itself; anything else
/// counts rows.
fn count_of(rows: &[Row]) -> Result<u64, QueryError> {
    match rows {
        [row] => match row.single_value() {
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .ok_or_else(|| QueryError::Mapping(format!("count is not a non-negative integer: {}", n))),
            _ => Ok(1),
        },
        _ => Ok(rows.len() as u64),
    }
}

fn exists_of(rows: &[Row]) -> bool {
    match rows {
        [row] => match row.single_value() {
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => true,
        },
        _ => !rows.is_empty(),
    }
}
