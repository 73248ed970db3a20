//! Materialized queries handed to the execution service.

use serde_json::Value as JsonValue;

use crate::graph::Params;
use crate::query::binder::BoundText;
use crate::query::parameter::{Pageable, Sort};

/// A fully bound query with its projection, sort and paging directives.
///
/// Built fresh for every call and consumed by a single execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryObject {
    pub query_text: String,
    /// Bound field/projection specification.
    pub fields: Option<String>,
    pub sort: Sort,
    pub pageable: Option<Pageable>,
    /// Script bindings for parameterized substitution.
    pub params: Params,
}

impl QueryObject {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Self::default()
        }
    }

    /// Builds a query object from bound text.
    pub fn from_bound(bound: BoundText) -> Self {
        Self {
            query_text: bound.text,
            params: bound.params,
            ..Self::default()
        }
    }

    /// Attaches a bound field specification, merging its bindings.
    pub fn with_fields(mut self, fields: BoundText) -> Self {
        self.params.extend(fields.params);
        self.fields = Some(fields.text);
        self
    }

    /// Merges sort criteria after any already present.
    pub fn with_sort(mut self, sort: &Sort) -> Self {
        self.sort = std::mem::take(&mut self.sort).merge(sort);
        self
    }

    /// Records the page and appends its range clause to the query text.
    pub fn with_page(mut self, pageable: Pageable) -> Self {
        if let Some(range) = pageable.range_clause() {
            self.query_text.push_str(&range);
            self.pageable = Some(pageable);
        }
        self
    }

    pub fn param(mut self, name: &str, value: JsonValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }
}

/// A native script sent to the store verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery {
    pub text: String,
    pub params: Params,
}

impl From<BoundText> for RawQuery {
    fn from(bound: BoundText) -> Self {
        Self {
            text: bound.text,
            params: bound.params,
        }
    }
}

/// What a repository query hands to the dispatcher for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Native script, executed as-is.
    Script(RawQuery),
    /// Structured query object.
    Object(QueryObject),
}

impl Statement {
    /// The query text that will be sent to the store.
    pub fn text(&self) -> &str {
        match self {
            Statement::Script(raw) => &raw.text,
            Statement::Object(query) => &query.query_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parameter::Direction;
    use serde_json::json;

    #[test]
    fn test_with_page_appends_range() {
        let query = QueryObject::new("g.V()").with_page(Pageable::new(10, 5));
        assert_eq!(query.query_text, "g.V()[10..14]");
        assert_eq!(query.pageable, Some(Pageable::new(10, 5)));
    }

    #[test]
    fn test_with_page_ignores_empty_page() {
        let query = QueryObject::new("g.V()").with_page(Pageable::new(10, 0));
        assert_eq!(query.query_text, "g.V()");
        assert_eq!(query.pageable, None);
    }

    #[test]
    fn test_sort_is_not_spliced_into_text() {
        let query = QueryObject::new("g.V()").with_sort(&Sort::by("name", Direction::Desc));
        assert_eq!(query.query_text, "g.V()");
        assert_eq!(query.sort.orders().len(), 1);
    }

    #[test]
    fn test_fields_merge_params() {
        let mut params = Params::new();
        params.insert("_f0".to_string(), json!("x"));
        let query = QueryObject::new("g.V()")
            .param("a", json!(1))
            .with_fields(BoundText {
                text: "name, _f0".to_string(),
                params,
            });
        assert_eq!(query.fields.as_deref(), Some("name, _f0"));
        assert_eq!(query.params.len(), 2);
    }
}
