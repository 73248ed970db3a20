//! Row and streaming types for query results.

use crate::error::{ExecutionError, QueryError};
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::pin::Pin;

/// Script bindings sent alongside a query.
///
/// A map of binding names to JSON values. Only populated when values are
/// passed out of band instead of being rendered into the query text.
pub type Params = HashMap<String, JsonValue>;

/// A stream of rows from a query result.
///
/// Uses `futures::Stream` so backends can hand rows over as they arrive.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, ExecutionError>> + Send + 'a>>;

/// A single result row.
///
/// Contains column values as JSON. The dispatcher maps a row either as a
/// whole entity via [`Row::to_entity`] or as a scalar via [`Row::single_value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    /// Creates a new row from a map of column names to values.
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Maps the whole row onto a domain type, treating columns as fields.
    pub fn to_entity<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        let object: Map<String, JsonValue> = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(JsonValue::Object(object))
            .map_err(|e| QueryError::Mapping(format!("failed to map row: {}", e)))
    }

    /// Returns the value of the only column, if the row has exactly one.
    pub fn single_value(&self) -> Option<&JsonValue> {
        if self.data.len() == 1 {
            self.data.values().next()
        } else {
            None
        }
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

impl<const N: usize> From<[(&str, JsonValue); N]> for Row {
    fn from(columns: [(&str, JsonValue); N]) -> Self {
        Self::new(
            columns
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn test_row_to_entity() {
        let row = Row::from([("name", json!("alice")), ("age", json!(31))]);

        let person: Person = row.to_entity().unwrap();
        assert_eq!(
            person,
            Person {
                name: "alice".to_string(),
                age: 31
            }
        );
    }

    #[test]
    fn test_row_to_entity_type_mismatch() {
        let row = Row::from([("name", json!("alice")), ("age", json!("old"))]);

        let result: Result<Person, _> = row.to_entity();
        assert!(matches!(result, Err(QueryError::Mapping(_))));
    }

    #[test]
    fn test_single_value() {
        let row = Row::from([("count", json!(3))]);
        assert_eq!(row.single_value(), Some(&json!(3)));

        let row = Row::from([("a", json!(1)), ("b", json!(2))]);
        assert_eq!(row.single_value(), None);
    }
}
