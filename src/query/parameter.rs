//! Runtime arguments of a repository call: values, paging and sort.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A page request expressed as an element offset and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    pub offset: u64,
    pub page_size: u64,
}

impl Pageable {
    pub fn new(offset: u64, page_size: u64) -> Self {
        Self { offset, page_size }
    }

    /// Inclusive Gremlin range clause `[offset..last]`, or `None` for an
    /// empty page size, which means "unpaged".
    pub fn range_clause(&self) -> Option<String> {
        if self.page_size == 0 {
            return None;
        }
        let last = self.offset.saturating_add(self.page_size - 1);
        Some(format!("[{}..{}]", self.offset, last))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

/// Ordered list of sort criteria.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(property: &str, direction: Direction) -> Self {
        Self::unsorted().and(property, direction)
    }

    pub fn and(mut self, property: &str, direction: Direction) -> Self {
        self.orders.push(Order {
            property: property.to_string(),
            direction,
        });
        self
    }

    /// Appends the criteria of `other` after this sort's criteria.
    pub fn merge(mut self, other: &Sort) -> Self {
        self.orders.extend(other.orders.iter().cloned());
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }
}

/// Argument values of one repository call.
///
/// `values` holds the bindable arguments in the order of the method's
/// bindable parameters; paging and sort arguments travel separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValueAccessor {
    pub values: Vec<JsonValue>,
    pub pageable: Option<Pageable>,
    pub sort: Sort,
}

impl ParameterValueAccessor {
    pub fn new(values: Vec<JsonValue>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn with_pageable(mut self, pageable: Pageable) -> Self {
        self.pageable = Some(pageable);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Returns the value at bindable position `index`.
    pub fn value(&self, index: usize) -> Option<&JsonValue> {
        self.values.get(index)
    }

    /// The page request, ignoring empty page sizes.
    pub fn paging(&self) -> Option<Pageable> {
        self.pageable.filter(|p| p.page_size > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_clause_is_inclusive() {
        assert_eq!(
            Pageable::new(10, 5).range_clause().as_deref(),
            Some("[10..14]")
        );
        assert_eq!(Pageable::new(0, 1).range_clause().as_deref(), Some("[0..0]"));
    }

    #[test]
    fn test_zero_page_size_is_unpaged() {
        assert_eq!(Pageable::new(3, 0).range_clause(), None);
        let accessor = ParameterValueAccessor::default().with_pageable(Pageable::new(3, 0));
        assert_eq!(accessor.paging(), None);
    }

    #[test]
    fn test_sort_merge_keeps_order() {
        let sort = Sort::by("name", Direction::Asc).merge(&Sort::by("age", Direction::Desc));
        let properties: Vec<_> = sort.orders().iter().map(|o| o.property.as_str()).collect();
        assert_eq!(properties, vec!["name", "age"]);
        assert!(sort.is_sorted());
        assert!(!Sort::unsorted().is_sorted());
    }

    #[test]
    fn test_accessor_value_lookup() {
        let accessor = ParameterValueAccessor::new(vec![json!("alice"), json!(3)]);
        assert_eq!(accessor.value(1), Some(&json!(3)));
        assert_eq!(accessor.value(2), None);
    }
}
