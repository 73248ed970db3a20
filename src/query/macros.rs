//! Macro for concise query declarations in registration tables.

/// Builds a [`DeclaredQuery`](crate::query::DeclaredQuery) from query text and flags.
///
/// # Usage
///
/// ```ignore
/// use gremlin_repository::query;
///
/// // Plain find query
/// let q = query!("g.V().hasLabel('person').has('name', ?)");
///
/// // Flags: count, exists, delete, native
/// let q = query!("g.V().hasLabel('person').count()", count);
/// let q = query!("g.V().has('name', :name)", native, exists);
///
/// // With a field specification
/// let q = query!("g.V().hasLabel('person')", fields = "name, ?#{#extra}");
/// ```
#[macro_export]
macro_rules! query {
    // Text with a field specification and optional flags
    ($text:expr, fields = $fields:expr $(, $flag:ident)* $(,)?) => {
        $crate::query::DeclaredQuery::new($text).fields($fields)$(.$flag())*
    };
    // Text with optional flags
    ($text:expr $(, $flag:ident)* $(,)?) => {
        $crate::query::DeclaredQuery::new($text)$(.$flag())*
    };
}

#[cfg(test)]
mod tests {
    use crate::query::DeclaredQuery;

    #[test]
    fn test_query_macro_text_only() {
        let declared = query!("g.V()");
        assert_eq!(declared, DeclaredQuery::new("g.V()"));
    }

    #[test]
    fn test_query_macro_with_flags() {
        let declared = query!("g.V().count()", count, native);
        assert!(declared.count);
        assert!(declared.native);
        assert!(!declared.exists);
        assert!(!declared.delete);
    }

    #[test]
    fn test_query_macro_with_fields_and_trailing_comma() {
        let declared = query!("g.V()", fields = "name, age", exists,);
        assert_eq!(declared.fields.as_deref(), Some("name, age"));
        assert!(declared.exists);
    }
}
