//! Query template parsing.
//!
//! A template is Gremlin text containing placeholder markers. Parsing splits
//! it into literal text and numbered slots, one per marker, and records what
//! each slot is bound to:
//!
//! | Marker | Binding |
//! |--------|---------|
//! | `?` | [`ParameterBinding::Positional`], numbered 0.. in source order |
//! | `?N` | [`ParameterBinding::Positional`] with the explicit index `N` |
//! | `:name` | [`ParameterBinding::Named`] |
//! | `?#{expr}`, `:#{expr}` | [`ParameterBinding::Expression`] |
//!
//! Markers inside string literals are ignored. Outside them every bare `?`
//! is a marker, except in `?.` and `?:`. A Groovy ternary such as
//! `it ? 1 : 2` or a `?` inside a `//` comment therefore counts as a
//! positional and needs a bindable parameter. Write ternaries in a closure
//! body as `if`/`else`, or keep the `?` inside a string literal.
//!
//! In the normalized text every
//! marker is replaced by a slot token (`$__p0`, `$__p1`, ...). Substitution
//! works on the parsed slots rather than on the token text, so a bound value
//! that happens to look like a marker or a token is never expanded again.
//!
//! # Example
//!
//! ```
//! use gremlin_repository::query::{ParameterBinding, QueryTemplate};
//!
//! let template = QueryTemplate::parse("g.V().has('name', ?).has('age', :age)").unwrap();
//!
//! assert_eq!(template.normalized(), "g.V().has('name', $__p0).has('age', $__p1)");
//! assert_eq!(
//!     template.bindings(),
//!     &[ParameterBinding::Positional(0), ParameterBinding::Named("age".to_string())]
//! );
//! ```

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::ConfigurationError;
use crate::query::expression::Expression;

#[derive(Parser)]
#[grammar = "query/template.pest"]
struct TemplateParser;

/// Prefix of the slot tokens in a normalized template.
pub const SLOT_TOKEN_PREFIX: &str = "$__p";

/// What a placeholder slot is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterBinding {
    /// Bindable argument at this position.
    Positional(usize),
    /// Argument of the parameter declared with this name.
    Named(String),
    /// Value computed from the arguments.
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Slot(usize),
}

/// A parsed query template. Immutable and cheap to share.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTemplate {
    source: String,
    normalized: String,
    segments: Vec<Segment>,
    bindings: Vec<ParameterBinding>,
    bare_positionals: usize,
}

impl QueryTemplate {
    /// Parses a raw template.
    ///
    /// Parsing only depends on `raw`; the same input always yields an equal
    /// template.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for unterminated string literals or
    /// expressions and for malformed expression bodies.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let root = TemplateParser::parse(Rule::template, raw)
            .map_err(|e| ConfigurationError::MalformedTemplate {
                template: raw.to_string(),
                message: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ConfigurationError::MalformedTemplate {
                template: raw.to_string(),
                message: "empty parse".to_string(),
            })?;

        let mut builder = TemplateBuilder::default();
        for pair in root.into_inner() {
            builder.push(pair, raw)?;
        }

        let template = builder.finish(raw);
        tracing::trace!(
            template = %template.source,
            slots = template.bindings.len(),
            "Parsed query template"
        );
        Ok(template)
    }

    /// The template as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The template with every marker replaced by its slot token.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Bindings in slot order.
    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Number of bare `?` markers.
    pub fn bare_positionals(&self) -> usize {
        self.bare_positionals
    }

    /// Slot token for slot `index`, as it appears in [`normalized`](Self::normalized).
    pub fn slot_token(index: usize) -> String {
        format!("{}{}", SLOT_TOKEN_PREFIX, index)
    }

    /// Rebuilds the text, asking `fill` for the replacement of each slot.
    pub(crate) fn render<E>(
        &self,
        mut fill: impl FnMut(usize) -> Result<String, E>,
    ) -> Result<String, E> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(index) => out.push_str(&fill(*index)?),
            }
        }
        Ok(out)
    }
}

#[derive(Default)]
struct TemplateBuilder {
    segments: Vec<Segment>,
    bindings: Vec<ParameterBinding>,
    bare_positionals: usize,
}

impl TemplateBuilder {
    fn push(&mut self, pair: Pair<Rule>, raw: &str) -> Result<(), ConfigurationError> {
        match pair.as_rule() {
            Rule::positional => {
                let index = match pair.into_inner().next() {
                    Some(index) => index.as_str().parse().map_err(|_| {
                        ConfigurationError::MalformedTemplate {
                            template: raw.to_string(),
                            message: format!("positional index `{}` out of range", index.as_str()),
                        }
                    })?,
                    None => {
                        self.bare_positionals += 1;
                        self.bare_positionals - 1
                    }
                };
                self.slot(ParameterBinding::Positional(index));
            }
            Rule::named => {
                let name = pair
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                self.slot(ParameterBinding::Named(name));
            }
            Rule::expression => {
                let body = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                let expression = Expression::parse(body)?;
                self.slot(ParameterBinding::Expression(expression));
            }
            Rule::open_expression => {
                return Err(ConfigurationError::UnterminatedExpression {
                    template: raw.to_string(),
                    offset: pair.as_span().start(),
                });
            }
            Rule::quoted | Rule::text => self.text(pair.as_str()),
            _ => {}
        }
        Ok(())
    }

    fn slot(&mut self, binding: ParameterBinding) {
        self.segments.push(Segment::Slot(self.bindings.len()));
        self.bindings.push(binding);
    }

    fn text(&mut self, text: &str) {
        match self.segments.last_mut() {
            Some(Segment::Text(last)) => last.push_str(text),
            _ => self.segments.push(Segment::Text(text.to_string())),
        }
    }

    fn finish(self, raw: &str) -> QueryTemplate {
        let normalized = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Slot(index) => QueryTemplate::slot_token(*index),
            })
            .collect();

        QueryTemplate {
            source: raw.to_string(),
            normalized,
            segments: self.segments,
            bindings: self.bindings,
            bare_positionals: self.bare_positionals,
        }
    }
}
