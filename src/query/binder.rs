//! Binding call arguments into parsed templates.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{BindingError, ConfigurationError};
use crate::graph::Params;
use crate::query::expression::EvaluationContext;
use crate::query::method::MethodDescriptor;
use crate::query::parameter::ParameterValueAccessor;
use crate::query::template::{ParameterBinding, QueryTemplate};

/// How bound values are written into query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionPolicy {
    /// Values are inserted as-is: strings without quotes, everything else in
    /// JSON form. `has('name', ?)` with `alice` becomes `has('name', alice)`.
    ///
    /// The template author is responsible for quoting; argument text reaches
    /// the script unescaped, so untrusted input can change the traversal.
    #[default]
    Literal,
    /// Values are rendered as escaped Gremlin literals (`'alice'`, `[1, 2]`,
    /// `['k': 'v']`).
    Quoted,
    /// Slots become script binding names (`_p0`, `_p1`, ...; `_f0`, ... in
    /// field specifications) and the values travel in [`BoundText::params`].
    Parameterized,
}

const QUERY_BINDING_PREFIX: &str = "_p";
const FIELDS_BINDING_PREFIX: &str = "_f";

/// A bindable parameter as seen by one template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BindableParameter {
    index: usize,
    name: Option<String>,
}

/// A template's bindings checked against the method that owns it.
///
/// Built once per template when the repository is assembled and reused for
/// every call.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingContext {
    parameters: Vec<BindableParameter>,
    bindings: Vec<ParameterBinding>,
}

impl BindingContext {
    /// Pairs `template` with the bindable parameters of `method`.
    ///
    /// # Errors
    ///
    /// Positional markers that cannot be satisfied by the declared
    /// parameters are rejected here, before any call is made.
    pub fn new(
        method: &MethodDescriptor,
        template: &QueryTemplate,
    ) -> Result<Self, ConfigurationError> {
        let parameters: Vec<BindableParameter> = method
            .bindable_parameters()
            .enumerate()
            .map(|(index, p)| BindableParameter {
                index,
                name: p.name().map(str::to_string),
            })
            .collect();
        let declared = parameters.len();

        if template.bare_positionals() > declared {
            return Err(ConfigurationError::PositionalOverflow {
                method: method.id().clone(),
                declared,
                used: template.bare_positionals(),
            });
        }
        for binding in template.bindings() {
            if let ParameterBinding::Positional(index) = binding {
                if *index >= declared {
                    return Err(ConfigurationError::PositionalOutOfRange {
                        method: method.id().clone(),
                        index: *index,
                        declared,
                    });
                }
            }
        }

        Ok(Self {
            parameters,
            bindings: template.bindings().to_vec(),
        })
    }

    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Bindable position of the parameter declared as `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .map(|p| p.index)
    }

    fn evaluation_context<'a>(&'a self, values: &'a [JsonValue]) -> EvaluationContext<'a> {
        self.parameters
            .iter()
            .fold(EvaluationContext::new(values), |ctx, p| {
                match (p.name.as_deref(), values.get(p.index)) {
                    (Some(name), Some(value)) => ctx.with_variable(name, value),
                    _ => ctx,
                }
            })
    }
}

/// Text produced by binding one template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundText {
    pub text: String,
    /// Out-of-band values; only filled under [`SubstitutionPolicy::Parameterized`].
    pub params: Params,
}

/// Substitutes argument values into templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binder {
    policy: SubstitutionPolicy,
}

impl Binder {
    pub fn new(policy: SubstitutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SubstitutionPolicy {
        self.policy
    }

    /// Binds `accessor`'s values into `template`.
    ///
    /// Every call resolves its values afresh; nothing is cached between calls.
    ///
    /// # Errors
    ///
    /// - [`BindingError::UnknownParameter`] for a `:name` that the method
    ///   does not declare
    /// - [`BindingError::MissingArgument`] when the accessor holds fewer
    ///   values than the template references
    /// - [`BindingError::Expression`] when an expression fails to evaluate
    pub fn bind(
        &self,
        template: &QueryTemplate,
        accessor: &ParameterValueAccessor,
        context: &BindingContext,
    ) -> Result<BoundText, BindingError> {
        self.bind_with_prefix(template, accessor, context, QUERY_BINDING_PREFIX)
    }

    /// Binds a field specification. Identical to [`bind`](Self::bind) except
    /// that parameterized bindings are named `_f0`, `_f1`, ... so they never
    /// collide with the main query's.
    pub fn bind_fields(
        &self,
        template: &QueryTemplate,
        accessor: &ParameterValueAccessor,
        context: &BindingContext,
    ) -> Result<BoundText, BindingError> {
        self.bind_with_prefix(template, accessor, context, FIELDS_BINDING_PREFIX)
    }

    fn bind_with_prefix(
        &self,
        template: &QueryTemplate,
        accessor: &ParameterValueAccessor,
        context: &BindingContext,
        prefix: &str,
    ) -> Result<BoundText, BindingError> {
        let values = self.resolve(accessor, context)?;
        let mut params = Params::new();

        let text = template.render(|slot| -> Result<String, BindingError> {
            let value = values
                .get(slot)
                .ok_or(BindingError::MissingArgument { index: slot })?;
            Ok(match self.policy {
                SubstitutionPolicy::Literal => literal_text(value),
                SubstitutionPolicy::Quoted => gremlin_literal(value),
                SubstitutionPolicy::Parameterized => {
                    let name = format!("{}{}", prefix, slot);
                    params.insert(name.clone(), value.clone());
                    name
                }
            })
        })?;

        Ok(BoundText { text, params })
    }

    fn resolve(
        &self,
        accessor: &ParameterValueAccessor,
        context: &BindingContext,
    ) -> Result<Vec<JsonValue>, BindingError> {
        let argument = |index: usize| {
            accessor
                .value(index)
                .cloned()
                .ok_or(BindingError::MissingArgument { index })
        };

        context
            .bindings()
            .iter()
            .map(|binding| match binding {
                ParameterBinding::Positional(index) => argument(*index),
                ParameterBinding::Named(name) => context
                    .index_of(name)
                    .ok_or_else(|| BindingError::UnknownParameter(name.clone()))
                    .and_then(argument),
                ParameterBinding::Expression(expression) => {
                    expression.evaluate(&context.evaluation_context(&accessor.values))
                }
            })
            .collect()
    }
}

/// Textual form used by [`SubstitutionPolicy::Literal`].
pub fn literal_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Gremlin (Groovy) literal for a JSON value.
pub fn gremlin_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => quote(s),
        JsonValue::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(gremlin_literal)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        JsonValue::Object(map) if map.is_empty() => "[:]".to_string(),
        JsonValue::Object(map) => format!(
            "[{}]",
            map.iter()
                .map(|(k, v)| format!("{}: {}", quote(k), gremlin_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
