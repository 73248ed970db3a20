//! Expression language for computed placeholder values.
//!
//! Templates may embed `?#{ ... }` (or `:#{ ... }`) expressions whose value
//! is computed from the call's arguments. The language is a small subset of
//! SpEL:
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `[0]` | first bindable argument |
//! | `#name` | argument of the parameter declared as `name` |
//! | `a.b`, `a?.b`, `a[1]`, `a['k']` | property, null-safe property and index access |
//! | `'text'`, `42`, `1.5`, `true`, `null` | literals (`''` escapes a quote) |
//! | `+ - * / %` | arithmetic; `+` concatenates when either side is a string |
//! | `== != < <= > >=` | comparison |
//! | `and or not`, `&& \|\| !` | boolean logic |
//!
//! Expressions are parsed when the template is parsed, so syntax errors
//! surface while the repository is assembled; evaluation errors surface per
//! call as [`BindingError::Expression`].
//!
//! # Example
//!
//! ```
//! use gremlin_repository::query::{EvaluationContext, Expression};
//! use serde_json::json;
//!
//! let expr = Expression::parse("#first + ' ' + [1]").unwrap();
//! let args = [json!("Ada"), json!("Lovelace")];
//! let ctx = EvaluationContext::new(&args).with_variable("first", &args[0]);
//!
//! assert_eq!(expr.evaluate(&ctx).unwrap(), json!("Ada Lovelace"));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use serde_json::Value as JsonValue;

use crate::error::{BindingError, ConfigurationError};

#[derive(Parser)]
#[grammar = "query/expression.pest"]
struct ExpressionParser;

static PRATT: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::eq, Assoc::Left) | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_rule(rule: Rule) -> Option<Self> {
        Some(match rule {
            Rule::or => Self::Or,
            Rule::and => Self::And,
            Rule::eq => Self::Eq,
            Rule::ne => Self::Ne,
            Rule::lt => Self::Lt,
            Rule::le => Self::Le,
            Rule::gt => Self::Gt,
            Rule::ge => Self::Ge,
            Rule::add => Self::Add,
            Rule::sub => Self::Sub,
            Rule::mul => Self::Mul,
            Rule::div => Self::Div,
            Rule::rem => Self::Rem,
            _ => return None,
        })
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(JsonValue),
    /// `[n]`: bindable argument by position.
    Argument(usize),
    /// `#name`: argument by declared parameter name.
    Variable(String),
    Property {
        target: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// A parsed placeholder expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parses an expression body (the text between `#{` and `}`).
    pub fn parse(source: &str) -> Result<Self, ConfigurationError> {
        let malformed = |message: String| ConfigurationError::MalformedExpression {
            expression: source.to_string(),
            message,
        };

        let mut pairs = ExpressionParser::parse(Rule::expression, source)
            .map_err(|e| malformed(e.to_string()))?;
        let expr = pairs
            .next()
            .and_then(|root| root.into_inner().find(|p| p.as_rule() == Rule::expr))
            .ok_or_else(|| malformed("empty expression".to_string()))?;

        let ast = build_expr(expr.into_inner()).map_err(malformed)?;
        Ok(Self {
            source: source.trim().to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against the call's arguments.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<JsonValue, BindingError> {
        eval(&self.ast, ctx).map_err(|message| BindingError::expression(&self.source, message))
    }
}

/// Values visible to an expression: positional arguments and named variables.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    arguments: &'a [JsonValue],
    variables: HashMap<&'a str, &'a JsonValue>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(arguments: &'a [JsonValue]) -> Self {
        Self {
            arguments,
            variables: HashMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &'a str, value: &'a JsonValue) -> Self {
        self.variables.insert(name, value);
        self
    }
}

// ============================================================================
// Tree construction
// ============================================================================

fn build_expr(pairs: Pairs<Rule>) -> Result<Expr, String> {
    PRATT
        .map_primary(build_postfix)
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                Rule::neg => UnaryOp::Neg,
                other => return Err(format!("unexpected prefix operator {:?}", other)),
            };
            Ok(Expr::Unary(op, Box::new(rhs?)))
        })
        .map_infix(|lhs, op, rhs| {
            let op = BinaryOp::from_rule(op.as_rule())
                .ok_or_else(|| format!("unexpected operator `{}`", op.as_str()))?;
            Ok(Expr::Binary(op, Box::new(lhs?), Box::new(rhs?)))
        })
        .parse(pairs)
}

fn build_postfix(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let primary = inner
        .next()
        .ok_or_else(|| "missing operand".to_string())?;
    let mut expr = build_primary(primary)?;

    for accessor in inner {
        expr = match accessor.as_rule() {
            Rule::property | Rule::safe_property => Expr::Property {
                null_safe: accessor.as_rule() == Rule::safe_property,
                name: first_inner_str(accessor)?,
                target: Box::new(expr),
            },
            Rule::subscript => {
                let index = accessor
                    .into_inner()
                    .next()
                    .ok_or_else(|| "empty subscript".to_string())?;
                Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(build_expr(index.into_inner())?),
                }
            }
            other => return Err(format!("unexpected accessor {:?}", other)),
        };
    }
    Ok(expr)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, String> {
    match pair.as_rule() {
        Rule::null => Ok(Expr::Literal(JsonValue::Null)),
        Rule::boolean => Ok(Expr::Literal(JsonValue::Bool(pair.as_str() == "true"))),
        Rule::number => parse_number(pair.as_str()).map(Expr::Literal),
        Rule::string => {
            let text = first_inner_str(pair)?;
            Ok(Expr::Literal(JsonValue::String(text.replace("''", "'"))))
        }
        Rule::argument => {
            let index = first_inner_str(pair)?;
            index
                .parse()
                .map(Expr::Argument)
                .map_err(|_| format!("argument index `{}` out of range", index))
        }
        Rule::variable => first_inner_str(pair).map(Expr::Variable),
        Rule::expr => build_expr(pair.into_inner()),
        other => Err(format!("unexpected operand {:?}", other)),
    }
}

fn first_inner_str(pair: Pair<Rule>) -> Result<String, String> {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| "incomplete expression".to_string())
}

fn parse_number(text: &str) -> Result<JsonValue, String> {
    if text.contains('.') {
        text.parse::<f64>()
            .map(JsonValue::from)
            .map_err(|e| format!("invalid number `{}`: {}", text, e))
    } else {
        text.parse::<i64>()
            .map(JsonValue::from)
            .map_err(|_| format!("number `{}` out of range", text))
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn eval(expr: &Expr, ctx: &EvaluationContext<'_>) -> Result<JsonValue, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Argument(index) => ctx
            .arguments
            .get(*index)
            .cloned()
            .ok_or_else(|| format!("no argument at index {}", index)),
        Expr::Variable(name) => ctx
            .variables
            .get(name.as_str())
            .map(|v| (*v).clone())
            .ok_or_else(|| format!("unknown variable #{}", name)),
        Expr::Property {
            target,
            name,
            null_safe,
        } => match eval(target, ctx)? {
            JsonValue::Null if *null_safe => Ok(JsonValue::Null),
            JsonValue::Object(map) => Ok(map.get(name).cloned().unwrap_or(JsonValue::Null)),
            other => Err(format!(
                "cannot read property `{}` of {}",
                name,
                type_name(&other)
            )),
        },
        Expr::Index { target, index } => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            match (&target, &index) {
                (JsonValue::Array(items), JsonValue::Number(n)) => n
                    .as_u64()
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .ok_or_else(|| format!("index {} out of bounds", n)),
                (JsonValue::Object(map), JsonValue::String(key)) => {
                    Ok(map.get(key).cloned().unwrap_or(JsonValue::Null))
                }
                _ => Err(format!(
                    "cannot index {} with {}",
                    type_name(&target),
                    type_name(&index)
                )),
            }
        }
        Expr::Unary(UnaryOp::Not, operand) => Ok(JsonValue::Bool(!as_bool(&eval(operand, ctx)?)?)),
        Expr::Unary(UnaryOp::Neg, operand) => match Number::of(&eval(operand, ctx)?)? {
            Number::Int(i) => i
                .checked_neg()
                .map(JsonValue::from)
                .ok_or_else(|| "integer overflow".to_string()),
            Number::Float(f) => Ok(JsonValue::from(-f)),
        },
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let result = as_bool(&eval(lhs, ctx)?)? && as_bool(&eval(rhs, ctx)?)?;
            Ok(JsonValue::Bool(result))
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let result = as_bool(&eval(lhs, ctx)?)? || as_bool(&eval(rhs, ctx)?)?;
            Ok(JsonValue::Bool(result))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            match op {
                BinaryOp::Eq => Ok(JsonValue::Bool(values_equal(&lhs, &rhs))),
                BinaryOp::Ne => Ok(JsonValue::Bool(!values_equal(&lhs, &rhs))),
                BinaryOp::Lt => compare(&lhs, &rhs).map(|o| JsonValue::Bool(o == Ordering::Less)),
                BinaryOp::Le => {
                    compare(&lhs, &rhs).map(|o| JsonValue::Bool(o != Ordering::Greater))
                }
                BinaryOp::Gt => {
                    compare(&lhs, &rhs).map(|o| JsonValue::Bool(o == Ordering::Greater))
                }
                BinaryOp::Ge => compare(&lhs, &rhs).map(|o| JsonValue::Bool(o != Ordering::Less)),
                _ => arithmetic(*op, &lhs, &rhs),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &JsonValue) -> Result<Self, String> {
        match value {
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| format!("unsupported number {}", n)),
            },
            other => Err(format!("expected a number, found {}", type_name(other))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: &JsonValue, rhs: &JsonValue) -> Result<JsonValue, String> {
    if op == BinaryOp::Add && (lhs.is_string() || rhs.is_string()) {
        return Ok(JsonValue::String(format!(
            "{}{}",
            display_text(lhs),
            display_text(rhs)
        )));
    }

    match (Number::of(lhs)?, Number::of(rhs)?) {
        (Number::Int(a), Number::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                    return Err("division by zero".to_string())
                }
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Rem => a.checked_rem(b),
                _ => return Err(format!("{:?} is not an arithmetic operator", op)),
            };
            result
                .map(JsonValue::from)
                .ok_or_else(|| "integer overflow".to_string())
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
                    return Err("division by zero".to_string())
                }
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => return Err(format!("{:?} is not an arithmetic operator", op)),
            };
            Ok(JsonValue::from(result))
        }
    }
}

fn values_equal(lhs: &JsonValue, rhs: &JsonValue) -> bool {
    match (Number::of(lhs), Number::of(rhs)) {
        (Ok(Number::Int(a)), Ok(Number::Int(b))) => a == b,
        (Ok(a), Ok(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn compare(lhs: &JsonValue, rhs: &JsonValue) -> Result<Ordering, String> {
    match (lhs, rhs) {
        (JsonValue::String(a), JsonValue::String(b)) => Ok(a.cmp(b)),
        (JsonValue::Number(_), JsonValue::Number(_)) => {
            match (Number::of(lhs)?, Number::of(rhs)?) {
                (Number::Int(a), Number::Int(b)) => Ok(a.cmp(&b)),
                (a, b) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .ok_or_else(|| "numbers are not comparable".to_string()),
            }
        }
        _ => Err(format!(
            "cannot compare {} with {}",
            type_name(lhs),
            type_name(rhs)
        )),
    }
}

fn as_bool(value: &JsonValue) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("expected a boolean, found {}", type_name(value)))
}

fn display_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "map",
    }
}
