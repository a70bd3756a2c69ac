//! Compile-time values manipulated by generators.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use sp_core::ast::{ArrayElement, Expr, ExprArray, ExprKind, Literal};
use sp_core::span::Span;

use crate::context::{TargetDeclaration, TargetParameter};
use crate::runtime::IdGen;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// The declaration being woven, as seen through `meta.target`.
    Declaration(Arc<TargetDeclaration>),
    Parameter(TargetParameter),
}

impl Value {
    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Declaration(_) => "declaration",
            Value::Parameter(_) => "parameter",
        }
    }

    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(value) => Value::Bool(*value),
            Literal::Int(value) => Value::Int(*value),
            Literal::Str(value) => Value::Str(value.clone()),
        }
    }

    /// Converts weave-site JSON; floats are truncated to integers.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64))
                .map(Value::Int)
                .unwrap_or(Value::Null),
            serde_json::Value::String(value) => Value::Str(value),
            serde_json::Value::Array(values) => {
                Value::List(values.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn truthy(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the value can be embedded into generated code.
    pub fn is_liftable(&self) -> bool {
        match self {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Str(_) => true,
            Value::List(values) => values.iter().all(Value::is_liftable),
            Value::Map(_) | Value::Declaration(_) | Value::Parameter(_) => false,
        }
    }

    /// Builds the run-time expression denoting this value.
    pub fn lift(&self, ids: &mut IdGen, span: Span) -> Option<Expr> {
        let kind = match self {
            Value::Null => ExprKind::Literal(Literal::Null),
            Value::Bool(value) => ExprKind::Literal(Literal::Bool(*value)),
            Value::Int(value) => ExprKind::Literal(Literal::Int(*value)),
            Value::Str(value) => ExprKind::Literal(Literal::Str(value.clone())),
            Value::List(values) => {
                let mut elements = Vec::with_capacity(values.len());
                for value in values {
                    let value = value.lift(ids, span)?;
                    elements.push(ArrayElement {
                        id: ids.next(),
                        span,
                        spread: false,
                        value,
                    });
                }
                ExprKind::Array(ExprArray { elements })
            }
            Value::Map(_) | Value::Declaration(_) | Value::Parameter(_) => return None,
        };
        Some(Expr::new(ids.next(), span, kind))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Str(value) => f.write_str(value),
            Value::List(values) => write!(f, "[{}]", values.iter().join(", ")),
            Value::Map(entries) => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .join(", ")
            ),
            Value::Declaration(decl) => f.write_str(&decl.name),
            Value::Parameter(param) => f.write_str(&param.name),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::ast::print;

    #[test]
    fn lists_of_scalars_lift_to_arrays() {
        let mut ids = IdGen::default();
        let value = Value::List(vec![Value::Int(1), Value::str("a"), Value::Null]);
        let expr = value.lift(&mut ids, Span::null()).expect("liftable");
        assert_eq!(print::expr(&expr), r#"[1, "a", null]"#);
    }

    #[test]
    fn handles_and_maps_do_not_lift() {
        let mut ids = IdGen::default();
        let decl = Value::Declaration(Arc::new(TargetDeclaration::method("run")));
        assert!(!decl.is_liftable());
        assert!(decl.lift(&mut ids, Span::null()).is_none());
        let nested = Value::List(vec![Value::Map(BTreeMap::new())]);
        assert!(nested.lift(&mut ids, Span::null()).is_none());
    }

    #[test]
    fn json_numbers_become_integers() {
        let json = serde_json::json!({"count": 3, "ratio": 2.5, "names": ["a"]});
        let Value::Map(entries) = Value::from_json(json) else {
            panic!("expected map");
        };
        assert_eq!(entries["count"], Value::Int(3));
        assert_eq!(entries["ratio"], Value::Int(2));
        assert_eq!(entries["names"], Value::List(vec![Value::str("a")]));
    }
}
