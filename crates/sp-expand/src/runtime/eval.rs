use sp_core::ast::{BinOpKind, UnOpKind};
use sp_core::intrinsics::IntrinsicKind;
use sp_core::Result;

use crate::error::expansion_error;
use crate::expand_bail;
use crate::generator::{MetaExpr, MetaPart};
use crate::runtime::Machine;
use crate::value::Value;

impl<'g, 'c> Machine<'g, 'c> {
    pub(super) fn eval(&mut self, expr: &MetaExpr) -> Result<Value> {
        match expr {
            MetaExpr::Literal(literal) => Ok(Value::from_literal(literal)),
            MetaExpr::Local(slot) => self
                .locals
                .get(slot)
                .cloned()
                .ok_or_else(|| expansion_error(format!("compile-time local %{} is not set", slot))),
            MetaExpr::Intrinsic(kind) => match kind {
                IntrinsicKind::Target => Ok(Value::Declaration(self.site.target.clone())),
                IntrinsicKind::Tags => Ok(Value::Map(self.site.tags.clone())),
                other => expand_bail!(format!("{:?} has no compile-time value", other)),
            },
            MetaExpr::Global(path) => self.site.globals.get(path).cloned().ok_or_else(|| {
                expansion_error(format!("no compile-time value for `{}` at this weave site", path))
            }),
            MetaExpr::Member { base, member } => {
                let base = self.eval(base)?;
                member_of(&base, member)
            }
            MetaExpr::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                index_of(&base, &index)
            }
            MetaExpr::Call { function, args } => {
                let args = self.eval_all(args)?;
                let function = self.site.functions.get(function).ok_or_else(|| {
                    expansion_error(format!("no compile-time function `{}`", function))
                })?;
                (function.as_ref())(&args)
            }
            MetaExpr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let args = self.eval_all(args)?;
                call_method(&receiver, method, &args)
            }
            MetaExpr::Binary { op, lhs, rhs } => match op {
                BinOpKind::And | BinOpKind::Or => {
                    let lhs = self.condition(lhs)?;
                    let short = (*op == BinOpKind::Or) == lhs;
                    if short {
                        Ok(Value::Bool(lhs))
                    } else {
                        Ok(Value::Bool(self.condition(rhs)?))
                    }
                }
                op => {
                    let lhs = self.eval(lhs)?;
                    let rhs = self.eval(rhs)?;
                    binary(*op, lhs, rhs)
                }
            },
            MetaExpr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                match (op, operand) {
                    (UnOpKind::Not, Value::Bool(value)) => Ok(Value::Bool(!value)),
                    (UnOpKind::Neg, Value::Int(value)) => value
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| expansion_error("integer overflow")),
                    (op, operand) => expand_bail!(format!(
                        "cannot apply `{}` to {}",
                        op,
                        operand.type_name()
                    )),
                }
            }
            MetaExpr::Conditional { cond, then, elze } => {
                if self.condition(cond)? {
                    self.eval(then)
                } else {
                    self.eval(elze)
                }
            }
            MetaExpr::Assign { slot, op, value } => {
                let value = self.eval(value)?;
                let value = match op {
                    Some(op) => {
                        let current = self.eval(&MetaExpr::Local(*slot))?;
                        binary(*op, current, value)?
                    }
                    None => value,
                };
                self.locals.insert(*slot, value.clone());
                Ok(value)
            }
            MetaExpr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for (spread, element) in elements {
                    let value = self.eval(element)?;
                    match (spread, value) {
                        (true, Value::List(items)) => values.extend(items),
                        (true, other) => expand_bail!(format!(
                            "cannot spread a {} into an array",
                            other.type_name()
                        )),
                        (false, value) => values.push(value),
                    }
                }
                Ok(Value::List(values))
            }
            MetaExpr::Interpolated(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        MetaPart::Text(part) => text.push_str(part),
                        MetaPart::Hole(hole) => text.push_str(&self.eval(hole)?.to_string()),
                    }
                }
                Ok(Value::Str(text))
            }
        }
    }

    fn eval_all(&mut self, exprs: &[MetaExpr]) -> Result<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    pub(super) fn condition(&mut self, expr: &MetaExpr) -> Result<bool> {
        let value = self.eval(expr)?;
        value.truthy().ok_or_else(|| {
            expansion_error(format!(
                "condition must be a bool, found {} `{}`",
                value.type_name(),
                value
            ))
        })
    }
}

fn member_of(base: &Value, member: &str) -> Result<Value> {
    let value = match base {
        Value::Declaration(decl) => decl.member(member),
        Value::Parameter(param) => param.member(member),
        Value::Map(entries) => Some(entries.get(member).cloned().unwrap_or(Value::Null)),
        Value::List(items) if member == "count" => Some(Value::Int(items.len() as i64)),
        Value::Str(text) if member == "length" => Some(Value::Int(text.chars().count() as i64)),
        _ => None,
    };
    value.ok_or_else(|| {
        expansion_error(format!("{} has no member `{}`", base.type_name(), member))
    })
}

fn index_of(base: &Value, index: &Value) -> Result<Value> {
    match (base, index) {
        (Value::List(items), Value::Int(position)) => usize::try_from(*position)
            .ok()
            .and_then(|position| items.get(position))
            .cloned()
            .ok_or_else(|| {
                expansion_error(format!(
                    "index {} out of bounds for a list of {}",
                    position,
                    items.len()
                ))
            }),
        (Value::Map(entries), Value::Str(key)) => {
            Ok(entries.get(key).cloned().unwrap_or(Value::Null))
        }
        (base, index) => expand_bail!(format!(
            "cannot index {} with {}",
            base.type_name(),
            index.type_name()
        )),
    }
}

fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
    let value = match (receiver, method, args) {
        (Value::Str(text), "contains", [Value::Str(needle)]) => Value::Bool(text.contains(needle.as_str())),
        (Value::Str(text), "starts_with", [Value::Str(prefix)]) => {
            Value::Bool(text.starts_with(prefix.as_str()))
        }
        (Value::Str(text), "ends_with", [Value::Str(suffix)]) => {
            Value::Bool(text.ends_with(suffix.as_str()))
        }
        (Value::Str(text), "to_upper", []) => Value::Str(text.to_uppercase()),
        (Value::Str(text), "to_lower", []) => Value::Str(text.to_lowercase()),
        (Value::List(items), "contains", [item]) => Value::Bool(items.contains(item)),
        (Value::Map(entries), "contains_key", [Value::Str(key)]) => {
            Value::Bool(entries.contains_key(key))
        }
        (Value::Map(entries), "get", [Value::Str(key), default]) => {
            entries.get(key).cloned().unwrap_or_else(|| default.clone())
        }
        (receiver, method, args) => expand_bail!(format!(
            "{} has no compile-time method `{}` taking {} argument(s)",
            receiver.type_name(),
            method,
            args.len()
        )),
    };
    Ok(value)
}

fn binary(op: BinOpKind, lhs: Value, rhs: Value) -> Result<Value> {
    let value = match (op, lhs, rhs) {
        (BinOpKind::Eq, lhs, rhs) => Value::Bool(lhs == rhs),
        (BinOpKind::Ne, lhs, rhs) => Value::Bool(lhs != rhs),
        (BinOpKind::Add, Value::Str(lhs), rhs) => Value::Str(format!("{}{}", lhs, rhs)),
        (BinOpKind::Add, lhs, Value::Str(rhs)) => Value::Str(format!("{}{}", lhs, rhs)),
        (BinOpKind::Add, Value::List(mut lhs), Value::List(rhs)) => {
            lhs.extend(rhs);
            Value::List(lhs)
        }
        (op, Value::Int(lhs), Value::Int(rhs)) => int_binary(op, lhs, rhs)?,
        (op, Value::Str(lhs), Value::Str(rhs)) => match op {
            BinOpKind::Lt => Value::Bool(lhs < rhs),
            BinOpKind::Le => Value::Bool(lhs <= rhs),
            BinOpKind::Gt => Value::Bool(lhs > rhs),
            BinOpKind::Ge => Value::Bool(lhs >= rhs),
            op => expand_bail!(format!("cannot apply `{}` to strings", op)),
        },
        (BinOpKind::And, Value::Bool(lhs), Value::Bool(rhs)) => Value::Bool(lhs && rhs),
        (BinOpKind::Or, Value::Bool(lhs), Value::Bool(rhs)) => Value::Bool(lhs || rhs),
        (op, lhs, rhs) => expand_bail!(format!(
            "cannot apply `{}` to {} and {}",
            op,
            lhs.type_name(),
            rhs.type_name()
        )),
    };
    Ok(value)
}

fn int_binary(op: BinOpKind, lhs: i64, rhs: i64) -> Result<Value> {
    let overflow = || expansion_error(format!("integer overflow in `{} {} {}`", lhs, op, rhs));
    let value = match op {
        BinOpKind::Add => Value::Int(lhs.checked_add(rhs).ok_or_else(overflow)?),
        BinOpKind::Sub => Value::Int(lhs.checked_sub(rhs).ok_or_else(overflow)?),
        BinOpKind::Mul => Value::Int(lhs.checked_mul(rhs).ok_or_else(overflow)?),
        BinOpKind::Div | BinOpKind::Mod if rhs == 0 => {
            expand_bail!(format!("division by zero in `{} {} {}`", lhs, op, rhs))
        }
        BinOpKind::Div => Value::Int(lhs.checked_div(rhs).ok_or_else(overflow)?),
        BinOpKind::Mod => Value::Int(lhs.checked_rem(rhs).ok_or_else(overflow)?),
        BinOpKind::Lt => Value::Bool(lhs < rhs),
        BinOpKind::Le => Value::Bool(lhs <= rhs),
        BinOpKind::Gt => Value::Bool(lhs > rhs),
        BinOpKind::Ge => Value::Bool(lhs >= rhs),
        BinOpKind::Eq => Value::Bool(lhs == rhs),
        BinOpKind::Ne => Value::Bool(lhs != rhs),
        BinOpKind::And | BinOpKind::Or => {
            expand_bail!(format!("cannot apply `{}` to integers", op))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn map(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn string_concatenation_and_comparison() {
        let joined = binary(BinOpKind::Add, Value::str("n="), Value::Int(3)).expect("add");
        assert_eq!(joined, Value::str("n=3"));
        let less = binary(BinOpKind::Lt, Value::str("a"), Value::str("b")).expect("lt");
        assert_eq!(less, Value::Bool(true));
    }

    #[test]
    fn arithmetic_errors_are_reported() {
        assert!(binary(BinOpKind::Div, Value::Int(1), Value::Int(0)).is_err());
        assert!(binary(BinOpKind::Add, Value::Int(i64::MAX), Value::Int(1)).is_err());
        assert!(binary(BinOpKind::Sub, Value::Bool(true), Value::Int(1)).is_err());
    }

    #[test]
    fn members_of_maps_and_lists() {
        let tags = map([("kind", Value::str("audit"))]);
        assert_eq!(member_of(&tags, "kind").expect("kind"), Value::str("audit"));
        assert_eq!(member_of(&tags, "missing").expect("missing"), Value::Null);
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(member_of(&list, "count").expect("count"), Value::Int(2));
        assert!(member_of(&Value::Int(1), "count").is_err());
        assert!(index_of(&list, &Value::Int(5)).is_err());
    }

    #[test]
    fn builtin_methods() {
        let name = Value::str("GetName");
        assert_eq!(
            call_method(&name, "starts_with", &[Value::str("Get")]).expect("starts_with"),
            Value::Bool(true)
        );
        assert_eq!(
            call_method(&name, "to_lower", &[]).expect("to_lower"),
            Value::str("getname")
        );
        let tags = map([("a", Value::Int(1))]);
        assert_eq!(
            call_method(&tags, "get", &[Value::str("b"), Value::Int(0)]).expect("get"),
            Value::Int(0)
        );
        assert!(call_method(&name, "reverse", &[]).is_err());
    }
}
