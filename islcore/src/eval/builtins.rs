//! Built-in functions reachable through IR `Call` nodes.
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};

use super::ops;
use crate::{
    context::EvaluationContext,
    utils::error::{EvalError, EvalResult},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Length,
    Count,
    Sum,
    Min,
    Max,
    Abs,
    Round,
    Floor,
    Ceil,
    Between,
    Now,
}

impl Builtin {
    /// Resolve a function name; unknown names are an evaluation error.
    pub fn resolve(name: &str) -> EvalResult<Self> {
        Builtin::from_str(name).map_err(|_| EvalError::UnknownFunction {
            name: name.to_string(),
        })
    }

    /// Apply to already evaluated arguments.
    pub fn apply(self, args: &[Value], ctx: &EvaluationContext) -> EvalResult<Value> {
        let name = self.to_string();
        match self {
            Builtin::Length | Builtin::Count => {
                let [value] = expect_args::<1>(&name, args)?;
                ops::length(&name, value)
            }
            Builtin::Sum => sum(&name, reduction_items(args)),
            Builtin::Min | Builtin::Max => extremum(self, &name, reduction_items(args)),
            Builtin::Abs | Builtin::Round | Builtin::Floor | Builtin::Ceil => {
                let [value] = expect_args::<1>(&name, args)?;
                unary_numeric(self, &name, value)
            }
            Builtin::Between => {
                let [value, low, high] = expect_args::<3>(&name, args)?;
                Ok(Value::Bool(ops::between(value, low, high, true)?))
            }
            Builtin::Now => {
                expect_args::<0>(&name, args)?;
                Ok(Value::Int(ctx.now_millis()))
            }
        }
    }
}

fn expect_args<'v, const N: usize>(function: &str, args: &'v [Value]) -> EvalResult<&'v [Value; N]> {
    args.try_into().map_err(|_| EvalError::ArityMismatch {
        function: function.to_string(),
        expected: N,
        found: args.len(),
    })
}

/// `f(xs)` reduces over the list `xs`; `f(a, b, ...)` over the arguments. An absent single
/// argument is an empty list.
fn reduction_items(args: &[Value]) -> &[Value] {
    match args {
        [Value::List(items)] => items,
        [single] if single.is_absent() => &[],
        _ => args,
    }
}

fn sum(name: &str, items: &[Value]) -> EvalResult<Value> {
    let mut total = Value::Int(0);
    for item in items {
        if item.as_f64().is_none() {
            return Err(EvalError::TypeMismatch {
                operation: name.to_string(),
                expected: "number",
                found: item.type_name(),
            });
        }
        total = ops::arithmetic(islir::ir::ArithOp::Add, &total, item)?;
    }
    Ok(total)
}

fn extremum(which: Builtin, name: &str, items: &[Value]) -> EvalResult<Value> {
    let mut best: Option<&Value> = None;
    for item in items {
        if item.as_f64().is_none() {
            return Err(EvalError::TypeMismatch {
                operation: name.to_string(),
                expected: "number",
                found: item.type_name(),
            });
        }
        best = match best {
            None => Some(item),
            Some(current) => {
                let ordering = ops::order(name, item, current)?;
                let better = match which {
                    Builtin::Min => ordering.is_some_and(|o| o.is_lt()),
                    _ => ordering.is_some_and(|o| o.is_gt()),
                };
                Some(if better { item } else { current })
            }
        };
    }
    best.cloned().ok_or_else(|| EvalError::EmptyReduction {
        function: name.to_string(),
    })
}

fn unary_numeric(which: Builtin, name: &str, value: &Value) -> EvalResult<Value> {
    match value {
        v if v.is_absent() => Ok(Value::Undefined),
        Value::Int(i) => Ok(match which {
            Builtin::Abs => i.checked_abs().map_or(Value::Float((*i as f64).abs()), Value::Int),
            _ => Value::Int(*i),
        }),
        Value::Float(f) => {
            let rounded = match which {
                Builtin::Abs => return Ok(Value::Float(f.abs())),
                Builtin::Round => f.round(),
                Builtin::Floor => f.floor(),
                _ => f.ceil(),
            };
            Ok(float_to_int(rounded))
        }
        other => Err(EvalError::TypeMismatch {
            operation: name.to_string(),
            expected: "number",
            found: other.type_name(),
        }),
    }
}

/// Whole floats that fit become `Int`; the rest stay `Float`.
fn float_to_int(f: f64) -> Value {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if f.is_finite() && f.abs() <= LIMIT {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}
