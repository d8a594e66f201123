//! Value-level operators shared by the evaluator and the built-ins.
use std::cmp::Ordering;

use islir::ir::{ArithOp, CompareOp, StringOp};
use regex::{Regex, RegexBuilder};

use crate::{
    utils::error::{EvalError, EvalResult},
    value::Value,
};

fn type_mismatch(operation: &str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        operation: operation.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Arithmetic with the evaluator's totality rules:
/// - an absent operand yields `Undefined`;
/// - a zero divisor yields `0` for `/` and `%`;
/// - `Int` results that overflow, and inexact `Int / Int`, fall back to `Float`.
///
/// `+` also concatenates two strings.
pub fn arithmetic(op: ArithOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    if lhs.is_absent() || rhs.is_absent() {
        return Ok(Value::Undefined);
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(int_arithmetic(op, *a, *b)),
        (Value::String(a), Value::String(b)) if op == ArithOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        _ => {
            let a = lhs
                .as_f64()
                .ok_or_else(|| type_mismatch(op.symbol(), "number", lhs))?;
            let b = rhs
                .as_f64()
                .ok_or_else(|| type_mismatch(op.symbol(), "number", rhs))?;
            Ok(Value::Float(float_arithmetic(op, a, b)))
        }
    }
}

fn int_arithmetic(op: ArithOp, a: i64, b: i64) -> Value {
    let exact = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div if b == 0 => Some(0),
        ArithOp::Div => match a.checked_rem(b) {
            Some(0) => a.checked_div(b),
            _ => None,
        },
        // `i64::MIN % -1` is 0 mathematically.
        ArithOp::Mod if b == 0 => Some(0),
        ArithOp::Mod => Some(a.checked_rem(b).unwrap_or(0)),
    };
    exact.map_or_else(
        || Value::Float(float_arithmetic(op, a as f64, b as f64)),
        Value::Int,
    )
}

fn float_arithmetic(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::Mod if b == 0.0 => 0.0,
        ArithOp::Div => a / b,
        ArithOp::Mod => a % b,
    }
}

/// Order two values. Numbers compare numerically across int/float, strings
/// lexicographically. `None` when either side is absent or the numbers are unordered (NaN).
pub fn order(operation: &str, lhs: &Value, rhs: &Value) -> EvalResult<Option<Ordering>> {
    if lhs.is_absent() || rhs.is_absent() {
        return Ok(None);
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            (None, _) => Err(type_mismatch(operation, "number or string", lhs)),
            (_, None) => Err(type_mismatch(operation, "number or string", rhs)),
        },
    }
}

/// Ordered comparison; absent operands compare as `false`.
pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> EvalResult<bool> {
    let Some(ordering) = order(op.symbol(), lhs, rhs)? else {
        return Ok(false);
    };
    Ok(match op {
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => ordering.is_le(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => ordering.is_ge(),
    })
}

/// `low <= value <= high` (or strict at both ends).
pub fn between(value: &Value, low: &Value, high: &Value, inclusive: bool) -> EvalResult<bool> {
    let (lower, upper) = if inclusive {
        (CompareOp::Ge, CompareOp::Le)
    } else {
        (CompareOp::Gt, CompareOp::Lt)
    };
    Ok(compare(lower, value, low)? && compare(upper, value, high)?)
}

/// Size of a string (in characters), list or record. Absent values have length `0`.
pub fn length(operation: &str, value: &Value) -> EvalResult<Value> {
    let len = match value {
        Value::Undefined | Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Record(fields) => fields.len(),
        other => return Err(type_mismatch(operation, "string or list", other)),
    };
    Ok(Value::from(len))
}

/// Whether `collection` contains `element`: structural equality for lists, substring
/// match for strings. An absent collection contains nothing.
pub fn includes(operation: &str, collection: &Value, element: &Value) -> EvalResult<bool> {
    match (collection, element) {
        (c, _) if c.is_absent() => Ok(false),
        (Value::List(items), e) => Ok(items.contains(e)),
        (Value::String(_), e) if e.is_absent() => Ok(false),
        (Value::String(s), Value::String(needle)) => Ok(s.contains(needle.as_str())),
        (Value::String(_), other) => Err(type_mismatch(operation, "string", other)),
        (other, _) => Err(type_mismatch(operation, "list or string", other)),
    }
}

/// Binary string predicate. Absent operands yield `false`.
///
/// `includes` shares its canonical form with the array variant, so it evaluates through
/// [`includes`] exactly as that one does: a list target may contain `null`.
pub fn string_test(op: StringOp, target: &Value, argument: &Value) -> EvalResult<bool> {
    let operation = op.method_name();
    match op {
        StringOp::Includes => includes(operation, target, argument),
        _ if target.is_absent() || argument.is_absent() => Ok(false),
        StringOp::Matches => {
            let subject = target
                .as_str()
                .ok_or_else(|| type_mismatch(operation, "string", target))?;
            let regex = match argument {
                Value::Pattern { source, flags } => compile_pattern(source, flags)?,
                Value::String(source) => compile_pattern(source, "")?,
                other => return Err(type_mismatch(operation, "regex", other)),
            };
            Ok(regex.is_match(subject))
        }
        StringOp::StartsWith | StringOp::EndsWith => {
            let subject = target
                .as_str()
                .ok_or_else(|| type_mismatch(operation, "string", target))?;
            let affix = argument
                .as_str()
                .ok_or_else(|| type_mismatch(operation, "string", argument))?;
            Ok(if op == StringOp::StartsWith {
                subject.starts_with(affix)
            } else {
                subject.ends_with(affix)
            })
        }
    }
}

/// Compile a regex literal. `i`, `m`, `s` and `u` map onto builder options; every other
/// flag (`g`, `y`, `d`, `v`, ...) has no meaning for a boolean match and is ignored.
pub fn compile_pattern(source: &str, flags: &str) -> EvalResult<Regex> {
    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'u' => {
                builder.unicode(true);
            }
            _ => {}
        }
    }
    builder.build().map_err(|source_err| EvalError::InvalidPattern {
        pattern: source.to_string(),
        source: source_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_divisor_yields_zero() {
        assert_eq!(
            arithmetic(ArithOp::Div, &Value::Int(10), &Value::Int(0)).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            arithmetic(ArithOp::Mod, &Value::Int(10), &Value::Int(0)).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            arithmetic(ArithOp::Div, &Value::Float(1.5), &Value::Int(0)).unwrap(),
            Value::Float(0.0)
        );
    }

    #[test]
    fn integer_division_stays_exact() {
        assert_eq!(
            arithmetic(ArithOp::Div, &Value::Int(9), &Value::Int(3)).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            arithmetic(ArithOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(),
            Value::Float(3.5)
        );
    }

    #[test]
    fn overflow_promotes_to_float() {
        let v = arithmetic(ArithOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert!(v.is_float());
    }

    #[test]
    fn comparisons_widen_numbers() {
        assert!(compare(CompareOp::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap());
        assert!(!compare(CompareOp::Lt, &Value::Undefined, &Value::Int(1)).unwrap());
        assert!(compare(CompareOp::Lt, &Value::Int(1), &Value::from("a")).is_err());
    }

    #[test]
    fn regex_flags() {
        let re = compile_pattern("^abc$", "i").unwrap();
        assert!(re.is_match("ABC"));
        assert!(compile_pattern("a+", "dv").unwrap().is_match("caab"));
        assert!(matches!(
            compile_pattern("(", ""),
            Err(EvalError::InvalidPattern { .. })
        ));
    }
}
