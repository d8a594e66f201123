//! Tree-recursive evaluator from IR to [`Value`].
//!
//! Evaluation is total over well-formed IR. It is synchronous and pure: the same IR and
//! context always produce the same value. Errors are reserved for
//! - unsupported placeholders reaching runtime,
//! - unknown built-in names and wrong arities,
//! - operations with no coercion for the operand types (e.g. `"a" * 2`).
//!
//! Everything else resolves to a value: property chains through absent values yield
//! `Undefined`, quantifiers over empty collections are vacuous, `x / 0` and `x % 0` are
//! `0`, and unmatched entity lookups are `Undefined`.
//!
//! Example
//! ```
//! use islcore::context::{ContextOptions, create_evaluation_context};
//! use islcore::eval::evaluate;
//! use islcore::value::Value;
//! use islir::ir::builder::IrBuilder;
//!
//! let b = IrBuilder::new();
//! let ir = b.exists(b.path("a", &["b", "c"]), true);
//! let ctx = create_evaluation_context(
//!     ContextOptions::new().variable("a", Value::record([("b", Value::Null)])),
//! );
//! assert_eq!(evaluate(&ir, &ctx).unwrap(), Value::Bool(false));
//! ```
pub mod builtins;
pub mod ops;

use islir::ir::{ArrayPredicateOp, EntityQueryKind, IrExpr, IrKind, QuantifierKind};

use crate::{
    context::EvaluationContext,
    utils::error::{EvalError, EvalResult},
    value::{Record, Value},
};

use self::builtins::Builtin;

/// Evaluate `ir` against `ctx`.
pub fn evaluate(ir: &IrExpr, ctx: &EvaluationContext) -> EvalResult<Value> {
    log::trace!("evaluating {} node {}", ir.node_type(), ir.id());
    match ir.kind() {
        // Literals
        IrKind::Null => Ok(Value::Null),
        IrKind::Bool(b) => Ok(Value::Bool(*b)),
        IrKind::Number(n) => Ok(Value::from(*n)),
        IrKind::String(s) => Ok(Value::String(s.clone())),
        IrKind::Regex { pattern, flags } => Ok(Value::Pattern {
            source: pattern.clone(),
            flags: flags.clone(),
        }),
        IrKind::List(items) => Ok(Value::List(evaluate_all(items, ctx)?)),
        IrKind::Map(map) => {
            let mut fields = Record::new();
            for entry in map.entries() {
                fields.insert(entry.key.clone(), evaluate(&entry.value, ctx)?);
            }
            Ok(Value::Record(fields))
        }

        // References
        IrKind::Variable(name) => Ok(ctx.lookup(name)),
        IrKind::Property { object, property } => {
            let object = evaluate(object, ctx)?;
            Ok(property_of(&object, property))
        }
        IrKind::Index { object, index } => {
            let object = evaluate(object, ctx)?;
            let index = evaluate(index, ctx)?;
            Ok(index_of(&object, &index))
        }
        IrKind::Input(None) => Ok(Value::Record(ctx.input().clone())),
        IrKind::Input(Some(field)) => Ok(ctx.input().get(field).cloned().unwrap_or_default()),
        IrKind::Result(None) => Ok(ctx.result().cloned().unwrap_or_default()),
        IrKind::Result(Some(field)) => Ok(ctx
            .result()
            .map(|result| property_of(result, field))
            .unwrap_or_default()),
        IrKind::Old(inner) => evaluate(inner, &ctx.as_pre_state()),

        IrKind::Exists { operand, positive } => {
            let absent = evaluate(operand, ctx)?.is_absent();
            Ok(Value::Bool(if *positive { !absent } else { absent }))
        }
        IrKind::Compare { op, lhs, rhs } => {
            let lhs = evaluate(lhs, ctx)?;
            let rhs = evaluate(rhs, ctx)?;
            Ok(Value::Bool(ops::compare(*op, &lhs, &rhs)?))
        }
        IrKind::Equality { lhs, rhs, negated } => {
            let equal = evaluate(lhs, ctx)? == evaluate(rhs, ctx)?;
            Ok(Value::Bool(equal != *negated))
        }

        // Boolean, short-circuiting left to right
        IrKind::And(operands) => {
            for operand in operands {
                if !evaluate(operand, ctx)?.truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        IrKind::Or(operands) => {
            for operand in operands {
                if evaluate(operand, ctx)?.truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        IrKind::Not(inner) => Ok(Value::Bool(!evaluate(inner, ctx)?.truthy())),
        IrKind::Implies {
            antecedent,
            consequent,
        } => {
            if !evaluate(antecedent, ctx)?.truthy() {
                return Ok(Value::Bool(true));
            }
            evaluate(consequent, ctx)
        }

        // Strings and arrays. Length and includes accept both strings and lists, since the
        // two variants share a canonical form.
        IrKind::StringLength(target) | IrKind::ArrayLength(target) => {
            ops::length("length", &evaluate(target, ctx)?)
        }
        IrKind::StringTest {
            op,
            target,
            argument,
        } => {
            let target = evaluate(target, ctx)?;
            let argument = evaluate(argument, ctx)?;
            Ok(Value::Bool(ops::string_test(*op, &target, &argument)?))
        }
        IrKind::ArrayIncludes { target, element } => {
            let target = evaluate(target, ctx)?;
            let element = evaluate(element, ctx)?;
            Ok(Value::Bool(ops::includes("includes", &target, &element)?))
        }
        IrKind::ArrayPredicate {
            op,
            collection,
            variable,
            predicate,
        } => {
            let items = collection_items(op.method_name(), evaluate(collection, ctx)?)?;
            match op {
                ArrayPredicateOp::Every => {
                    every(&items, variable, predicate, ctx).map(Value::Bool)
                }
                ArrayPredicateOp::Some => some(&items, variable, predicate, ctx).map(Value::Bool),
                ArrayPredicateOp::Filter => {
                    let mut kept = Vec::new();
                    for item in items {
                        if satisfies(&item, variable, predicate, ctx)? {
                            kept.push(item);
                        }
                    }
                    Ok(Value::List(kept))
                }
            }
        }

        IrKind::Between {
            value,
            low,
            high,
            inclusive,
        } => {
            let value = evaluate(value, ctx)?;
            let low = evaluate(low, ctx)?;
            let high = evaluate(high, ctx)?;
            Ok(Value::Bool(ops::between(&value, &low, &high, *inclusive)?))
        }
        IrKind::Membership {
            value,
            candidates,
            negated,
        } => {
            let value = evaluate(value, ctx)?;
            let candidates = evaluate_all(candidates, ctx)?;
            Ok(Value::Bool(candidates.contains(&value) != *negated))
        }

        IrKind::Quantifier {
            kind,
            collection,
            variable,
            predicate,
        } => {
            let items = collection_items(kind.keyword(), evaluate(collection, ctx)?)?;
            match kind {
                QuantifierKind::Universal => {
                    every(&items, variable, predicate, ctx).map(Value::Bool)
                }
                QuantifierKind::Existential => {
                    some(&items, variable, predicate, ctx).map(Value::Bool)
                }
                QuantifierKind::NoneSatisfy => {
                    some(&items, variable, predicate, ctx).map(|any| Value::Bool(!any))
                }
                QuantifierKind::Count => {
                    let mut count = 0usize;
                    for item in &items {
                        if satisfies(item, variable, predicate, ctx)? {
                            count += 1;
                        }
                    }
                    Ok(Value::from(count))
                }
            }
        }

        IrKind::EntityQuery {
            kind,
            entity,
            criteria,
            pre_state,
        } => {
            let scope = if *pre_state {
                ctx.as_pre_state()
            } else {
                ctx.clone()
            };
            entity_query(*kind, entity, criteria.as_deref(), &scope)
        }

        IrKind::Arithmetic { op, lhs, rhs } => {
            let lhs = evaluate(lhs, ctx)?;
            let rhs = evaluate(rhs, ctx)?;
            ops::arithmetic(*op, &lhs, &rhs)
        }

        IrKind::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate(condition, ctx)?.truthy() {
                evaluate(then_branch, ctx)
            } else {
                evaluate(else_branch, ctx)
            }
        }

        IrKind::Call {
            function,
            unsupported: true,
            ..
        } => Err(EvalError::UnsupportedNode {
            kind: function.clone(),
        }),
        IrKind::Call { function, args, .. } => {
            let builtin = Builtin::resolve(function)?;
            let args = evaluate_all(args, ctx)?;
            builtin.apply(&args, ctx)
        }
    }
}

/// Evaluate `ir` and reduce the value to a boolean by truthiness.
pub fn evaluate_condition(ir: &IrExpr, ctx: &EvaluationContext) -> EvalResult<bool> {
    evaluate(ir, ctx).map(|v| v.truthy())
}

fn evaluate_all(items: &[IrExpr], ctx: &EvaluationContext) -> EvalResult<Vec<Value>> {
    items.iter().map(|item| evaluate(item, ctx)).collect()
}

/// `object.property`. Absent objects, non-records and missing fields give `Undefined`;
/// `length` also reads the size of strings and lists.
fn property_of(object: &Value, property: &str) -> Value {
    match (object, property) {
        (Value::Record(fields), _) => fields.get(property).cloned().unwrap_or_default(),
        (Value::String(_) | Value::List(_), "length") => {
            ops::length(property, object).unwrap_or_default()
        }
        _ => Value::Undefined,
    }
}

fn index_of(object: &Value, index: &Value) -> Value {
    match (object, index) {
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default(),
        (Value::Record(fields), Value::String(key)) => {
            fields.get(key).cloned().unwrap_or_default()
        }
        (Value::String(s), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => Value::Undefined,
    }
}

/// Elements a quantifier ranges over. An absent collection is empty.
fn collection_items(operation: &str, collection: Value) -> EvalResult<Vec<Value>> {
    match collection {
        Value::List(items) => Ok(items),
        v if v.is_absent() => Ok(Vec::new()),
        other => Err(EvalError::TypeMismatch {
            operation: operation.to_string(),
            expected: "list",
            found: other.type_name(),
        }),
    }
}

fn satisfies(
    item: &Value,
    variable: &str,
    predicate: &IrExpr,
    ctx: &EvaluationContext,
) -> EvalResult<bool> {
    let scope = ctx.with_variable(variable, item.clone());
    evaluate_condition(predicate, &scope)
}

fn every(
    items: &[Value],
    variable: &str,
    predicate: &IrExpr,
    ctx: &EvaluationContext,
) -> EvalResult<bool> {
    for item in items {
        if !satisfies(item, variable, predicate, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn some(
    items: &[Value],
    variable: &str,
    predicate: &IrExpr,
    ctx: &EvaluationContext,
) -> EvalResult<bool> {
    for item in items {
        if satisfies(item, variable, predicate, ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn entity_query(
    kind: EntityQueryKind,
    entity: &str,
    criteria: Option<&IrExpr>,
    ctx: &EvaluationContext,
) -> EvalResult<Value> {
    let criteria = match criteria {
        None => None,
        Some(ir) => match evaluate(ir, ctx)? {
            Value::Record(fields) => Some(fields),
            other => {
                return Err(EvalError::TypeMismatch {
                    operation: format!("{entity}.{}", kind.method_name()),
                    expected: "record",
                    found: other.type_name(),
                });
            }
        },
    };
    let is_match = |record: &&Value| {
        criteria.as_ref().is_none_or(|criteria| {
            criteria
                .iter()
                .all(|(field, expected)| property_of(record, field) == *expected)
        })
    };

    let records = ctx.entities().collection(entity);
    let result = match kind {
        EntityQueryKind::Exists => Value::Bool(records.iter().any(|r| is_match(&r))),
        EntityQueryKind::Count => Value::from(records.iter().filter(is_match).count()),
        EntityQueryKind::Lookup => records.iter().find(is_match).cloned().unwrap_or_default(),
        EntityQueryKind::All => Value::List(records.iter().filter(is_match).cloned().collect()),
    };
    log::debug!(
        "entity query {}.{} over {} record(s) -> {}",
        entity,
        kind.method_name(),
        records.len(),
        result
    );
    Ok(result)
}
