//! Constructors for every IR variant.
//!
//! Role
//! - [`IrBuilder`] is the namespace object holding one pure constructor per node variant.
//! - Each constructor takes a fresh [`NodeId`] from the builder's counter. The counter only
//!   grows; [`IrBuilder::reset`] rewinds it so test runs get reproducible ids.
//! - Constructors validate the shape of their own node only (e.g. entity criteria must be a
//!   map). Type compatibility between nodes is left to the typechecker.
//!
//! Example
//! ```
//! use islir::ir::builder::IrBuilder;
//!
//! let b = IrBuilder::new();
//! let x = b.variable("x");
//! assert_eq!(x.id().raw(), 0);
//! b.reset();
//! assert_eq!(b.variable("y").id().raw(), 0);
//! ```
use std::cell::Cell;

use crate::ir::{
    ArithOp, ArrayPredicateOp, CompareOp, EntityQueryKind, IrExpr, IrKind, IrMap, MapEntry,
    NodeId, Number, QuantifierKind, StringOp,
};

/// Owner of the node-id counter; see the module documentation.
#[derive(Debug, Default)]
pub struct IrBuilder {
    next_id: Cell<u64>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind the id counter to zero.
    pub fn reset(&self) {
        self.next_id.set(0);
    }

    /// Number of ids handed out since creation or the last reset.
    pub fn issued(&self) -> u64 {
        self.next_id.get()
    }

    fn node(&self, kind: IrKind) -> IrExpr {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        IrExpr::new(NodeId::new_from_raw(id), kind)
    }

    // ========================= Literals =========================

    pub fn null(&self) -> IrExpr {
        self.node(IrKind::Null)
    }

    pub fn boolean(&self, value: bool) -> IrExpr {
        self.node(IrKind::Bool(value))
    }

    pub fn number(&self, value: impl Into<Number>) -> IrExpr {
        self.node(IrKind::Number(value.into()))
    }

    pub fn int(&self, value: i64) -> IrExpr {
        self.number(value)
    }

    pub fn float(&self, value: f64) -> IrExpr {
        self.number(value)
    }

    pub fn string(&self, value: impl Into<String>) -> IrExpr {
        self.node(IrKind::String(value.into()))
    }

    pub fn regex(&self, pattern: impl Into<String>, flags: impl Into<String>) -> IrExpr {
        self.node(IrKind::Regex {
            pattern: pattern.into(),
            flags: flags.into(),
        })
    }

    pub fn list(&self, items: Vec<IrExpr>) -> IrExpr {
        self.node(IrKind::List(items))
    }

    /// Map literal from `(key, value)` pairs; insertion order is kept for rendering and a
    /// repeated key takes its last value.
    pub fn map<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, IrExpr)>) -> IrExpr {
        let entries: Vec<MapEntry> = entries
            .into_iter()
            .map(|(key, value)| MapEntry {
                key: key.into(),
                value,
            })
            .collect();
        self.node(IrKind::Map(IrMap::new(entries)))
    }

    // ========================= References =========================

    pub fn variable(&self, name: impl Into<String>) -> IrExpr {
        self.node(IrKind::Variable(name.into()))
    }

    pub fn property(&self, object: IrExpr, property: impl Into<String>) -> IrExpr {
        self.node(IrKind::Property {
            object: Box::new(object),
            property: property.into(),
        })
    }

    /// Property chain `root.p1.p2...` starting from a variable.
    pub fn path(&self, root: &str, properties: &[&str]) -> IrExpr {
        properties
            .iter()
            .fold(self.variable(root), |acc, p| self.property(acc, *p))
    }

    pub fn index(&self, object: IrExpr, index: IrExpr) -> IrExpr {
        self.node(IrKind::Index {
            object: Box::new(object),
            index: Box::new(index),
        })
    }

    /// The whole operation input.
    pub fn input(&self) -> IrExpr {
        self.node(IrKind::Input(None))
    }

    pub fn input_field(&self, field: impl Into<String>) -> IrExpr {
        self.node(IrKind::Input(Some(field.into())))
    }

    /// The whole operation result.
    pub fn result(&self) -> IrExpr {
        self.node(IrKind::Result(None))
    }

    pub fn result_field(&self, field: impl Into<String>) -> IrExpr {
        self.node(IrKind::Result(Some(field.into())))
    }

    pub fn old(&self, inner: IrExpr) -> IrExpr {
        self.node(IrKind::Old(Box::new(inner)))
    }

    // ========================= Existence & comparison =========================

    /// `positive == true` builds `operand != null`, otherwise `operand == null`.
    pub fn exists(&self, operand: IrExpr, positive: bool) -> IrExpr {
        self.node(IrKind::Exists {
            operand: Box::new(operand),
            positive,
        })
    }

    pub fn compare(&self, op: CompareOp, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.node(IrKind::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn lt(&self, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.compare(CompareOp::Lt, lhs, rhs)
    }

    pub fn le(&self, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.compare(CompareOp::Le, lhs, rhs)
    }

    pub fn gt(&self, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.compare(CompareOp::Gt, lhs, rhs)
    }

    pub fn ge(&self, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.compare(CompareOp::Ge, lhs, rhs)
    }

    pub fn equality(&self, lhs: IrExpr, rhs: IrExpr, negated: bool) -> IrExpr {
        self.node(IrKind::Equality {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            negated,
        })
    }

    pub fn eq(&self, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.equality(lhs, rhs, false)
    }

    pub fn ne(&self, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.equality(lhs, rhs, true)
    }

    // ========================= Boolean =========================

    pub fn and(&self, operands: Vec<IrExpr>) -> IrExpr {
        self.node(IrKind::And(operands))
    }

    pub fn or(&self, operands: Vec<IrExpr>) -> IrExpr {
        self.node(IrKind::Or(operands))
    }

    pub fn not(&self, operand: IrExpr) -> IrExpr {
        self.node(IrKind::Not(Box::new(operand)))
    }

    pub fn implies(&self, antecedent: IrExpr, consequent: IrExpr) -> IrExpr {
        self.node(IrKind::Implies {
            antecedent: Box::new(antecedent),
            consequent: Box::new(consequent),
        })
    }

    // ========================= Strings =========================

    pub fn string_length(&self, target: IrExpr) -> IrExpr {
        self.node(IrKind::StringLength(Box::new(target)))
    }

    pub fn string_test(&self, op: StringOp, target: IrExpr, argument: IrExpr) -> IrExpr {
        self.node(IrKind::StringTest {
            op,
            target: Box::new(target),
            argument: Box::new(argument),
        })
    }

    pub fn matches(&self, target: IrExpr, pattern: IrExpr) -> IrExpr {
        self.string_test(StringOp::Matches, target, pattern)
    }

    pub fn string_includes(&self, target: IrExpr, needle: IrExpr) -> IrExpr {
        self.string_test(StringOp::Includes, target, needle)
    }

    pub fn starts_with(&self, target: IrExpr, prefix: IrExpr) -> IrExpr {
        self.string_test(StringOp::StartsWith, target, prefix)
    }

    pub fn ends_with(&self, target: IrExpr, suffix: IrExpr) -> IrExpr {
        self.string_test(StringOp::EndsWith, target, suffix)
    }

    // ========================= Ranges & sets =========================

    pub fn between(&self, value: IrExpr, low: IrExpr, high: IrExpr, inclusive: bool) -> IrExpr {
        self.node(IrKind::Between {
            value: Box::new(value),
            low: Box::new(low),
            high: Box::new(high),
            inclusive,
        })
    }

    pub fn membership(&self, value: IrExpr, candidates: Vec<IrExpr>, negated: bool) -> IrExpr {
        self.node(IrKind::Membership {
            value: Box::new(value),
            candidates,
            negated,
        })
    }

    // ========================= Arrays =========================

    pub fn array_length(&self, target: IrExpr) -> IrExpr {
        self.node(IrKind::ArrayLength(Box::new(target)))
    }

    pub fn array_includes(&self, target: IrExpr, element: IrExpr) -> IrExpr {
        self.node(IrKind::ArrayIncludes {
            target: Box::new(target),
            element: Box::new(element),
        })
    }

    pub fn array_predicate(
        &self,
        op: ArrayPredicateOp,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.node(IrKind::ArrayPredicate {
            op,
            collection: Box::new(collection),
            variable: variable.into(),
            predicate: Box::new(predicate),
        })
    }

    pub fn array_every(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.array_predicate(ArrayPredicateOp::Every, collection, variable, predicate)
    }

    pub fn array_some(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.array_predicate(ArrayPredicateOp::Some, collection, variable, predicate)
    }

    pub fn array_filter(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.array_predicate(ArrayPredicateOp::Filter, collection, variable, predicate)
    }

    // ========================= Quantifiers =========================

    pub fn quantifier(
        &self,
        kind: QuantifierKind,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.node(IrKind::Quantifier {
            kind,
            collection: Box::new(collection),
            variable: variable.into(),
            predicate: Box::new(predicate),
        })
    }

    pub fn quant_all(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.quantifier(QuantifierKind::Universal, collection, variable, predicate)
    }

    pub fn quant_any(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.quantifier(QuantifierKind::Existential, collection, variable, predicate)
    }

    pub fn quant_none(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.quantifier(QuantifierKind::NoneSatisfy, collection, variable, predicate)
    }

    pub fn quant_count(
        &self,
        collection: IrExpr,
        variable: impl Into<String>,
        predicate: IrExpr,
    ) -> IrExpr {
        self.quantifier(QuantifierKind::Count, collection, variable, predicate)
    }

    // ========================= Entity queries =========================

    /// Entity query against the current state, or the pre-state when `pre_state` is set.
    /// `criteria` must be a map node.
    pub fn entity_query(
        &self,
        kind: EntityQueryKind,
        entity: impl Into<String>,
        criteria: Option<IrExpr>,
        pre_state: bool,
    ) -> IrExpr {
        debug_assert!(
            criteria.as_ref().is_none_or(|c| c.kind().is_map()),
            "Entity query criteria must be a map node"
        );
        self.node(IrKind::EntityQuery {
            kind,
            entity: entity.into(),
            criteria: criteria.map(Box::new),
            pre_state,
        })
    }

    pub fn entity_exists(&self, entity: impl Into<String>, criteria: Option<IrExpr>) -> IrExpr {
        self.entity_query(EntityQueryKind::Exists, entity, criteria, false)
    }

    pub fn entity_count(&self, entity: impl Into<String>, criteria: Option<IrExpr>) -> IrExpr {
        self.entity_query(EntityQueryKind::Count, entity, criteria, false)
    }

    pub fn entity_lookup(&self, entity: impl Into<String>, criteria: Option<IrExpr>) -> IrExpr {
        self.entity_query(EntityQueryKind::Lookup, entity, criteria, false)
    }

    pub fn entity_all(&self, entity: impl Into<String>, criteria: Option<IrExpr>) -> IrExpr {
        self.entity_query(EntityQueryKind::All, entity, criteria, false)
    }

    // ========================= Arithmetic, conditional, calls =========================

    pub fn arithmetic(&self, op: ArithOp, lhs: IrExpr, rhs: IrExpr) -> IrExpr {
        self.node(IrKind::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn conditional(&self, condition: IrExpr, then_branch: IrExpr, else_branch: IrExpr) -> IrExpr {
        self.node(IrKind::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn call(&self, function: impl Into<String>, args: Vec<IrExpr>) -> IrExpr {
        self.node(IrKind::Call {
            function: function.into(),
            args,
            unsupported: false,
        })
    }

    /// Placeholder for a surface construct with no compilation rule. `kind` names the
    /// construct; `args` carries whatever children could still be compiled.
    pub fn unsupported(&self, kind: impl Into<String>, args: Vec<IrExpr>) -> IrExpr {
        self.node(IrKind::Call {
            function: kind.into(),
            args,
            unsupported: true,
        })
    }
}
