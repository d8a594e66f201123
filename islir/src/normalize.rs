//! Canonicalization of IR trees.
//!
//! [`normalize`] is a pure, idempotent, bottom-up rewrite:
//! - `AND`/`OR` absorb nested connectives of the same kind, drop operands whose canonical
//!   form repeats an earlier one, collapse to their identity (`true`/`false`) when empty or
//!   to their operand when singleton, and otherwise sort operands by canonical form.
//! - Membership candidate lists are sorted by canonical form; duplicates are kept.
//! - Map literal entries are sorted by key. Map equality ignores entry order, so the
//!   canonical form must as well.
//! - Every other node keeps its shape; only its children are normalized.
//!
//! Rewritten nodes keep the id of the node they replace. Ids only break ties between
//! operands whose canonical forms are identical, which never changes the rendered output.
//!
//! Example
//! ```
//! use islir::ir::builder::IrBuilder;
//! use islir::ir::pretty::serialize;
//! use islir::normalize::normalize;
//!
//! let b = IrBuilder::new();
//! let nested = b.and(vec![b.variable("c"), b.and(vec![b.variable("a"), b.variable("c")])]);
//! assert_eq!(serialize(&normalize(&nested)), "(a && c)");
//! assert_eq!(serialize(&normalize(&b.or(vec![]))), "false");
//! ```
use smallvec::SmallVec;

use crate::ir::{IrExpr, IrKind, IrMap, MapEntry, pretty::serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn identity(self) -> bool {
        matches!(self, Connective::And)
    }

    fn operands(self, kind: &IrKind) -> Option<&[IrExpr]> {
        match (self, kind) {
            (Connective::And, IrKind::And(ops)) | (Connective::Or, IrKind::Or(ops)) => Some(ops),
            _ => None,
        }
    }

    fn build(self, operands: Vec<IrExpr>) -> IrKind {
        match self {
            Connective::And => IrKind::And(operands),
            Connective::Or => IrKind::Or(operands),
        }
    }
}

/// Rewrite `ir` into canonical form. See the module documentation for the rules.
pub fn normalize(ir: &IrExpr) -> IrExpr {
    log::trace!("normalizing {} node {}", ir.node_type(), ir.id());
    normalize_node(ir)
}

/// Structural equality of canonical forms: `normalize(a) == normalize(b)`.
pub fn equivalent(a: &IrExpr, b: &IrExpr) -> bool {
    serialize(&normalize(a)) == serialize(&normalize(b))
}

fn normalize_node(ir: &IrExpr) -> IrExpr {
    match ir.kind() {
        IrKind::And(operands) => normalize_connective(ir, operands, Connective::And),
        IrKind::Or(operands) => normalize_connective(ir, operands, Connective::Or),
        IrKind::Membership {
            value,
            candidates,
            negated,
        } => {
            let keyed = sort_canonical(candidates.iter().map(normalize_node).collect());
            ir.rebuild(IrKind::Membership {
                value: Box::new(normalize_node(value)),
                candidates: keyed.into_iter().map(|(_, e)| e).collect(),
                negated: *negated,
            })
        }
        IrKind::Map(map) => {
            let mut entries: Vec<MapEntry> = map
                .entries()
                .iter()
                .map(|e| MapEntry {
                    key: e.key.clone(),
                    value: normalize_node(&e.value),
                })
                .collect();
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            ir.rebuild(IrKind::Map(IrMap::new(entries)))
        }
        _ => ir.map_children(normalize_node),
    }
}

fn normalize_connective(ir: &IrExpr, operands: &[IrExpr], connective: Connective) -> IrExpr {
    // Children are normalized first, so a child of the same kind is already flat; splicing
    // its operands once reaches the fixed point.
    let mut flat: SmallVec<[IrExpr; 8]> = SmallVec::new();
    for operand in operands {
        let normalized = normalize_node(operand);
        match connective.operands(normalized.kind()) {
            Some(inner) => flat.extend(inner.iter().cloned()),
            None => flat.push(normalized),
        }
    }

    let mut keyed = sort_canonical(flat.into_vec());
    keyed.dedup_by(|later, earlier| later.0 == earlier.0);

    match keyed.len() {
        0 => ir.rebuild(IrKind::Bool(connective.identity())),
        1 => keyed.pop().map(|(_, e)| e).unwrap_or_else(|| ir.clone()),
        _ => ir.rebuild(connective.build(keyed.into_iter().map(|(_, e)| e).collect())),
    }
}

/// Pair each expression with its canonical form and sort by (form, id).
fn sort_canonical(exprs: Vec<IrExpr>) -> Vec<(String, IrExpr)> {
    let mut keyed: Vec<(String, IrExpr)> = exprs.into_iter().map(|e| (serialize(&e), e)).collect();
    keyed.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.id().cmp(&b.id())));
    keyed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::IrBuilder;

    #[test]
    fn singleton_connective_unwraps() {
        let b = IrBuilder::new();
        let x = b.gt(b.variable("x"), b.int(0));
        let n = normalize(&b.or(vec![x.clone()]));
        assert_eq!(n, x);
    }

    #[test]
    fn or_does_not_absorb_and() {
        let b = IrBuilder::new();
        let e = b.or(vec![
            b.and(vec![b.variable("b"), b.variable("a")]),
            b.variable("c"),
        ]);
        assert_eq!(serialize(&normalize(&e)), "((a && b) || c)");
    }

    #[test]
    fn rewritten_node_keeps_original_id() {
        let b = IrBuilder::new();
        let e = b.and(vec![b.variable("b"), b.variable("a")]);
        assert_eq!(normalize(&e).id(), e.id());
    }

    #[test]
    fn membership_keeps_duplicates_sorted() {
        let b = IrBuilder::new();
        let e = b.membership(
            b.variable("s"),
            vec![b.string("b"), b.string("a"), b.string("b")],
            false,
        );
        assert_eq!(
            serialize(&normalize(&e)),
            "(s in [\"a\", \"b\", \"b\"])"
        );
    }
}
