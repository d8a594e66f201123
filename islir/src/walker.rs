//! Iterative walkers over IR trees.
//!
//! Two traversal helpers, both driven by an explicit stack rather than recursion:
//! - [`walk`]: thread a state value of any type; each visit decides which children to visit
//!   next and with which state (useful for tracking bound variables).
//! - [`walk_all`]: visit every node in pre-order, no state.
//!
//! Example: collect free variables, ignoring quantifier-bound names
//! ```
//! use islir::ir::builder::IrBuilder;
//! use islir::walker::free_variables;
//!
//! let b = IrBuilder::new();
//! let pred = b.gt(b.variable("x"), b.variable("limit"));
//! let expr = b.quant_all(b.variable("xs"), "x", pred);
//! let free: Vec<_> = free_variables(&expr).into_iter().collect();
//! assert_eq!(free, vec!["limit".to_string(), "xs".to_string()]);
//! ```
use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::ir::{IrExpr, IrKind};

/// Handle passed to the visitor of [`walk`] for scheduling further work.
pub struct WalkerHandle<'a, S> {
    scheduled: SmallVec<[(&'a IrExpr, S); 4]>,
    stop: bool,
}

impl<'a, S> WalkerHandle<'a, S> {
    /// Visit `child` later with the given state.
    pub fn schedule_visit(&mut self, child: &'a IrExpr, state: S) {
        self.scheduled.push((child, state));
    }

    /// Abort the whole traversal once the current visit returns.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

impl<'a, S: Clone> WalkerHandle<'a, S> {
    /// Visit every direct child of `node` with a copy of `state`.
    pub fn schedule_children(&mut self, node: &'a IrExpr, state: S) {
        for child in node.children() {
            self.schedule_visit(child, state.clone());
        }
    }
}

/// Walk `root` with an initial state. Only children scheduled through the handle are
/// visited, in the order they were scheduled.
pub fn walk<'a, S>(
    root: &'a IrExpr,
    init: S,
    mut visitor: impl FnMut(S, &'a IrExpr, &mut WalkerHandle<'a, S>),
) {
    let mut stack: Vec<(&'a IrExpr, S)> = vec![(root, init)];
    let mut handle = WalkerHandle {
        scheduled: SmallVec::new(),
        stop: false,
    };

    while let Some((node, state)) = stack.pop() {
        visitor(state, node, &mut handle);
        if handle.stop {
            return;
        }
        // Reverse so that the first scheduled child is popped first.
        while let Some(item) = handle.scheduled.pop() {
            stack.push(item);
        }
    }
}

/// Visit every node of `root` in pre-order.
pub fn walk_all<'a>(root: &'a IrExpr, mut visitor: impl FnMut(&'a IrExpr)) {
    walk(root, (), |_, node, handle| {
        visitor(node);
        handle.schedule_children(node, ());
    });
}

/// Names read through [`IrKind::Variable`] that are not bound by an enclosing quantifier or
/// array predicate.
pub fn free_variables(root: &IrExpr) -> BTreeSet<String> {
    let mut free = BTreeSet::new();
    walk(root, Vec::<&str>::new(), |bound, node, handle| match node.kind() {
        IrKind::Variable(name) => {
            if !bound.contains(&name.as_str()) {
                free.insert(name.clone());
            }
        }
        IrKind::Quantifier {
            collection,
            variable,
            predicate,
            ..
        }
        | IrKind::ArrayPredicate {
            collection,
            variable,
            predicate,
            ..
        } => {
            handle.schedule_visit(collection, bound.clone());
            let mut inner = bound;
            inner.push(variable.as_str());
            handle.schedule_visit(predicate, inner);
        }
        _ => handle.schedule_children(node, bound),
    });
    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::IrBuilder;

    #[test]
    fn walk_all_visits_in_preorder() {
        let b = IrBuilder::new();
        let expr = b.and(vec![b.variable("a"), b.not(b.variable("b"))]);
        let mut seen = Vec::new();
        walk_all(&expr, |node| seen.push(node.node_type().to_string()));
        assert_eq!(seen, vec!["And", "Variable", "Not", "Variable"]);
    }

    #[test]
    fn stop_aborts_traversal() {
        let b = IrBuilder::new();
        let expr = b.or(vec![b.variable("a"), b.variable("b"), b.variable("c")]);
        let mut visited = 0;
        walk(&expr, (), |_, node, handle| {
            visited += 1;
            if matches!(node.kind(), IrKind::Variable(name) if name == "a") {
                handle.stop();
                return;
            }
            handle.schedule_children(node, ());
        });
        assert_eq!(visited, 2);
    }

    #[test]
    fn bound_variables_are_not_free() {
        let b = IrBuilder::new();
        let expr = b.array_every(
            b.property(b.variable("order"), "items"),
            "item",
            b.gt(b.property(b.variable("item"), "qty"), b.int(0)),
        );
        let free: Vec<_> = free_variables(&expr).into_iter().collect();
        assert_eq!(free, vec!["order".to_string()]);
    }
}
