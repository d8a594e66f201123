//! Islir: the intermediate representation for ISL contract expressions.
//!
//! Preconditions, postconditions and invariants compile from the parser's surface AST into
//! one closed IR. The IR is canonicalized by the normalizer and rendered to a stable
//! textual form used for diagnostics, golden files and cache keys.
//!
//! Pipeline
//!  - [`ir::builder::IrBuilder`]: one constructor per IR variant, each assigning a node id.
//!  - [`compiler`]: AST to IR, with entity-aware rewrites driven by a
//!    [`compiler::CompilerContext`].
//!  - [`normalize`]: flatten, deduplicate and sort commutative operands.
//!  - [`ir::pretty`]: canonical serialization plus a colored pretty printer.
//!
//! Evaluation lives in the `islcore` crate.
//!
//! Example
//! ```
//! use islir::prelude::*;
//!
//! let b = IrBuilder::new();
//! let x = b.gt(b.variable("x"), b.int(0));
//! let y = b.exists(b.variable("y"), true);
//! let first = normalize_ir(&b.and(vec![x.clone(), y.clone()]));
//! let second = normalize_ir(&b.and(vec![y, b.and(vec![x])]));
//! assert_eq!(serialize_ir(&first), "((x > 0) && (y != null))");
//! assert_eq!(serialize_ir(&first), serialize_ir(&second));
//! ```

/// Surface AST handed over by the parser.
pub mod ast;
/// AST to IR compilation.
pub mod compiler;
/// IR node model, builders and pretty printing.
pub mod ir;
/// Canonicalization of IR trees.
pub mod normalize;
/// Stack-based traversal of IR trees.
pub mod walker;

use crate::{ast::AstNode, compiler::CompilerContext, ir::IrExpr};

/// Compile a surface AST to IR with a fresh builder.
pub fn compile_to_ir(ast: &AstNode, ctx: &CompilerContext) -> IrExpr {
    compiler::compile_to_ir(ast, ctx)
}

/// Canonical form of `ir`.
pub fn normalize_ir(ir: &IrExpr) -> IrExpr {
    normalize::normalize(ir)
}

/// Canonical single-line rendering of `ir`.
pub fn serialize_ir(ir: &IrExpr) -> String {
    ir::pretty::serialize(ir)
}

/// Rewind `builder`'s node-id counter so a test run gets reproducible ids.
pub fn reset_node_ids(builder: &ir::builder::IrBuilder) {
    builder.reset();
}

pub mod prelude {
    //! Convenient re-exports for end users.
    //!
    //! - IR types and the builder
    //! - Compiler entry points and the AST
    //! - Normalization, serialization and the pretty printer
    pub use crate::ast::{AstKind, AstNode, BinaryOperator, DurationUnit, UnaryOperator};
    pub use crate::compiler::{Compiler, CompilerContext};
    pub use crate::ir::{
        ArithOp, ArrayPredicateOp, CompareOp, EntityQueryKind, IrExpr, IrKind, IrMap, MapEntry,
        NodeId, NodeType, Number, QuantifierKind, StringOp, builder::IrBuilder, pretty::PrettyIr,
    };
    pub use crate::walker::{WalkerHandle, free_variables, walk, walk_all};
    pub use crate::{compile_to_ir, normalize_ir, reset_node_ids, serialize_ir};
}
