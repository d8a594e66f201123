//! Surface AST to IR compilation.
//!
//! Compilation is total: every [`AstNode`] produces an [`IrExpr`]. Shapes with no rule
//! become `Call` nodes flagged `unsupported` (see [`IrExpr::unsupported_kinds`]) so a
//! single gap never aborts the whole contract.
//!
//! The rewrites applied here:
//! - `x == null` / `x != null` (either side null) become existence checks.
//! - `Entity.exists|count|lookup|all|getAll(...)` on a known entity become entity queries,
//!   tagged as pre-state inside `old(...)`.
//! - `not (x in [...])` folds into a negated membership.
//! - `a implies b` becomes an implication node.
//! - Durations become integer millisecond literals.
//!
//! Example
//! ```
//! use islir::ast::{AstNode, BinaryOperator};
//! use islir::compiler::{CompilerContext, compile_to_ir};
//!
//! let ast = AstNode::binary(
//!     BinaryOperator::Implies,
//!     AstNode::ident("success"),
//!     AstNode::method(AstNode::ident("User"), "exists", vec![AstNode::result(Some("id"))]),
//! );
//! let ctx = CompilerContext::with_entities(["User"]);
//! let ir = compile_to_ir(&ast, &ctx);
//! assert_eq!(ir.to_string(), "(success => User.exists({id: result.id}))");
//! ```
use std::collections::BTreeSet;

use crate::{
    ast::{AstKind, AstNode, BinaryOperator, DurationUnit, UnaryOperator},
    ir::{
        ArithOp, ArrayPredicateOp, CompareOp, EntityQueryKind, IrExpr, IrKind, Number,
        QuantifierKind, StringOp, builder::IrBuilder,
    },
};

/// Field name used for a single non-map entity query argument when none can be inferred.
pub const DEFAULT_CRITERIA_FIELD: &str = "id";

/// Compilation scope: the entity type names of the current domain and whether we are
/// inside an `old(...)` expression.
///
/// Contexts are values. Entering `old` derives a new context with
/// [`CompilerContext::entered_old`]; the parent is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerContext {
    entities: BTreeSet<String>,
    in_old: bool,
}

impl CompilerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities<S: Into<String>>(entities: impl IntoIterator<Item = S>) -> Self {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            in_old: false,
        }
    }

    pub fn add_entity(&mut self, name: impl Into<String>) {
        self.entities.insert(name.into());
    }

    pub fn is_entity(&self, name: &str) -> bool {
        self.entities.contains(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(String::as_str)
    }

    pub fn in_old(&self) -> bool {
        self.in_old
    }

    /// Copy of this context with the old-scope flag set.
    pub fn entered_old(&self) -> Self {
        Self {
            entities: self.entities.clone(),
            in_old: true,
        }
    }
}

/// AST compiler bound to a caller-owned builder, so ids stay monotonic across several
/// compiled expressions.
pub struct Compiler<'b> {
    builder: &'b IrBuilder,
}

/// Compile `ast` with a fresh builder.
pub fn compile_to_ir(ast: &AstNode, ctx: &CompilerContext) -> IrExpr {
    let builder = IrBuilder::new();
    Compiler::new(&builder).compile(ast, ctx)
}

impl<'b> Compiler<'b> {
    pub fn new(builder: &'b IrBuilder) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &'b IrBuilder {
        self.builder
    }

    pub fn compile(&self, ast: &AstNode, ctx: &CompilerContext) -> IrExpr {
        let b = self.builder;
        match &ast.kind {
            AstKind::Identifier(name) => self.compile_identifier(name),
            AstKind::QualifiedName(parts) => match parts.split_first() {
                Some((root, rest)) => rest
                    .iter()
                    .fold(self.compile_identifier(root), |object, part| {
                        self.field_access(object, part)
                    }),
                None => self.unsupported(ast, vec![]),
            },
            AstKind::StringLiteral(value) => b.string(value.as_str()),
            AstKind::NumberLiteral(value) => b.number(*value),
            AstKind::BooleanLiteral(value) => b.boolean(*value),
            AstKind::NullLiteral => b.null(),
            AstKind::DurationLiteral { value, unit } => {
                b.int(duration_millis(*value, unit.multiplier()))
            }
            AstKind::RegexLiteral { pattern, flags } => b.regex(pattern.as_str(), flags.as_str()),

            AstKind::Binary {
                operator,
                left,
                right,
            } => self.compile_binary(*operator, left, right, ctx),

            AstKind::Unary { operator, operand } => match operator {
                UnaryOperator::Not => {
                    let inner = self.compile(operand, ctx);
                    if let IrKind::Membership {
                        value,
                        candidates,
                        negated,
                    } = inner.kind()
                    {
                        return inner.rebuild(IrKind::Membership {
                            value: value.clone(),
                            candidates: candidates.clone(),
                            negated: !negated,
                        });
                    }
                    b.not(inner)
                }
                UnaryOperator::Neg => match &operand.kind {
                    AstKind::NumberLiteral(Number::Int(i)) => match i.checked_neg() {
                        Some(n) => b.int(n),
                        None => b.float(-(*i as f64)),
                    },
                    AstKind::NumberLiteral(Number::Float(f)) => b.float(-*f),
                    _ => b.arithmetic(ArithOp::Sub, b.int(0), self.compile(operand, ctx)),
                },
            },

            AstKind::Call { callee, arguments } => self.compile_call(ast, callee, arguments, ctx),

            AstKind::Member { object, property } => {
                if property == "length" {
                    return self.length_of(object, ctx);
                }
                if let AstKind::NumberLiteral(n) = &object.kind
                    && let Some(unit) = DurationUnit::from_suffix(property)
                {
                    return b.int(duration_millis(n.as_f64(), unit.multiplier()));
                }
                let object = self.compile(object, ctx);
                self.field_access(object, property)
            }

            AstKind::Index { object, index } => {
                b.index(self.compile(object, ctx), self.compile(index, ctx))
            }

            AstKind::Quantifier {
                quantifier,
                variable,
                collection,
                predicate,
            } => b.quantifier(
                *quantifier,
                self.compile(collection, ctx),
                variable.as_str(),
                self.compile(predicate, ctx),
            ),

            AstKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => b.conditional(
                self.compile(condition, ctx),
                self.compile(then_branch, ctx),
                self.compile(else_branch, ctx),
            ),

            AstKind::Old(inner) => self.compile_old(inner, ctx),
            AstKind::Result(None) => b.result(),
            AstKind::Result(Some(field)) => b.result_field(field.as_str()),
            AstKind::Input(field) if field.is_empty() => b.input(),
            AstKind::Input(field) => b.input_field(field.as_str()),

            AstKind::List(items) => b.list(items.iter().map(|i| self.compile(i, ctx)).collect()),
            AstKind::Map(entries) => b.map(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_str(), self.compile(value, ctx))),
            ),

            // A lambda only has meaning as the argument of an array method.
            AstKind::Lambda { body, .. } => {
                let body = self.compile(body, ctx);
                self.unsupported(ast, vec![body])
            }
            AstKind::Unknown { children, .. } => {
                let args = children.iter().map(|c| self.compile(c, ctx)).collect();
                self.unsupported(ast, args)
            }
        }
    }

    fn compile_identifier(&self, name: &str) -> IrExpr {
        match name {
            "input" => self.builder.input(),
            "result" => self.builder.result(),
            _ => self.builder.variable(name),
        }
    }

    /// `object.field`, folding into `input.field` / `result.field` when possible.
    fn field_access(&self, object: IrExpr, field: &str) -> IrExpr {
        match object.kind() {
            IrKind::Input(None) => self.builder.input_field(field),
            IrKind::Result(None) => self.builder.result_field(field),
            _ => self.builder.property(object, field),
        }
    }

    fn length_of(&self, object: &AstNode, ctx: &CompilerContext) -> IrExpr {
        let target = self.compile(object, ctx);
        if matches!(object.kind, AstKind::StringLiteral(_)) {
            self.builder.string_length(target)
        } else {
            self.builder.array_length(target)
        }
    }

    fn compile_binary(
        &self,
        operator: BinaryOperator,
        left: &AstNode,
        right: &AstNode,
        ctx: &CompilerContext,
    ) -> IrExpr {
        let b = self.builder;
        match operator {
            BinaryOperator::Eq | BinaryOperator::NotEq => {
                let not_equal = operator == BinaryOperator::NotEq;
                // `x != null` reads "x exists".
                match (&left.kind, &right.kind) {
                    (_, AstKind::NullLiteral) => b.exists(self.compile(left, ctx), not_equal),
                    (AstKind::NullLiteral, _) => b.exists(self.compile(right, ctx), not_equal),
                    _ => b.equality(self.compile(left, ctx), self.compile(right, ctx), not_equal),
                }
            }
            BinaryOperator::Lt => self.compare(CompareOp::Lt, left, right, ctx),
            BinaryOperator::Le => self.compare(CompareOp::Le, left, right, ctx),
            BinaryOperator::Gt => self.compare(CompareOp::Gt, left, right, ctx),
            BinaryOperator::Ge => self.compare(CompareOp::Ge, left, right, ctx),
            BinaryOperator::And => b.and(vec![self.compile(left, ctx), self.compile(right, ctx)]),
            BinaryOperator::Or => b.or(vec![self.compile(left, ctx), self.compile(right, ctx)]),
            BinaryOperator::Implies => {
                b.implies(self.compile(left, ctx), self.compile(right, ctx))
            }
            BinaryOperator::Add => self.arithmetic(ArithOp::Add, left, right, ctx),
            BinaryOperator::Sub => self.arithmetic(ArithOp::Sub, left, right, ctx),
            BinaryOperator::Mul => self.arithmetic(ArithOp::Mul, left, right, ctx),
            BinaryOperator::Div => self.arithmetic(ArithOp::Div, left, right, ctx),
            BinaryOperator::Mod => self.arithmetic(ArithOp::Mod, left, right, ctx),
            BinaryOperator::In => {
                let value = self.compile(left, ctx);
                match &right.kind {
                    AstKind::List(items) => b.membership(
                        value,
                        items.iter().map(|i| self.compile(i, ctx)).collect(),
                        false,
                    ),
                    _ => b.array_includes(self.compile(right, ctx), value),
                }
            }
        }
    }

    fn compare(
        &self,
        op: CompareOp,
        left: &AstNode,
        right: &AstNode,
        ctx: &CompilerContext,
    ) -> IrExpr {
        self.builder
            .compare(op, self.compile(left, ctx), self.compile(right, ctx))
    }

    fn arithmetic(
        &self,
        op: ArithOp,
        left: &AstNode,
        right: &AstNode,
        ctx: &CompilerContext,
    ) -> IrExpr {
        self.builder
            .arithmetic(op, self.compile(left, ctx), self.compile(right, ctx))
    }

    fn compile_old(&self, inner: &AstNode, ctx: &CompilerContext) -> IrExpr {
        let compiled = self.compile(inner, &ctx.entered_old());
        match compiled.kind() {
            // Already reads pre-state on its own.
            IrKind::EntityQuery {
                pre_state: true, ..
            }
            | IrKind::Old(_) => compiled,
            _ => self.builder.old(compiled),
        }
    }

    fn compile_call(
        &self,
        ast: &AstNode,
        callee: &AstNode,
        arguments: &[AstNode],
        ctx: &CompilerContext,
    ) -> IrExpr {
        let b = self.builder;
        match &callee.kind {
            AstKind::Member { object, property } => {
                if let AstKind::Identifier(name) = &object.kind
                    && ctx.is_entity(name)
                    && let Some(kind) = EntityQueryKind::from_method(property)
                {
                    return self.entity_query(ast, kind, name, arguments, ctx);
                }
                self.compile_method(ast, object, property, arguments, ctx)
            }
            AstKind::QualifiedName(parts) => match parts.as_slice() {
                [entity, method] if ctx.is_entity(entity) => {
                    match EntityQueryKind::from_method(method) {
                        Some(kind) => self.entity_query(ast, kind, entity, arguments, ctx),
                        None => b.call(parts.join("."), self.compile_all(arguments, ctx)),
                    }
                }
                _ => b.call(parts.join("."), self.compile_all(arguments, ctx)),
            },
            AstKind::Identifier(name) => match (name.as_str(), arguments) {
                ("old", [inner]) => self.compile_old(inner, ctx),
                ("between", [value, low, high]) => b.between(
                    self.compile(value, ctx),
                    self.compile(low, ctx),
                    self.compile(high, ctx),
                    true,
                ),
                _ => b.call(name.as_str(), self.compile_all(arguments, ctx)),
            },
            _ => {
                let mut args = vec![self.compile(callee, ctx)];
                args.extend(self.compile_all(arguments, ctx));
                self.unsupported(ast, args)
            }
        }
    }

    /// `receiver.method(args)` where the receiver is not a known entity.
    fn compile_method(
        &self,
        ast: &AstNode,
        receiver: &AstNode,
        method: &str,
        arguments: &[AstNode],
        ctx: &CompilerContext,
    ) -> IrExpr {
        let b = self.builder;
        let string_op = match method {
            "startsWith" => Some(StringOp::StartsWith),
            "endsWith" => Some(StringOp::EndsWith),
            "matches" => Some(StringOp::Matches),
            _ => None,
        };
        if let Some(op) = string_op {
            return match arguments {
                [argument] => {
                    b.string_test(op, self.compile(receiver, ctx), self.compile(argument, ctx))
                }
                _ => self.unsupported_method(ast, receiver, arguments, ctx),
            };
        }

        let predicate_op = match method {
            "every" => Some(ArrayPredicateOp::Every),
            "some" => Some(ArrayPredicateOp::Some),
            "filter" => Some(ArrayPredicateOp::Filter),
            _ => None,
        };
        if let Some(op) = predicate_op {
            return match arguments {
                [lambda] => match single_param_lambda(lambda) {
                    Some((variable, body)) => b.array_predicate(
                        op,
                        self.compile(receiver, ctx),
                        variable,
                        self.compile(body, ctx),
                    ),
                    None => self.unsupported_method(ast, receiver, arguments, ctx),
                },
                _ => self.unsupported_method(ast, receiver, arguments, ctx),
            };
        }

        match (method, arguments) {
            ("includes" | "contains", [argument]) => {
                let literal_string = |n: &AstNode| matches!(n.kind, AstKind::StringLiteral(_));
                let target = self.compile(receiver, ctx);
                let element = self.compile(argument, ctx);
                if literal_string(receiver) || literal_string(argument) {
                    b.string_includes(target, element)
                } else {
                    b.array_includes(target, element)
                }
            }
            ("length", []) => self.length_of(receiver, ctx),
            ("all" | "any" | "none" | "count", [lambda]) => {
                match (QuantifierKind::from_keyword(method), single_param_lambda(lambda)) {
                    (Some(kind), Some((variable, body))) => b.quantifier(
                        kind,
                        self.compile(receiver, ctx),
                        variable,
                        self.compile(body, ctx),
                    ),
                    _ => self.generic_method(receiver, method, arguments, ctx),
                }
            }
            _ => self.generic_method(receiver, method, arguments, ctx),
        }
    }

    /// `Type.fn(args)` on a capitalized name keeps the qualified name; any other receiver
    /// becomes the first argument of `fn`.
    fn generic_method(
        &self,
        receiver: &AstNode,
        method: &str,
        arguments: &[AstNode],
        ctx: &CompilerContext,
    ) -> IrExpr {
        if let AstKind::Identifier(name) = &receiver.kind
            && name.starts_with(|c: char| c.is_ascii_uppercase())
        {
            return self
                .builder
                .call(format!("{name}.{method}"), self.compile_all(arguments, ctx));
        }
        let mut args = vec![self.compile(receiver, ctx)];
        args.extend(self.compile_all(arguments, ctx));
        self.builder.call(method, args)
    }

    fn unsupported_method(
        &self,
        ast: &AstNode,
        receiver: &AstNode,
        arguments: &[AstNode],
        ctx: &CompilerContext,
    ) -> IrExpr {
        let mut args = vec![self.compile(receiver, ctx)];
        args.extend(self.compile_all(arguments, ctx));
        self.unsupported(ast, args)
    }

    fn entity_query(
        &self,
        ast: &AstNode,
        kind: EntityQueryKind,
        entity: &str,
        arguments: &[AstNode],
        ctx: &CompilerContext,
    ) -> IrExpr {
        let b = self.builder;
        let criteria = match arguments {
            [] => None,
            [argument] if matches!(argument.kind, AstKind::Map(_)) => {
                Some(self.compile(argument, ctx))
            }
            [argument] => {
                let value = self.compile(argument, ctx);
                let field = inferred_field(&value).to_string();
                Some(b.map([(field, value)]))
            }
            _ => {
                let args = self.compile_all(arguments, ctx);
                return self.unsupported(ast, args);
            }
        };
        log::trace!(
            "entity query {}.{} (pre-state: {})",
            entity,
            kind.method_name(),
            ctx.in_old()
        );
        b.entity_query(kind, entity, criteria, ctx.in_old())
    }

    fn compile_all(&self, nodes: &[AstNode], ctx: &CompilerContext) -> Vec<IrExpr> {
        nodes.iter().map(|n| self.compile(n, ctx)).collect()
    }

    fn unsupported(&self, ast: &AstNode, args: Vec<IrExpr>) -> IrExpr {
        let loc = &ast.location;
        log::warn!(
            "no compilation rule for {} at {}:{}:{}; emitting unsupported placeholder",
            ast.kind_name(),
            loc.file,
            loc.line,
            loc.column
        );
        self.builder.unsupported(ast.kind_name(), args)
    }
}

/// Trailing field name of a property-like access, or [`DEFAULT_CRITERIA_FIELD`].
fn inferred_field(ir: &IrExpr) -> &str {
    match ir.kind() {
        IrKind::Property { property, .. } => property,
        IrKind::Input(Some(field)) | IrKind::Result(Some(field)) => field,
        IrKind::Old(inner) => inferred_field(inner),
        _ => DEFAULT_CRITERIA_FIELD,
    }
}

fn single_param_lambda(node: &AstNode) -> Option<(&str, &AstNode)> {
    match &node.kind {
        AstKind::Lambda { params, body } if params.len() == 1 => {
            Some((params[0].as_str(), &**body))
        }
        _ => None,
    }
}

fn duration_millis(value: f64, multiplier: i64) -> i64 {
    (value * multiplier as f64).round() as i64
}
