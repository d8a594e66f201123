//! Contract-expression IR: one closed sum type covering every pattern a contract can state.
//!
//! Role
//! - [`IrKind`] enumerates the node variants (literals, references, boolean connectives,
//!   string/array operations, quantifiers, entity queries, arithmetic, conditionals, calls).
//! - [`IrExpr`] pairs a kind with the [`NodeId`] assigned at construction by an
//!   [`builder::IrBuilder`]. Ids only break ties while sorting; they never take part in
//!   equality or serialization.
//!
//! Equality semantics
//! - [`IrExpr`] compares by structure: same variant, same payload, pairwise-equal children.
//!   Map literals compare as key sets, independent of insertion order.
//!
//! Example
//! ```
//! use islir::ir::builder::IrBuilder;
//! use islir::ir::pretty::serialize;
//!
//! let b = IrBuilder::new();
//! let expr = b.and(vec![b.variable("a"), b.not(b.variable("b"))]);
//! assert_eq!(serialize(&expr), "(a && !b)");
//! ```
pub mod builder;
pub mod pretty;

use smallvec::SmallVec;
use strum::{Display, EnumIs, EnumIter};

/// Construction-order identifier of an IR node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new_from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Numeric literal. Integers and floats are distinct tags; they never compare equal to
/// each other even when numerically equivalent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Widen to `f64` for ordered comparisons.
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value as i64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            // Debug keeps the fractional part (`2.0`), so floats stay distinguishable from ints.
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// Ordered comparison operators. Equality has its own node, [`IrKind::Equality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// Binary string predicates. Length is a separate node since it yields an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum StringOp {
    Matches,
    Includes,
    StartsWith,
    EndsWith,
}

impl StringOp {
    pub fn method_name(self) -> &'static str {
        match self {
            StringOp::Matches => "matches",
            StringOp::Includes => "includes",
            StringOp::StartsWith => "startsWith",
            StringOp::EndsWith => "endsWith",
        }
    }
}

/// Method-style predicates over arrays, each binding one variable in its predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ArrayPredicateOp {
    Every,
    Some,
    /// Keeps the elements satisfying the predicate; yields a list rather than a boolean.
    Filter,
}

impl ArrayPredicateOp {
    pub fn method_name(self) -> &'static str {
        match self {
            ArrayPredicateOp::Every => "every",
            ArrayPredicateOp::Some => "some",
            ArrayPredicateOp::Filter => "filter",
        }
    }
}

/// Contract quantifiers (`all`, `any`, `none`, `count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum QuantifierKind {
    Universal,
    Existential,
    NoneSatisfy,
    /// Number of elements satisfying the predicate; yields an integer.
    Count,
}

impl QuantifierKind {
    pub fn keyword(self) -> &'static str {
        match self {
            QuantifierKind::Universal => "all",
            QuantifierKind::Existential => "any",
            QuantifierKind::NoneSatisfy => "none",
            QuantifierKind::Count => "count",
        }
    }

    /// Resolve a surface keyword (`all`, `any`, `none`, `count`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "all" => Some(QuantifierKind::Universal),
            "any" => Some(QuantifierKind::Existential),
            "none" => Some(QuantifierKind::NoneSatisfy),
            "count" => Some(QuantifierKind::Count),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum EntityQueryKind {
    Exists,
    Count,
    Lookup,
    /// Every matching record, as a list.
    All,
}

impl EntityQueryKind {
    pub fn method_name(self) -> &'static str {
        match self {
            EntityQueryKind::Exists => "exists",
            EntityQueryKind::Count => "count",
            EntityQueryKind::Lookup => "lookup",
            EntityQueryKind::All => "all",
        }
    }

    /// Resolve an entity method name as written in contracts.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "exists" => Some(EntityQueryKind::Exists),
            "count" => Some(EntityQueryKind::Count),
            "lookup" => Some(EntityQueryKind::Lookup),
            "all" | "getAll" => Some(EntityQueryKind::All),
            _ => None,
        }
    }
}

/// Single `key: value` entry of a map literal.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: String,
    pub value: IrExpr,
}

/// Ordered `{key: value}` literal. Order is kept for rendering but ignored by equality.
/// Keys are unique.
#[derive(Debug, Clone, Default)]
pub struct IrMap {
    entries: Vec<MapEntry>,
}

impl IrMap {
    /// A repeated key keeps the position of its first occurrence and the value of its last.
    pub fn new(entries: Vec<MapEntry>) -> Self {
        let mut unique: Vec<MapEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match unique.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => existing.value = entry.value,
                None => unique.push(entry),
            }
        }
        Self { entries: unique }
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<MapEntry> {
        self.entries
    }

    pub fn get(&self, key: &str) -> Option<&IrExpr> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for IrMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|entry| other.get(&entry.key) == Some(&entry.value))
    }
}

/// Fieldless discriminant of [`IrKind`], used in diagnostics and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum NodeType {
    Null,
    Bool,
    Number,
    String,
    Regex,
    List,
    Map,
    Variable,
    Property,
    Index,
    Input,
    Result,
    Old,
    Exists,
    Compare,
    Equality,
    And,
    Or,
    Not,
    Implies,
    StringLength,
    StringTest,
    Between,
    Membership,
    ArrayLength,
    ArrayIncludes,
    ArrayPredicate,
    Quantifier,
    EntityQuery,
    Arithmetic,
    Conditional,
    Call,
}

/// Payload of an IR node.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum IrKind {
    // Literals
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Regex {
        pattern: String,
        flags: String,
    },
    List(Vec<IrExpr>),
    Map(IrMap),

    // References
    Variable(String),
    Property {
        object: Box<IrExpr>,
        property: String,
    },
    Index {
        object: Box<IrExpr>,
        index: Box<IrExpr>,
    },
    /// `input` or `input.field`.
    Input(Option<String>),
    /// `result` or `result.field`; only bound in postcondition scope.
    Result(Option<String>),
    /// Evaluate the inner expression against the pre-operation state.
    Old(Box<IrExpr>),

    /// `positive == true` reads "is not null/undefined".
    Exists {
        operand: Box<IrExpr>,
        positive: bool,
    },

    Compare {
        op: CompareOp,
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
    },
    /// Deep structural equality, inverted when `negated`.
    Equality {
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
        negated: bool,
    },

    And(Vec<IrExpr>),
    Or(Vec<IrExpr>),
    Not(Box<IrExpr>),
    Implies {
        antecedent: Box<IrExpr>,
        consequent: Box<IrExpr>,
    },

    StringLength(Box<IrExpr>),
    StringTest {
        op: StringOp,
        target: Box<IrExpr>,
        argument: Box<IrExpr>,
    },

    /// One inclusivity flag covers both ends.
    Between {
        value: Box<IrExpr>,
        low: Box<IrExpr>,
        high: Box<IrExpr>,
        inclusive: bool,
    },

    Membership {
        value: Box<IrExpr>,
        candidates: Vec<IrExpr>,
        negated: bool,
    },

    ArrayLength(Box<IrExpr>),
    ArrayIncludes {
        target: Box<IrExpr>,
        element: Box<IrExpr>,
    },
    ArrayPredicate {
        op: ArrayPredicateOp,
        collection: Box<IrExpr>,
        variable: String,
        predicate: Box<IrExpr>,
    },

    Quantifier {
        kind: QuantifierKind,
        collection: Box<IrExpr>,
        variable: String,
        predicate: Box<IrExpr>,
    },

    /// `criteria` is always a map node when present.
    EntityQuery {
        kind: EntityQueryKind,
        entity: String,
        criteria: Option<Box<IrExpr>>,
        pre_state: bool,
    },

    /// Division and modulo by zero evaluate to `0`.
    Arithmetic {
        op: ArithOp,
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
    },

    Conditional {
        condition: Box<IrExpr>,
        then_branch: Box<IrExpr>,
        else_branch: Box<IrExpr>,
    },

    /// Built-in call. With `unsupported` set, `function` names the surface construct that
    /// had no compilation rule and the node must not be evaluated.
    Call {
        function: String,
        args: Vec<IrExpr>,
        unsupported: bool,
    },
}

/// Immutable IR node: a [`NodeId`] plus its [`IrKind`] payload.
#[derive(Debug, Clone)]
pub struct IrExpr {
    id: NodeId,
    kind: IrKind,
}

impl PartialEq for IrExpr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl IrExpr {
    pub(crate) fn new(id: NodeId, kind: IrKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &IrKind {
        &self.kind
    }

    pub fn into_kind(self) -> IrKind {
        self.kind
    }

    /// Produce a new node with the same id and a different payload. Rewrites keep the id of
    /// the node they replace.
    pub(crate) fn rebuild(&self, kind: IrKind) -> IrExpr {
        IrExpr { id: self.id, kind }
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            IrKind::Null => NodeType::Null,
            IrKind::Bool(_) => NodeType::Bool,
            IrKind::Number(_) => NodeType::Number,
            IrKind::String(_) => NodeType::String,
            IrKind::Regex { .. } => NodeType::Regex,
            IrKind::List(_) => NodeType::List,
            IrKind::Map(_) => NodeType::Map,
            IrKind::Variable(_) => NodeType::Variable,
            IrKind::Property { .. } => NodeType::Property,
            IrKind::Index { .. } => NodeType::Index,
            IrKind::Input(_) => NodeType::Input,
            IrKind::Result(_) => NodeType::Result,
            IrKind::Old(_) => NodeType::Old,
            IrKind::Exists { .. } => NodeType::Exists,
            IrKind::Compare { .. } => NodeType::Compare,
            IrKind::Equality { .. } => NodeType::Equality,
            IrKind::And(_) => NodeType::And,
            IrKind::Or(_) => NodeType::Or,
            IrKind::Not(_) => NodeType::Not,
            IrKind::Implies { .. } => NodeType::Implies,
            IrKind::StringLength(_) => NodeType::StringLength,
            IrKind::StringTest { .. } => NodeType::StringTest,
            IrKind::Between { .. } => NodeType::Between,
            IrKind::Membership { .. } => NodeType::Membership,
            IrKind::ArrayLength(_) => NodeType::ArrayLength,
            IrKind::ArrayIncludes { .. } => NodeType::ArrayIncludes,
            IrKind::ArrayPredicate { .. } => NodeType::ArrayPredicate,
            IrKind::Quantifier { .. } => NodeType::Quantifier,
            IrKind::EntityQuery { .. } => NodeType::EntityQuery,
            IrKind::Arithmetic { .. } => NodeType::Arithmetic,
            IrKind::Conditional { .. } => NodeType::Conditional,
            IrKind::Call { .. } => NodeType::Call,
        }
    }

    /// Direct children in rendering order.
    pub fn children(&self) -> SmallVec<[&IrExpr; 4]> {
        let mut out = SmallVec::new();
        match &self.kind {
            IrKind::Null
            | IrKind::Bool(_)
            | IrKind::Number(_)
            | IrKind::String(_)
            | IrKind::Regex { .. }
            | IrKind::Variable(_)
            | IrKind::Input(_)
            | IrKind::Result(_) => {}
            IrKind::List(items) | IrKind::And(items) | IrKind::Or(items) => out.extend(items),
            IrKind::Map(map) => out.extend(map.entries().iter().map(|e| &e.value)),
            IrKind::Property { object, .. } => out.push(&**object),
            IrKind::Index { object, index } => {
                out.push(&**object);
                out.push(&**index);
            }
            IrKind::Old(inner)
            | IrKind::Not(inner)
            | IrKind::StringLength(inner)
            | IrKind::ArrayLength(inner) => out.push(&**inner),
            IrKind::Exists { operand, .. } => out.push(&**operand),
            IrKind::Compare { lhs, rhs, .. }
            | IrKind::Equality { lhs, rhs, .. }
            | IrKind::Arithmetic { lhs, rhs, .. } => {
                out.push(&**lhs);
                out.push(&**rhs);
            }
            IrKind::Implies {
                antecedent,
                consequent,
            } => {
                out.push(&**antecedent);
                out.push(&**consequent);
            }
            IrKind::StringTest {
                target, argument, ..
            } => {
                out.push(&**target);
                out.push(&**argument);
            }
            IrKind::Between {
                value, low, high, ..
            } => {
                out.push(&**value);
                out.push(&**low);
                out.push(&**high);
            }
            IrKind::Membership {
                value, candidates, ..
            } => {
                out.push(&**value);
                out.extend(candidates);
            }
            IrKind::ArrayIncludes { target, element } => {
                out.push(&**target);
                out.push(&**element);
            }
            IrKind::ArrayPredicate {
                collection,
                predicate,
                ..
            }
            | IrKind::Quantifier {
                collection,
                predicate,
                ..
            } => {
                out.push(&**collection);
                out.push(&**predicate);
            }
            IrKind::EntityQuery { criteria, .. } => {
                if let Some(criteria) = criteria {
                    out.push(&**criteria);
                }
            }
            IrKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(&**condition);
                out.push(&**then_branch);
                out.push(&**else_branch);
            }
            IrKind::Call { args, .. } => out.extend(args),
        }
        out
    }

    /// Rebuild this node with every direct child passed through `f`, keeping the variant,
    /// its scalar payload, and child order.
    pub fn map_children(&self, mut f: impl FnMut(&IrExpr) -> IrExpr) -> IrExpr {
        let mut boxed = |e: &IrExpr| Box::new(f(e));
        let kind = match &self.kind {
            IrKind::Null
            | IrKind::Bool(_)
            | IrKind::Number(_)
            | IrKind::String(_)
            | IrKind::Regex { .. }
            | IrKind::Variable(_)
            | IrKind::Input(_)
            | IrKind::Result(_) => self.kind.clone(),
            IrKind::List(items) => IrKind::List(items.iter().map(|e| *boxed(e)).collect()),
            IrKind::Map(map) => IrKind::Map(IrMap::new(
                map.entries()
                    .iter()
                    .map(|e| MapEntry {
                        key: e.key.clone(),
                        value: *boxed(&e.value),
                    })
                    .collect(),
            )),
            IrKind::Property { object, property } => IrKind::Property {
                object: boxed(object),
                property: property.clone(),
            },
            IrKind::Index { object, index } => IrKind::Index {
                object: boxed(object),
                index: boxed(index),
            },
            IrKind::Old(inner) => IrKind::Old(boxed(inner)),
            IrKind::Exists { operand, positive } => IrKind::Exists {
                operand: boxed(operand),
                positive: *positive,
            },
            IrKind::Compare { op, lhs, rhs } => IrKind::Compare {
                op: *op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
            },
            IrKind::Equality { lhs, rhs, negated } => IrKind::Equality {
                lhs: boxed(lhs),
                rhs: boxed(rhs),
                negated: *negated,
            },
            IrKind::And(items) => IrKind::And(items.iter().map(|e| *boxed(e)).collect()),
            IrKind::Or(items) => IrKind::Or(items.iter().map(|e| *boxed(e)).collect()),
            IrKind::Not(inner) => IrKind::Not(boxed(inner)),
            IrKind::Implies {
                antecedent,
                consequent,
            } => IrKind::Implies {
                antecedent: boxed(antecedent),
                consequent: boxed(consequent),
            },
            IrKind::StringLength(inner) => IrKind::StringLength(boxed(inner)),
            IrKind::StringTest {
                op,
                target,
                argument,
            } => IrKind::StringTest {
                op: *op,
                target: boxed(target),
                argument: boxed(argument),
            },
            IrKind::Between {
                value,
                low,
                high,
                inclusive,
            } => IrKind::Between {
                value: boxed(value),
                low: boxed(low),
                high: boxed(high),
                inclusive: *inclusive,
            },
            IrKind::Membership {
                value,
                candidates,
                negated,
            } => IrKind::Membership {
                value: boxed(value),
                candidates: candidates.iter().map(|e| *boxed(e)).collect(),
                negated: *negated,
            },
            IrKind::ArrayLength(inner) => IrKind::ArrayLength(boxed(inner)),
            IrKind::ArrayIncludes { target, element } => IrKind::ArrayIncludes {
                target: boxed(target),
                element: boxed(element),
            },
            IrKind::ArrayPredicate {
                op,
                collection,
                variable,
                predicate,
            } => IrKind::ArrayPredicate {
                op: *op,
                collection: boxed(collection),
                variable: variable.clone(),
                predicate: boxed(predicate),
            },
            IrKind::Quantifier {
                kind,
                collection,
                variable,
                predicate,
            } => IrKind::Quantifier {
                kind: *kind,
                collection: boxed(collection),
                variable: variable.clone(),
                predicate: boxed(predicate),
            },
            IrKind::EntityQuery {
                kind,
                entity,
                criteria,
                pre_state,
            } => IrKind::EntityQuery {
                kind: *kind,
                entity: entity.clone(),
                criteria: criteria.as_deref().map(&mut boxed),
                pre_state: *pre_state,
            },
            IrKind::Arithmetic { op, lhs, rhs } => IrKind::Arithmetic {
                op: *op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
            },
            IrKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => IrKind::Conditional {
                condition: boxed(condition),
                then_branch: boxed(then_branch),
                else_branch: boxed(else_branch),
            },
            IrKind::Call {
                function,
                args,
                unsupported,
            } => IrKind::Call {
                function: function.clone(),
                args: args.iter().map(|e| *boxed(e)).collect(),
                unsupported: *unsupported,
            },
        };
        self.rebuild(kind)
    }

    /// Surface constructs that compiled to unsupported placeholders, in pre-order.
    pub fn unsupported_kinds(&self) -> Vec<String> {
        let mut found = Vec::new();
        crate::walker::walk_all(self, |node| {
            if let IrKind::Call {
                function,
                unsupported: true,
                ..
            } = node.kind()
            {
                found.push(function.clone());
            }
        });
        found
    }

    /// True if this tree reads post-operation data (`result`) or pre-state (`old`), which
    /// is only meaningful in postcondition scope.
    pub fn references_post_state(&self) -> bool {
        let mut found = false;
        crate::walker::walk_all(self, |node| {
            found |= matches!(
                node.kind(),
                IrKind::Result(_)
                    | IrKind::Old(_)
                    | IrKind::EntityQuery {
                        pre_state: true,
                        ..
                    }
            );
        });
        found
    }
}
