//! Surface AST consumed by the compiler.
//!
//! The parser lives outside this crate; it hands over [`AstNode`] trees whose
//! [`AstKind`] covers every expression shape a contract can take. Source locations are
//! carried for diagnostics above this layer and never reach the IR.
use crate::ir::{Number, QuantifierKind};

/// Position of a node in its source file (1-based line and column).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    /// Factor converting one unit to milliseconds.
    pub fn multiplier(self) -> i64 {
        match self {
            DurationUnit::Milliseconds => 1,
            DurationUnit::Seconds => 1_000,
            DurationUnit::Minutes => 60_000,
            DurationUnit::Hours => 3_600_000,
            DurationUnit::Days => 86_400_000,
        }
    }

    /// Resolve a unit as written after a numeric literal (`5.seconds`, `300ms`).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ms" | "millisecond" | "milliseconds" => Some(DurationUnit::Milliseconds),
            "s" | "sec" | "second" | "seconds" => Some(DurationUnit::Seconds),
            "m" | "min" | "minute" | "minutes" => Some(DurationUnit::Minutes),
            "h" | "hour" | "hours" => Some(DurationUnit::Hours),
            "d" | "day" | "days" => Some(DurationUnit::Days),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Implies,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    In,
}

impl BinaryOperator {
    /// Resolve a surface operator token. Keyword and symbolic spellings are both accepted.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => BinaryOperator::Eq,
            "!=" => BinaryOperator::NotEq,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::Le,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::Ge,
            "and" | "&&" => BinaryOperator::And,
            "or" | "||" => BinaryOperator::Or,
            "implies" | "=>" => BinaryOperator::Implies,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Sub,
            "*" => BinaryOperator::Mul,
            "/" => BinaryOperator::Div,
            "%" => BinaryOperator::Mod,
            "in" => BinaryOperator::In,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
}

/// Shape of a surface expression.
#[derive(Debug, Clone, PartialEq)]
pub enum AstKind {
    Identifier(String),
    /// Dotted name resolved by the parser, e.g. `User.exists` as a callee.
    QualifiedName(Vec<String>),
    StringLiteral(String),
    NumberLiteral(Number),
    BooleanLiteral(bool),
    NullLiteral,
    DurationLiteral {
        value: f64,
        unit: DurationUnit,
    },
    RegexLiteral {
        pattern: String,
        flags: String,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<AstNode>,
    },
    Call {
        callee: Box<AstNode>,
        arguments: Vec<AstNode>,
    },
    Member {
        object: Box<AstNode>,
        property: String,
    },
    Index {
        object: Box<AstNode>,
        index: Box<AstNode>,
    },
    Quantifier {
        quantifier: QuantifierKind,
        variable: String,
        collection: Box<AstNode>,
        predicate: Box<AstNode>,
    },
    Conditional {
        condition: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Box<AstNode>,
    },
    Old(Box<AstNode>),
    Result(Option<String>),
    Input(String),
    Lambda {
        params: Vec<String>,
        body: Box<AstNode>,
    },
    List(Vec<AstNode>),
    Map(Vec<(String, AstNode)>),
    /// A parser node kind with no counterpart here.
    Unknown {
        kind: String,
        children: Vec<AstNode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: AstKind,
    pub location: SourceLocation,
}

impl AstNode {
    pub fn new(kind: AstKind) -> Self {
        Self {
            kind,
            location: SourceLocation::default(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Parser-facing name of this node's kind (`BinaryExpr`, `LambdaExpr`, ...).
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            AstKind::Identifier(_) => "Identifier",
            AstKind::QualifiedName(_) => "QualifiedName",
            AstKind::StringLiteral(_) => "StringLiteral",
            AstKind::NumberLiteral(_) => "NumberLiteral",
            AstKind::BooleanLiteral(_) => "BooleanLiteral",
            AstKind::NullLiteral => "NullLiteral",
            AstKind::DurationLiteral { .. } => "DurationLiteral",
            AstKind::RegexLiteral { .. } => "RegexLiteral",
            AstKind::Binary { .. } => "BinaryExpr",
            AstKind::Unary { .. } => "UnaryExpr",
            AstKind::Call { .. } => "CallExpr",
            AstKind::Member { .. } => "MemberExpr",
            AstKind::Index { .. } => "IndexExpr",
            AstKind::Quantifier { .. } => "QuantifierExpr",
            AstKind::Conditional { .. } => "ConditionalExpr",
            AstKind::Old(_) => "OldExpr",
            AstKind::Result(_) => "ResultExpr",
            AstKind::Input(_) => "InputExpr",
            AstKind::Lambda { .. } => "LambdaExpr",
            AstKind::List(_) => "ListExpr",
            AstKind::Map(_) => "MapExpr",
            AstKind::Unknown { kind, .. } => kind,
        }
    }

    // Shorthand constructors, mostly for tests and hand-built trees.

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(AstKind::Identifier(name.into()))
    }

    pub fn qualified(parts: &[&str]) -> Self {
        Self::new(AstKind::QualifiedName(
            parts.iter().map(|p| p.to_string()).collect(),
        ))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(AstKind::StringLiteral(value.into()))
    }

    pub fn number(value: impl Into<Number>) -> Self {
        Self::new(AstKind::NumberLiteral(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(AstKind::BooleanLiteral(value))
    }

    pub fn null() -> Self {
        Self::new(AstKind::NullLiteral)
    }

    pub fn duration(value: f64, unit: DurationUnit) -> Self {
        Self::new(AstKind::DurationLiteral { value, unit })
    }

    pub fn regex(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::new(AstKind::RegexLiteral {
            pattern: pattern.into(),
            flags: flags.into(),
        })
    }

    pub fn binary(operator: BinaryOperator, left: AstNode, right: AstNode) -> Self {
        Self::new(AstKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(operator: UnaryOperator, operand: AstNode) -> Self {
        Self::new(AstKind::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    pub fn call(callee: AstNode, arguments: Vec<AstNode>) -> Self {
        Self::new(AstKind::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    pub fn member(object: AstNode, property: impl Into<String>) -> Self {
        Self::new(AstKind::Member {
            object: Box::new(object),
            property: property.into(),
        })
    }

    /// `receiver.method(arguments)`.
    pub fn method(receiver: AstNode, method: impl Into<String>, arguments: Vec<AstNode>) -> Self {
        Self::call(Self::member(receiver, method), arguments)
    }

    pub fn index(object: AstNode, index: AstNode) -> Self {
        Self::new(AstKind::Index {
            object: Box::new(object),
            index: Box::new(index),
        })
    }

    pub fn quantifier(
        quantifier: QuantifierKind,
        variable: impl Into<String>,
        collection: AstNode,
        predicate: AstNode,
    ) -> Self {
        Self::new(AstKind::Quantifier {
            quantifier,
            variable: variable.into(),
            collection: Box::new(collection),
            predicate: Box::new(predicate),
        })
    }

    pub fn conditional(condition: AstNode, then_branch: AstNode, else_branch: AstNode) -> Self {
        Self::new(AstKind::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn old(inner: AstNode) -> Self {
        Self::new(AstKind::Old(Box::new(inner)))
    }

    pub fn result(property: Option<&str>) -> Self {
        Self::new(AstKind::Result(property.map(str::to_string)))
    }

    pub fn input(property: impl Into<String>) -> Self {
        Self::new(AstKind::Input(property.into()))
    }

    pub fn lambda(params: &[&str], body: AstNode) -> Self {
        Self::new(AstKind::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Box::new(body),
        })
    }

    pub fn list(items: Vec<AstNode>) -> Self {
        Self::new(AstKind::List(items))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, AstNode)>) -> Self {
        Self::new(AstKind::Map(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }
}
