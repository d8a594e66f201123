//! Canonical serializer and RcDoc-based pretty-printer for IR trees.
//!
//! Role
//! - [`serialize`] renders the canonical textual form. The normalizer compares and sorts
//!   operands by it, and verification caches key on it, so the rules below are a stable
//!   format: binary forms are parenthesized (`(a && b)`, `(x > 0)`), `!a` has no space,
//!   property chains are dot-joined, lists render as `[1, 2, 3]`, maps as `{k: v}`.
//! - The same document renders with termcolor annotations for terminals
//!   ([`PrettyIr::pretty_print`]).
//!
//! Node ids never appear in the output.
//!
//! Performance
//! - Building the doc is O(n) in the size of the tree. No soft line breaks are emitted, so
//!   the layout is a single line whatever the width.
use std::io::{self, Write};

use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ir::{IrExpr, IrKind, IrMap};

/// Annotation attached to each fragment of a rendered IR document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct, // commas, dots, brackets, colons
    /// Paren pair at a nesting depth; both sides of a pair get the same color.
    Paren(u8),
    Keyword,  // null, true, false, old, all, in
    Operator, // &&, ||, =>, ==, <, +
    Ident,    // variables, properties, functions, entities
    Literal,  // numbers, strings, regexes
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    5 => Color::Magenta,
                    _ => unreachable!(),
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
        }
        s
    }
}

type Doc = RcDoc<'static, Style>;

fn styled(style: Style, s: &'static str) -> Doc {
    RcDoc::as_string(s).annotate(style)
}

fn punct(s: &'static str) -> Doc {
    styled(Style::Punct, s)
}

#[inline]
fn lparen(depth: u8) -> Doc {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> Doc {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn kw(s: &'static str) -> Doc {
    styled(Style::Keyword, s)
}

fn op(s: &'static str) -> Doc {
    styled(Style::Operator, s)
}

fn ident(name: &str) -> Doc {
    RcDoc::as_string(name.to_string()).annotate(Style::Ident)
}

fn literal(text: String) -> Doc {
    RcDoc::as_string(text).annotate(Style::Literal)
}

/// Quote a string literal with `\"`, `\\`, `\n`, `\r` and `\t` escapes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `(lhs <symbol> rhs)`
fn binary(lhs: &IrExpr, symbol: &'static str, rhs: Doc, depth: u8) -> Doc {
    lparen(depth)
        .append(to_doc_with_depth(lhs, depth.wrapping_add(1)))
        .append(RcDoc::space())
        .append(op(symbol))
        .append(RcDoc::space())
        .append(rhs)
        .append(rparen(depth))
        .group()
}

/// Comma-separated children, no delimiters.
fn comma_separated<'e>(items: impl IntoIterator<Item = &'e IrExpr>, depth: u8) -> Doc {
    RcDoc::intersperse(
        items.into_iter().map(|e| to_doc_with_depth(e, depth)),
        punct(", "),
    )
}

/// `head(args...)`
fn call_like<'e>(head: Doc, args: impl IntoIterator<Item = &'e IrExpr>, depth: u8) -> Doc {
    head.append(lparen(depth))
        .append(comma_separated(args, depth.wrapping_add(1)))
        .append(rparen(depth))
        .group()
}

/// `target.method(args...)`
fn method<'e>(
    target: &IrExpr,
    name: &'static str,
    args: impl IntoIterator<Item = &'e IrExpr>,
    depth: u8,
) -> Doc {
    call_like(
        to_doc_with_depth(target, depth)
            .append(punct("."))
            .append(ident(name)),
        args,
        depth,
    )
}

fn list_doc(items: &[IrExpr], depth: u8) -> Doc {
    punct("[")
        .append(comma_separated(items, depth))
        .append(punct("]"))
        .group()
}

fn map_doc(map: &IrMap, depth: u8) -> Doc {
    let entries = map.entries().iter().map(|e| {
        ident(&e.key)
            .append(punct(": "))
            .append(to_doc_with_depth(&e.value, depth))
    });
    punct("{")
        .append(RcDoc::intersperse(entries, punct(", ")))
        .append(punct("}"))
        .group()
}

fn field_ref(root: &'static str, field: &Option<String>) -> Doc {
    match field {
        None => kw(root),
        Some(field) => kw(root).append(punct(".")).append(ident(field)),
    }
}

/// `(a && b && c)`; the empty connective renders as its identity and a singleton as its
/// operand, matching what normalization produces.
fn connective(operands: &[IrExpr], symbol: &'static str, identity: &'static str, depth: u8) -> Doc {
    match operands {
        [] => kw(identity),
        [single] => to_doc_with_depth(single, depth),
        _ => {
            let sep = RcDoc::space()
                .append(op(symbol))
                .append(RcDoc::space());
            lparen(depth)
                .append(RcDoc::intersperse(
                    operands.iter().map(|e| to_doc_with_depth(e, depth.wrapping_add(1))),
                    sep,
                ))
                .append(rparen(depth))
                .group()
        }
    }
}

/// Depth-aware renderer; `depth` drives parenthesis coloring only.
fn to_doc_with_depth(e: &IrExpr, depth: u8) -> Doc {
    match e.kind() {
        // Literals
        IrKind::Null => kw("null"),
        IrKind::Bool(true) => kw("true"),
        IrKind::Bool(false) => kw("false"),
        IrKind::Number(n) => literal(n.to_string()),
        IrKind::String(s) => literal(quote_string(s)),
        IrKind::Regex { pattern, flags } => literal(format!("/{pattern}/{flags}")),
        IrKind::List(items) => list_doc(items, depth),
        IrKind::Map(map) => map_doc(map, depth),

        // References
        IrKind::Variable(name) => ident(name),
        IrKind::Property { object, property } => to_doc_with_depth(object, depth)
            .append(punct("."))
            .append(ident(property)),
        IrKind::Index { object, index } => to_doc_with_depth(object, depth)
            .append(punct("["))
            .append(to_doc_with_depth(index, depth))
            .append(punct("]")),
        IrKind::Input(field) => field_ref("input", field),
        IrKind::Result(field) => field_ref("result", field),
        IrKind::Old(inner) => call_like(kw("old"), [&**inner], depth),

        // Existence & comparison
        IrKind::Exists { operand, positive } => binary(
            operand,
            if *positive { "!=" } else { "==" },
            kw("null"),
            depth,
        ),
        IrKind::Compare { op: cmp, lhs, rhs } => {
            binary(lhs, cmp.symbol(), to_doc_with_depth(rhs, depth.wrapping_add(1)), depth)
        }
        IrKind::Equality { lhs, rhs, negated } => binary(
            lhs,
            if *negated { "!=" } else { "==" },
            to_doc_with_depth(rhs, depth.wrapping_add(1)),
            depth,
        ),

        // Boolean
        IrKind::And(operands) => connective(operands, "&&", "true", depth),
        IrKind::Or(operands) => connective(operands, "||", "false", depth),
        IrKind::Not(inner) => op("!").append(to_doc_with_depth(inner, depth)).group(),
        IrKind::Implies {
            antecedent,
            consequent,
        } => binary(
            antecedent,
            "=>",
            to_doc_with_depth(consequent, depth.wrapping_add(1)),
            depth,
        ),

        // Strings & arrays. Both length nodes share `x.length`; they evaluate alike.
        IrKind::StringLength(target) | IrKind::ArrayLength(target) => {
            to_doc_with_depth(target, depth)
                .append(punct("."))
                .append(ident("length"))
        }
        IrKind::StringTest {
            op: string_op,
            target,
            argument,
        } => method(target, string_op.method_name(), [&**argument], depth),
        IrKind::ArrayIncludes { target, element } => {
            method(target, "includes", [&**element], depth)
        }
        IrKind::ArrayPredicate {
            op: array_op,
            collection,
            variable,
            predicate,
        } => to_doc_with_depth(collection, depth)
            .append(punct("."))
            .append(ident(array_op.method_name()))
            .append(lparen(depth))
            .append(ident(variable))
            .append(RcDoc::space())
            .append(op("=>"))
            .append(RcDoc::space())
            .append(to_doc_with_depth(predicate, depth.wrapping_add(1)))
            .append(rparen(depth))
            .group(),

        // Ranges & sets
        IrKind::Between {
            value,
            low,
            high,
            inclusive,
        } => {
            let symbol = if *inclusive { "<=" } else { "<" };
            lparen(depth)
                .append(to_doc_with_depth(low, depth.wrapping_add(1)))
                .append(RcDoc::space())
                .append(op(symbol))
                .append(RcDoc::space())
                .append(to_doc_with_depth(value, depth.wrapping_add(1)))
                .append(RcDoc::space())
                .append(op(symbol))
                .append(RcDoc::space())
                .append(to_doc_with_depth(high, depth.wrapping_add(1)))
                .append(rparen(depth))
                .group()
        }
        IrKind::Membership {
            value,
            candidates,
            negated,
        } => binary(
            value,
            if *negated { "not in" } else { "in" },
            list_doc(candidates, depth.wrapping_add(1)),
            depth,
        ),

        IrKind::Quantifier {
            kind,
            collection,
            variable,
            predicate,
        } => kw(kind.keyword())
            .append(lparen(depth))
            .append(ident(variable))
            .append(RcDoc::space())
            .append(kw("in"))
            .append(RcDoc::space())
            .append(to_doc_with_depth(collection, depth.wrapping_add(1)))
            .append(punct(", "))
            .append(to_doc_with_depth(predicate, depth.wrapping_add(1)))
            .append(rparen(depth))
            .group(),

        IrKind::EntityQuery {
            kind,
            entity,
            criteria,
            pre_state,
        } => {
            let head = ident(entity)
                .append(punct("."))
                .append(kw(kind.method_name()));
            if *pre_state {
                let query = call_like(head, criteria.as_deref(), depth.wrapping_add(1));
                kw("old")
                    .append(lparen(depth))
                    .append(query)
                    .append(rparen(depth))
                    .group()
            } else {
                call_like(head, criteria.as_deref(), depth)
            }
        }

        IrKind::Arithmetic {
            op: arith,
            lhs,
            rhs,
        } => binary(lhs, arith.symbol(), to_doc_with_depth(rhs, depth.wrapping_add(1)), depth),

        IrKind::Conditional {
            condition,
            then_branch,
            else_branch,
        } => lparen(depth)
            .append(to_doc_with_depth(condition, depth.wrapping_add(1)))
            .append(RcDoc::space())
            .append(op("?"))
            .append(RcDoc::space())
            .append(to_doc_with_depth(then_branch, depth.wrapping_add(1)))
            .append(RcDoc::space())
            .append(op(":"))
            .append(RcDoc::space())
            .append(to_doc_with_depth(else_branch, depth.wrapping_add(1)))
            .append(rparen(depth))
            .group(),

        IrKind::Call {
            function,
            args,
            unsupported: false,
        } => call_like(ident(function), args, depth),
        IrKind::Call {
            function,
            args,
            unsupported: true,
        } => {
            let mut inner = ident(function);
            for arg in args {
                inner = inner
                    .append(punct(", "))
                    .append(to_doc_with_depth(arg, depth.wrapping_add(1)));
            }
            kw("unsupported")
                .append(lparen(depth))
                .append(inner)
                .append(rparen(depth))
                .group()
        }
    }
}

/// `pretty` render target forwarding text to a termcolor sink, switching color on every
/// annotation boundary.
struct StyledSink<'w, W> {
    sink: &'w mut W,
}

impl<W: WriteColor> pretty::Render for StyledSink<'_, W> {
    type Error = io::Error;

    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.sink.write_all(s.as_bytes())?;
        Ok(s.len())
    }

    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.sink.write_all(s.as_bytes())
    }

    fn fail_doc(&self) -> io::Error {
        io::Error::other("IR document could not be laid out")
    }
}

impl<'a, W: WriteColor> RenderAnnotated<'a, Style> for StyledSink<'_, W> {
    fn push_annotation(&mut self, style: &'a Style) -> io::Result<()> {
        self.sink.set_color(&style.to_color_spec())
    }

    fn pop_annotation(&mut self) -> io::Result<()> {
        self.sink.reset()
    }
}

/// Canonical single-line rendering of `ir`.
pub fn serialize(ir: &IrExpr) -> String {
    let mut buf = String::new();
    let _ = to_doc_with_depth(ir, 0).render_fmt(80, &mut buf);
    buf
}

/// Pretty-printing conveniences for IR trees.
pub trait PrettyIr {
    /// Build an RcDoc representation with style annotations.
    fn pretty_doc(&self) -> RcDoc<'static, Style>;

    /// Render with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()>;

    /// Print to stdout with colors (TTY-aware) at the terminal width.
    fn pretty_print(&self) -> io::Result<()>;

    /// Plain canonical string, same as [`serialize`].
    fn pretty_string(&self) -> String;
}

impl PrettyIr for IrExpr {
    #[inline]
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self, 0)
    }

    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        self.pretty_doc().render_raw(width, &mut StyledSink { sink: out })
    }

    fn pretty_print(&self) -> io::Result<()> {
        let width = term_size::dimensions().map_or(80, |(columns, _)| columns);
        let stream = StandardStream::stdout(ColorChoice::Auto);
        let mut out = stream.lock();
        self.pretty_render_to(width, &mut out)?;
        writeln!(out)
    }

    #[inline]
    fn pretty_string(&self) -> String {
        serialize(self)
    }
}

impl std::fmt::Display for IrExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = FmtWrite::new(f);
        self.pretty_doc().render_raw(80, &mut w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::IrBuilder;

    #[test]
    fn quote_string_escapes() {
        assert_eq!(quote_string("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn display_matches_serialize() {
        let b = IrBuilder::new();
        let e = b.implies(b.variable("a"), b.gt(b.variable("x"), b.int(0)));
        assert_eq!(e.to_string(), serialize(&e));
        assert_eq!(serialize(&e), "(a => (x > 0))");
    }

    #[test]
    fn colored_render_contains_plain_text() {
        let b = IrBuilder::new();
        let e = b.not(b.variable("flag"));
        let mut out = termcolor::Buffer::no_color();
        e.pretty_render_to(80, &mut out).unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "!flag");
    }

    #[test]
    fn ansi_render_switches_colors() {
        let b = IrBuilder::new();
        let e = b.and(vec![b.variable("a"), b.variable("b")]);
        let mut out = termcolor::Buffer::ansi();
        e.pretty_render_to(80, &mut out).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.contains("\x1b["));
        assert!(text.contains("&&"));
    }
}
