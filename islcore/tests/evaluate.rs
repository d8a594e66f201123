use islcore::prelude::*;
use islir::prelude::*;

fn empty() -> EvaluationContext {
    create_evaluation_context(ContextOptions::new())
}

fn eval(ir: &IrExpr, ctx: &EvaluationContext) -> Value {
    evaluate(ir, ctx).unwrap()
}

#[test]
fn property_chains_through_absent_values() {
    let b = IrBuilder::new();
    let chain = b.path("a", &["b", "c"]);

    let null_b = create_evaluation_context(
        ContextOptions::new().variable("a", Value::record([("b", Value::Null)])),
    );
    assert!(eval(&chain, &null_b).is_undefined());
    assert_eq!(eval(&b.exists(chain.clone(), true), &null_b), Value::Bool(false));
    assert_eq!(eval(&b.exists(chain.clone(), false), &null_b), Value::Bool(true));

    // Unbound root.
    assert_eq!(eval(&b.exists(chain, true), &empty()), Value::Bool(false));
}

#[test]
fn null_and_undefined_compare_equal() {
    let b = IrBuilder::new();
    let ir = b.eq(b.variable("missing"), b.null());
    assert_eq!(eval(&ir, &empty()), Value::Bool(true));
}

#[test]
fn int_and_float_are_distinct_under_equality() {
    let b = IrBuilder::new();
    assert_eq!(eval(&b.eq(b.int(1), b.float(1.0)), &empty()), Value::Bool(false));
    assert_eq!(eval(&b.eq(b.int(1), b.int(1)), &empty()), Value::Bool(true));
    // Ordering still widens.
    assert_eq!(eval(&b.le(b.int(1), b.float(1.0)), &empty()), Value::Bool(true));
}

#[test]
fn absent_operands_compare_false() {
    let b = IrBuilder::new();
    let ctx = empty();
    assert_eq!(eval(&b.gt(b.variable("x"), b.int(0)), &ctx), Value::Bool(false));
    assert_eq!(eval(&b.le(b.variable("x"), b.int(0)), &ctx), Value::Bool(false));
}

#[test]
fn quantifiers_over_empty_collections() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(ContextOptions::new().variable("xs", Value::list([])));
    let positive = || b.gt(b.variable("x"), b.int(0));

    assert_eq!(eval(&b.quant_all(b.variable("xs"), "x", positive()), &ctx), Value::Bool(true));
    assert_eq!(eval(&b.quant_any(b.variable("xs"), "x", positive()), &ctx), Value::Bool(false));
    assert_eq!(eval(&b.quant_none(b.variable("xs"), "x", positive()), &ctx), Value::Bool(true));
    assert_eq!(eval(&b.quant_count(b.variable("xs"), "x", positive()), &ctx), Value::Int(0));
    assert_eq!(
        eval(&b.array_filter(b.variable("xs"), "x", positive()), &ctx),
        Value::list([])
    );
    // A missing collection behaves like an empty one.
    assert_eq!(
        eval(&b.quant_all(b.variable("nope"), "x", positive()), &empty()),
        Value::Bool(true)
    );
}

#[test]
fn quantifiers_bind_their_variable() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(
        ContextOptions::new()
            .variable("xs", Value::list([1.into(), (-2).into(), 3.into()]))
            .variable("x", "outer"),
    );
    let positive = || b.gt(b.variable("x"), b.int(0));

    assert_eq!(eval(&b.quant_all(b.variable("xs"), "x", positive()), &ctx), Value::Bool(false));
    assert_eq!(eval(&b.quant_any(b.variable("xs"), "x", positive()), &ctx), Value::Bool(true));
    assert_eq!(eval(&b.quant_count(b.variable("xs"), "x", positive()), &ctx), Value::Int(2));
    assert_eq!(
        eval(&b.array_filter(b.variable("xs"), "x", positive()), &ctx),
        Value::list([1.into(), 3.into()])
    );
    // The binding does not leak.
    assert_eq!(eval(&b.variable("x"), &ctx), Value::from("outer"));
}

#[test]
fn division_by_zero_is_zero() {
    let b = IrBuilder::new();
    let ctx = empty();
    let div = b.arithmetic(ArithOp::Div, b.int(10), b.int(0));
    let rem = b.arithmetic(ArithOp::Mod, b.int(10), b.int(0));
    assert_eq!(eval(&div, &ctx), Value::Int(0));
    assert_eq!(eval(&rem, &ctx), Value::Int(0));
}

#[test]
fn boolean_operators_short_circuit() {
    let b = IrBuilder::new();
    let ctx = empty();
    // The second operand would fail: `unknown` is not a built-in.
    let failing = || b.call("unknown", vec![]);

    assert_eq!(eval(&b.and(vec![b.boolean(false), failing()]), &ctx), Value::Bool(false));
    assert_eq!(eval(&b.or(vec![b.boolean(true), failing()]), &ctx), Value::Bool(true));
    assert_eq!(eval(&b.implies(b.boolean(false), failing()), &ctx), Value::Bool(true));
    assert!(matches!(
        evaluate(&b.and(vec![b.boolean(true), failing()]), &ctx),
        Err(EvalError::UnknownFunction { .. })
    ));
}

#[test]
fn empty_connectives_are_identities() {
    let b = IrBuilder::new();
    assert_eq!(eval(&b.and(vec![]), &empty()), Value::Bool(true));
    assert_eq!(eval(&b.or(vec![]), &empty()), Value::Bool(false));
}

#[test]
fn membership_and_includes() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(
        ContextOptions::new()
            .input("status", "active")
            .input("tags", Value::list(["a".into(), "b".into()])),
    );
    let candidates = || vec![b.string("active"), b.string("pending")];

    assert_eq!(
        eval(&b.membership(b.input_field("status"), candidates(), false), &ctx),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&b.membership(b.input_field("status"), candidates(), true), &ctx),
        Value::Bool(false)
    );
    assert_eq!(
        eval(&b.array_includes(b.input_field("tags"), b.string("b")), &ctx),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&b.string_includes(b.input_field("status"), b.string("tiv")), &ctx),
        Value::Bool(true)
    );
}

#[test]
fn string_predicates_and_regex() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(ContextOptions::new().input("email", "Jane@Example.com"));
    let email = || b.input_field("email");

    assert_eq!(
        eval(&b.matches(email(), b.regex("^[a-z]+@example\\.com$", "i")), &ctx),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&b.matches(email(), b.regex("^[a-z]+@example\\.com$", "")), &ctx),
        Value::Bool(false)
    );
    assert_eq!(eval(&b.starts_with(email(), b.string("Jane")), &ctx), Value::Bool(true));
    assert_eq!(eval(&b.ends_with(email(), b.string(".org")), &ctx), Value::Bool(false));
    assert_eq!(eval(&b.string_length(email()), &ctx), Value::Int(16));

    let invalid = b.matches(email(), b.regex("(", ""));
    assert!(matches!(
        evaluate(&invalid, &ctx),
        Err(EvalError::InvalidPattern { .. })
    ));
}

#[test]
fn between_bounds() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(ContextOptions::new().variable("v", 5));
    let between = |lo, hi, inclusive| b.between(b.variable("v"), b.int(lo), b.int(hi), inclusive);

    assert_eq!(eval(&between(5, 10, true), &ctx), Value::Bool(true));
    assert_eq!(eval(&between(5, 10, false), &ctx), Value::Bool(false));
    assert_eq!(eval(&between(1, 4, true), &ctx), Value::Bool(false));
}

#[test]
fn result_and_input_references() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(
        ContextOptions::new()
            .input("amount", 10)
            .result(Value::record([("total", Value::Int(12))])),
    );
    let ir = b.gt(b.result_field("total"), b.input_field("amount"));
    assert_eq!(eval(&ir, &ctx), Value::Bool(true));

    // Outside postcondition scope the result is undefined.
    assert!(eval(&b.result(), &empty()).is_undefined());
}

#[test]
fn old_reads_the_pre_state() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(
        ContextOptions::new()
            .input("balance", 70)
            .pre_state(StateSnapshot {
                input: [("balance".to_string(), Value::Int(100))].into(),
                ..Default::default()
            }),
    );
    let spent = b.arithmetic(
        ArithOp::Sub,
        b.old(b.input_field("balance")),
        b.input_field("balance"),
    );
    assert_eq!(eval(&spent, &ctx), Value::Int(30));
}

#[test]
fn conditional_and_calls() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(
        ContextOptions::new().variable("xs", Value::list([4.into(), 9.into(), 1.into()])),
    );
    let ir = b.conditional(
        b.gt(b.call("max", vec![b.variable("xs")]), b.int(5)),
        b.call("sum", vec![b.variable("xs")]),
        b.int(-1),
    );
    assert_eq!(eval(&ir, &ctx), Value::Int(14));
}

#[test]
fn unsupported_placeholders_fail_at_runtime() {
    let b = IrBuilder::new();
    let ir = b.unsupported("TemporalExpr", vec![b.variable("t")]);
    assert_eq!(
        evaluate(&ir, &empty()),
        Err(EvalError::UnsupportedNode {
            kind: "TemporalExpr".to_string()
        })
    );
}

#[test]
fn type_errors_are_reported() {
    let b = IrBuilder::new();
    let ir = b.arithmetic(ArithOp::Mul, b.string("a"), b.int(2));
    assert!(matches!(
        evaluate(&ir, &empty()),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn both_includes_variants_agree_on_absent_needles() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(
        ContextOptions::new()
            .variable("xs", Value::list([Value::Null, 1.into()]))
            .variable("s", "abc"),
    );
    for target in ["xs", "s", "missing"] {
        let string_form = b.string_includes(b.variable(target), b.null());
        let array_form = b.array_includes(b.variable(target), b.null());
        assert_eq!(serialize_ir(&string_form), serialize_ir(&array_form));
        assert_eq!(eval(&string_form, &ctx), eval(&array_form, &ctx), "{target}");
    }
    assert_eq!(
        eval(&b.string_includes(b.variable("xs"), b.null()), &ctx),
        Value::Bool(true)
    );

    let both = b.and(vec![
        b.string_includes(b.variable("xs"), b.variable("nothing")),
        b.array_includes(b.variable("xs"), b.variable("nothing")),
    ]);
    assert_eq!(
        evaluate_condition(&both, &ctx).unwrap(),
        evaluate_condition(&normalize_ir(&both), &ctx).unwrap()
    );
}

#[test]
fn unknown_regex_flags_are_ignored() {
    let b = IrBuilder::new();
    let ctx = create_evaluation_context(ContextOptions::new().input("s", "caab"));
    let compiled = compile_to_ir(
        &AstNode::method(AstNode::input("s"), "matches", vec![AstNode::regex("a+", "d")]),
        &CompilerContext::new(),
    );
    assert_eq!(eval(&compiled, &ctx), Value::Bool(true));
    assert_eq!(
        eval(&b.matches(b.input_field("s"), b.regex("^b", "v")), &ctx),
        Value::Bool(false)
    );
}
