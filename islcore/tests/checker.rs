use chrono::DateTime;
use islcore::prelude::*;
use islir::prelude::*;

fn quiet() -> CheckerConfig {
    CheckerConfig {
        log_violations: false,
        ..Default::default()
    }
}

fn contracts(b: &IrBuilder) -> Vec<Contract> {
    vec![
        Contract::new(
            ContractKind::Precondition,
            "positive_amount",
            b.gt(b.input_field("amount"), b.int(0)),
        )
        .with_message("amount must be positive"),
        Contract::new(
            ContractKind::Postcondition,
            "balance_decreases",
            b.eq(
                b.result_field("balance"),
                b.arithmetic(
                    ArithOp::Sub,
                    b.old(b.input_field("balance")),
                    b.input_field("amount"),
                ),
            ),
        ),
        Contract::new(
            ContractKind::Invariant,
            "non_negative_balance",
            b.ge(b.result_field("balance"), b.int(0)),
        ),
    ]
}

fn context(amount: i64, balance_after: i64) -> EvaluationContext {
    let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    create_evaluation_context(
        ContextOptions::new()
            .input("amount", amount)
            .input("balance", 100)
            .result(Value::record([("balance", Value::Int(balance_after))]))
            .now(now),
    )
}

#[test]
fn satisfied_contracts_record_nothing() {
    let b = IrBuilder::new();
    let mut checker = ContractChecker::new(quiet());
    let outcomes = checker.check_all(&contracts(&b), &context(30, 70));
    assert!(outcomes.iter().all(CheckOutcome::is_satisfied));
    assert!(!checker.has_violations());
}

#[test]
fn violations_are_recorded_with_details() {
    let b = IrBuilder::new();
    let mut checker = ContractChecker::new(quiet());
    let outcomes = checker.check_all(&contracts(&b), &context(-5, 105));

    assert!(outcomes[0].is_violated());
    assert!(outcomes[1].is_satisfied());
    assert!(outcomes[2].is_satisfied());

    let [violation] = checker.violations() else {
        panic!("expected exactly one violation");
    };
    assert_eq!(violation.kind, ContractKind::Precondition);
    assert_eq!(violation.contract, "positive_amount");
    assert_eq!(violation.message, "amount must be positive");
    assert_eq!(violation.expression, "(input.amount > 0)");
    assert_eq!(violation.actual, Value::Bool(false));
    assert_eq!(violation.timestamp.timestamp_millis(), 1_700_000_000_000);

    checker.clear_violations();
    assert!(!checker.has_violations());
}

#[test]
fn fail_fast_stops_at_first_failure() {
    let b = IrBuilder::new();
    let mut checker = ContractChecker::new(CheckerConfig {
        fail_fast: true,
        ..quiet()
    });
    let outcomes = checker.check_all(&contracts(&b), &context(-5, -1));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(checker.violations().len(), 1);
}

#[test]
fn disabled_kinds_are_skipped() {
    let b = IrBuilder::new();
    let mut checker = ContractChecker::new(CheckerConfig {
        enable_preconditions: false,
        ..quiet()
    });
    let outcomes = checker.check_all(&contracts(&b), &context(-5, 105));
    assert_eq!(outcomes[0], CheckOutcome::Skipped);
    assert!(!checker.has_violations());
}

#[test]
fn evaluation_errors_are_not_violations() {
    let b = IrBuilder::new();
    let contract = Contract::new(
        ContractKind::Invariant,
        "temporal",
        b.unsupported("TemporalExpr", vec![]),
    );
    let mut checker = ContractChecker::new(quiet());
    let outcome = checker.check(&contract, &context(1, 99));
    assert!(matches!(
        outcome,
        CheckOutcome::Unevaluable(EvalError::UnsupportedNode { .. })
    ));
    assert!(!checker.has_violations());
}

#[test]
fn contracts_are_stored_canonically() {
    let b = IrBuilder::new();
    let first = Contract::new(
        ContractKind::Invariant,
        "a",
        b.and(vec![b.variable("y"), b.variable("x")]),
    );
    let second = Contract::new(
        ContractKind::Invariant,
        "b",
        b.and(vec![b.variable("x"), b.and(vec![b.variable("y"), b.variable("x")])]),
    );
    assert_eq!(first.canonical(), "(x && y)");
    assert_eq!(first.canonical(), second.canonical());
}

#[test]
fn verification_keys_follow_ir_and_context() {
    let b = IrBuilder::new();
    let ir = b.or(vec![b.variable("b"), b.variable("a")]);
    let reordered = b.or(vec![b.variable("a"), b.variable("b")]);

    let ctx = context(1, 99);
    assert_eq!(verification_key(&ir, &ctx), verification_key(&reordered, &ctx));
    assert_ne!(
        verification_key(&ir, &ctx),
        verification_key(&ir, &context(2, 98))
    );
    assert!(verification_key(&ir, &ctx).starts_with("(a || b)|now=1700000000000;"));
}
