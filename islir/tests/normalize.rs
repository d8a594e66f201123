use islir::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random boolean-ish tree over a small alphabet so duplicates and nesting show up often.
fn random_tree(b: &IrBuilder, rng: &mut impl Rng, budget: usize) -> IrExpr {
    if budget == 0 || rng.random_bool(0.3) {
        return match rng.random_range(0..5) {
            0 => b.variable(["a", "b", "c"][rng.random_range(0..3)]),
            1 => b.gt(b.variable("x"), b.int(rng.random_range(0..3))),
            2 => b.exists(b.input_field("email"), rng.random_bool(0.5)),
            3 => b.boolean(rng.random_bool(0.5)),
            _ => b.entity_exists(
                "User",
                Some(b.map([("id", b.string("u1")), ("status", b.string("active"))])),
            ),
        };
    }
    let arity = rng.random_range(0..4);
    let children: Vec<IrExpr> = (0..arity)
        .map(|_| random_tree(b, rng, budget - 1))
        .collect();
    match rng.random_range(0..5) {
        0 | 1 => b.and(children),
        2 => b.or(children),
        3 => b.not(random_tree(b, rng, budget - 1)),
        _ => b.membership(
            b.variable("s"),
            (0..arity)
                .map(|i| b.string(["p", "q", "r"][(i + rng.random_range(0..3)) % 3]))
                .collect(),
            rng.random_bool(0.5),
        ),
    }
}

#[test]
fn normalize_is_idempotent() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x15_1a);
    let b = IrBuilder::new();
    for _ in 0..200 {
        let tree = random_tree(&b, &mut rng, 5);
        let once = normalize_ir(&tree);
        let twice = normalize_ir(&once);
        assert_eq!(once, twice, "not idempotent for {tree}");
        assert_eq!(serialize_ir(&once), serialize_ir(&twice));
    }
}

#[test]
fn operand_order_does_not_matter() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let b = IrBuilder::new();
    for _ in 0..50 {
        let mut operands: Vec<IrExpr> = (0..5).map(|_| random_tree(&b, &mut rng, 3)).collect();
        let expected = serialize_ir(&normalize_ir(&b.and(operands.clone())));
        for _ in 0..10 {
            operands.shuffle(&mut rng);
            assert_eq!(serialize_ir(&normalize_ir(&b.and(operands.clone()))), expected);
            let reversed: Vec<IrExpr> = operands.iter().rev().cloned().collect();
            assert_eq!(serialize_ir(&normalize_ir(&b.and(reversed))), expected);
        }
    }
}

#[test]
fn duplicates_collapse() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let b = IrBuilder::new();
    for _ in 0..100 {
        let x = random_tree(&b, &mut rng, 4);
        assert_eq!(normalize_ir(&b.and(vec![x.clone(), x.clone()])), normalize_ir(&x));
        assert_eq!(normalize_ir(&b.or(vec![x.clone(), x.clone()])), normalize_ir(&x));
    }
}

#[test]
fn identity_elements() {
    let b = IrBuilder::new();
    assert_eq!(serialize_ir(&normalize_ir(&b.and(vec![]))), "true");
    assert_eq!(serialize_ir(&normalize_ir(&b.or(vec![]))), "false");
    assert_eq!(
        serialize_ir(&normalize_ir(&b.and(vec![b.and(vec![]), b.or(vec![])]))),
        "(false && true)"
    );
}

#[test]
fn nested_connectives_flatten() {
    let b = IrBuilder::new();
    let tree = b.and(vec![
        b.variable("d"),
        b.and(vec![b.variable("b"), b.and(vec![b.variable("c"), b.variable("a")])]),
        b.or(vec![b.variable("z"), b.or(vec![b.variable("y")])]),
    ]);
    assert_eq!(
        serialize_ir(&normalize_ir(&tree)),
        "((y || z) && a && b && c && d)"
    );
}

#[test]
fn different_construction_orders_agree() {
    let b = IrBuilder::new();
    let left = b.and(vec![
        b.exists(b.input_field("email"), true),
        b.gt(b.string_length(b.input_field("password")), b.int(8)),
        b.entity_exists("User", Some(b.map([("id", b.result_field("id"))]))),
    ]);

    let b2 = IrBuilder::new();
    let user = b2.entity_exists("User", Some(b2.map([("id", b2.result_field("id"))])));
    let password = b2.gt(b2.string_length(b2.input_field("password")), b2.int(8));
    let email = b2.exists(b2.input_field("email"), true);
    let right = b2.and(vec![user, b2.and(vec![email.clone(), password]), email]);

    assert_eq!(serialize_ir(&normalize_ir(&left)), serialize_ir(&normalize_ir(&right)));
}

#[test]
fn map_entries_sort_by_key() {
    let b = IrBuilder::new();
    let a = b.entity_count("User", Some(b.map([("status", b.string("x")), ("id", b.int(1))])));
    let c = b.entity_count("User", Some(b.map([("id", b.int(1)), ("status", b.string("x"))])));
    assert_eq!(a, c);
    assert_eq!(
        serialize_ir(&normalize_ir(&a)),
        "User.count({id: 1, status: \"x\"})"
    );
    assert_eq!(serialize_ir(&normalize_ir(&a)), serialize_ir(&normalize_ir(&c)));
}

#[test]
fn membership_candidates_sort_without_dedup() {
    let b = IrBuilder::new();
    let m = b.membership(
        b.variable("x"),
        vec![b.int(3), b.int(1), b.int(3), b.int(2)],
        false,
    );
    assert_eq!(serialize_ir(&normalize_ir(&m)), "(x in [1, 2, 3, 3])");
}

#[test]
fn other_nodes_keep_operand_order() {
    let b = IrBuilder::new();
    let e = b.arithmetic(
        ArithOp::Sub,
        b.and(vec![b.variable("b"), b.variable("a")]),
        b.variable("a"),
    );
    assert_eq!(serialize_ir(&normalize_ir(&e)), "((a && b) - a)");
}
