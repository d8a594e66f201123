use islir::prelude::*;
use strum::IntoEnumIterator;

#[test]
fn ids_increase_in_construction_order() {
    let b = IrBuilder::new();
    let x = b.variable("x");
    let zero = b.int(0);
    let cmp = b.gt(x.clone(), zero.clone());
    assert!(x.id() < zero.id());
    assert!(zero.id() < cmp.id());
    assert_eq!(b.issued(), 3);
}

#[test]
fn reset_gives_reproducible_ids() {
    let b = IrBuilder::new();
    let build = |b: &IrBuilder| b.and(vec![b.variable("a"), b.not(b.variable("b"))]);
    let first = build(&b);
    reset_node_ids(&b);
    let second = build(&b);
    assert_eq!(first.id(), second.id());
    assert_eq!(
        first.children().iter().map(|c| c.id()).collect::<Vec<_>>(),
        second.children().iter().map(|c| c.id()).collect::<Vec<_>>()
    );
}

#[test]
fn builders_produce_the_requested_variant() {
    let b = IrBuilder::new();
    let v = || b.variable("v");
    let cases = [
        (b.null(), NodeType::Null),
        (b.regex("a+", "g"), NodeType::Regex),
        (b.index(v(), b.int(1)), NodeType::Index),
        (b.result(), NodeType::Result),
        (b.old(v()), NodeType::Old),
        (b.string_length(v()), NodeType::StringLength),
        (b.array_length(v()), NodeType::ArrayLength),
        (b.between(v(), b.int(0), b.int(1), false), NodeType::Between),
        (b.array_some(v(), "x", v()), NodeType::ArrayPredicate),
        (b.quant_any(v(), "x", v()), NodeType::Quantifier),
        (b.entity_lookup("User", None), NodeType::EntityQuery),
        (b.conditional(v(), v(), v()), NodeType::Conditional),
        (b.call("abs", vec![v()]), NodeType::Call),
    ];
    for (node, expected) in cases {
        assert_eq!(node.node_type(), expected);
    }
}

#[test]
fn node_type_names_are_stable() {
    let names: Vec<String> = NodeType::iter().map(|t| t.to_string()).collect();
    assert_eq!(names.first().map(String::as_str), Some("Null"));
    assert!(names.contains(&"EntityQuery".to_string()));
    assert_eq!(names.len(), 32);
}

#[test]
fn map_equality_ignores_entry_order() {
    let b = IrBuilder::new();
    let left = b.map([("a", b.int(1)), ("b", b.int(2))]);
    let right = b.map([("b", b.int(2)), ("a", b.int(1))]);
    assert_eq!(left, right);
    assert_ne!(left, b.map([("a", b.int(1))]));
    assert_ne!(left, b.map([("a", b.int(1)), ("b", b.int(3))]));
}

#[test]
fn map_equality_is_symmetric_with_repeated_keys() {
    let b = IrBuilder::new();
    let repeated = b.map([("a", b.int(1)), ("a", b.int(1))]);
    let distinct = b.map([("a", b.int(1)), ("b", b.int(2))]);
    assert_ne!(repeated, distinct);
    assert_ne!(distinct, repeated);
    assert_eq!(repeated, b.map([("a", b.int(1))]));

    let entries = vec![
        MapEntry {
            key: "k".to_string(),
            value: b.int(1),
        },
        MapEntry {
            key: "k".to_string(),
            value: b.int(2),
        },
    ];
    let map = IrMap::new(entries);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("k"), Some(&b.int(2)));
}

#[test]
fn int_and_float_literals_differ() {
    let b = IrBuilder::new();
    assert_ne!(b.int(1), b.float(1.0));
}

#[test]
fn references_post_state() {
    let b = IrBuilder::new();
    assert!(b.eq(b.result_field("id"), b.int(1)).references_post_state());
    assert!(b.old(b.variable("x")).references_post_state());
    assert!(
        b.entity_query(EntityQueryKind::Count, "User", None, true)
            .references_post_state()
    );
    assert!(!b.entity_count("User", None).references_post_state());
    assert!(!b.input_field("email").references_post_state());
}

#[test]
fn free_variables_skip_input_and_bound_names() {
    let b = IrBuilder::new();
    let e = b.and(vec![
        b.quant_all(b.variable("xs"), "x", b.gt(b.variable("x"), b.variable("min"))),
        b.exists(b.input_field("email"), true),
    ]);
    let free: Vec<String> = free_variables(&e).into_iter().collect();
    assert_eq!(free, vec!["min".to_string(), "xs".to_string()]);
}
