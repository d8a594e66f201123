use islcore::prelude::*;
use islir::prelude::*;

const WITHDRAWAL: &str = r#"
now = 2024-05-01T12:00:00Z
result = { balance = 70 }

[input]
account = "acc-1"
amount = 30

[[entities.Account]]
id = "acc-1"
balance = 70

[[old.entities.Account]]
id = "acc-1"
balance = 100
"#;

#[test]
fn scenario_builds_a_full_context() {
    let ctx = Scenario::from_toml_str(WITHDRAWAL).unwrap().context().unwrap();

    assert_eq!(ctx.now().to_rfc3339(), "2024-05-01T12:00:00+00:00");
    assert_eq!(ctx.lookup("amount"), Value::Int(30));
    assert_eq!(ctx.result().and_then(|r| r.get("balance")), Some(&Value::Int(70)));
    assert_eq!(ctx.entities().collection("Account").len(), 1);
    assert!(ctx.pre_state().is_some());
}

#[test]
fn scenario_drives_pre_state_queries() {
    let b = IrBuilder::new();
    let ctx = Scenario::from_toml_str(WITHDRAWAL).unwrap().context().unwrap();
    let account = || Some(b.map([("id", b.input_field("account"))]));

    let before = b.property(
        b.entity_query(EntityQueryKind::Lookup, "Account", account(), true),
        "balance",
    );
    let after = b.property(b.entity_lookup("Account", account()), "balance");
    let ir = b.eq(after, b.arithmetic(ArithOp::Sub, before, b.input_field("amount")));
    assert_eq!(evaluate(&ir, &ctx).unwrap(), Value::Bool(true));
}

#[test]
fn now_accepts_strings() {
    let scenario = Scenario::from_toml_str(r#"now = "2024-05-01T14:00:00+02:00""#).unwrap();
    let now = scenario.now().unwrap().unwrap();
    assert_eq!(now.to_rfc3339(), "2024-05-01T12:00:00+00:00");
}

#[test]
fn missing_now_defaults_to_the_clock() {
    let ctx = Scenario::default().context().unwrap();
    assert!(ctx.now().timestamp() > 1_700_000_000);
}

#[test]
fn invalid_now_is_rejected() {
    let scenario = Scenario::from_toml_str("now = true").unwrap();
    assert!(matches!(
        scenario.into_options(),
        Err(IslError::InvalidScenario(_))
    ));
}

#[test]
fn unknown_sections_are_parse_errors() {
    assert!(matches!(
        Scenario::from_toml_str("[inputs]\na = 1"),
        Err(IslError::ScenarioParse { .. })
    ));
}

#[test]
fn loads_from_disk() {
    let path = std::env::temp_dir().join(format!("islcore-scenario-{}.toml", std::process::id()));
    std::fs::write(&path, WITHDRAWAL).unwrap();
    let scenario = Scenario::load_from_toml(&path);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(scenario.unwrap().input["amount"], toml::Value::Integer(30));

    assert!(matches!(
        Scenario::load_from_toml(std::path::Path::new("/nonexistent/scenario.toml")),
        Err(IslError::Io(_))
    ));
}
