// builder scenarios: defaults, resets, removal and notification bursts

use crate::common::*;
use pretty_assertions::assert_eq;
use qtree::{
    Condition, FieldDescriptor, FieldRegistry, NodePath, QueryBuilder, QueryError, Rule,
    RuleGroup, Value,
};

#[test]
fn test_add_rule_appends_default_rule() {
    let mut qb = QueryBuilder::new(sample_registry());
    let counters = Counters::attach(&mut qb);

    let path = qb.add_rule(&NodePath::root()).unwrap();

    assert_eq!(qb.root().len(), 1);
    assert_eq!(
        qb.root().rule_at(&path).unwrap(),
        &Rule::new("age", "=", Value::Number(18))
    );
    assert_eq!(counters.get(), (1, 1));
}

#[test]
fn test_change_field_resets_operator_and_value() {
    let mut qb = QueryBuilder::new(sample_registry());
    let path = qb.add_rule(&NodePath::root()).unwrap();
    qb.change_operator(">=", &path).unwrap();
    qb.set_value(Value::Number(65), &path).unwrap();

    qb.change_field("status", &path).unwrap();

    assert_eq!(
        qb.root().rule_at(&path).unwrap(),
        &Rule::new("status", "=", Value::from("active"))
    );
}

#[test]
fn test_change_operator_to_in_wraps_value() {
    let mut qb = QueryBuilder::new(sample_registry());
    let path = qb.add_rule(&NodePath::root()).unwrap();
    qb.change_field("status", &path).unwrap();

    qb.change_operator("in", &path).unwrap();
    assert_eq!(
        qb.root().rule_at(&path).unwrap().value,
        list(&[Value::from("active")])
    );

    // switching between multi operators keeps the list as it is
    qb.change_operator("not in", &path).unwrap();
    assert_eq!(
        qb.root().rule_at(&path).unwrap().value,
        list(&[Value::from("active")])
    );
}

#[test]
fn test_remove_missing_rule_is_a_silent_no_op() {
    let mut qb = QueryBuilder::new(sample_registry());
    qb.add_rule(&NodePath::root()).unwrap();
    let before = qb.root().clone();
    let counters = Counters::attach(&mut qb);

    let removed = qb
        .remove_rule(&Rule::new("status", "=", Value::from("x")), &NodePath::root())
        .unwrap();

    assert!(!removed);
    assert_eq!(qb.root(), &before);
    assert_eq!(counters.get(), (0, 0));
}

#[test]
fn test_remove_existing_rule_shrinks_group_once() {
    let mut qb = QueryBuilder::new(sample_registry());
    qb.add_rule(&NodePath::root()).unwrap();
    let second = qb.add_rule(&NodePath::root()).unwrap();
    qb.change_field("status", &second).unwrap();
    let counters = Counters::attach(&mut qb);

    let target = qb.root().rule_at(&second).unwrap().clone();
    assert!(qb.remove_rule(&target, &NodePath::root()).unwrap());

    assert_eq!(qb.root().len(), 1);
    assert_eq!(qb.root().rule_at(&NodePath::from([0])).unwrap().field, "age");
    assert_eq!(counters.get(), (1, 1));
}

#[test]
fn test_nested_groups() {
    let mut qb = QueryBuilder::new(sample_registry());

    let outer = qb.add_group(&NodePath::root()).unwrap();
    qb.set_condition(Condition::Or, &outer).unwrap();
    let inner = qb.add_group(&outer).unwrap();
    qb.set_negated(true, &inner).unwrap();
    let rule = qb.add_rule(&inner).unwrap();
    qb.set_value(Value::Number(30), &rule).unwrap();

    assert_eq!(rule, NodePath::from([0, 0, 0]));
    assert_eq!(qb.root().to_string(), "and(or(not(and(age = 30))))");
    assert_eq!(
        serde_json::to_value(qb.root()).unwrap(),
        serde_json::json!({
            "condition": "and",
            "rules": [{
                "condition": "or",
                "rules": [{
                    "condition": "and",
                    "not": true,
                    "rules": [{"field": "age", "operator": "=", "value": 30}]
                }]
            }]
        })
    );

    // removing the outer group takes the whole subtree
    let outer_group = qb.root().group_at(&outer).unwrap().clone();
    assert!(qb.remove_group(&outer_group, &NodePath::root()).unwrap());
    assert!(qb.root().is_empty());
}

#[test]
fn test_failed_mutations_do_not_notify() {
    let mut qb = QueryBuilder::new(sample_registry());
    let rule = qb.add_rule(&NodePath::root()).unwrap();
    let before = qb.root().clone();
    let counters = Counters::attach(&mut qb);

    assert!(matches!(
        qb.change_field("agee", &rule),
        Err(QueryError::UnknownField { .. })
    ));
    assert!(matches!(
        qb.change_operator("contains", &rule),
        Err(QueryError::InvalidOperator { .. })
    ));
    assert_eq!(
        qb.add_rule(&rule).unwrap_err(),
        QueryError::InvalidParent(rule.clone())
    );
    assert_eq!(
        qb.set_value(Value::Null, &NodePath::root()).unwrap_err(),
        QueryError::NotARule(NodePath::root())
    );
    assert_eq!(
        qb.set_condition(Condition::Or, &NodePath::from([7])).unwrap_err(),
        QueryError::InvalidParent(NodePath::from([7]))
    );

    assert_eq!(qb.root(), &before);
    assert_eq!(counters.get(), (0, 0));
}

#[test]
fn test_one_burst_per_mutation() {
    let mut qb = QueryBuilder::new(sample_registry());
    let counters = Counters::attach(&mut qb);

    let rule = qb.add_rule(&NodePath::root()).unwrap();
    qb.change_field("status", &rule).unwrap();
    qb.change_operator("in", &rule).unwrap();
    qb.set_value(list(&[Value::from("inactive")]), &rule).unwrap();
    qb.set_condition(Condition::Or, &NodePath::root()).unwrap();
    qb.set_negated(true, &NodePath::root()).unwrap();

    assert_eq!(counters.get(), (6, 6));
}

#[test]
fn test_loaded_tree_with_unknown_field() {
    let tree: RuleGroup = r#"{"condition":"or","rules":[{"field":"legacy","operator":"=","value":1}]}"#
        .parse()
        .unwrap();
    let mut qb = QueryBuilder::new(sample_registry());
    qb.set_root(tree);

    // kept as loaded, reported by validation
    assert_eq!(qb.root().rule_count(), 1);
    let report = qb.validate(&Default::default()).unwrap();
    assert_eq!(report.messages(), vec!["unknown field: 'legacy'"]);

    // and repairable by selecting a known field
    qb.change_field("age", &NodePath::from([0])).unwrap();
    assert_eq!(qb.validate(&Default::default()), None);
}

#[test]
fn test_empty_registry_cannot_add_rules() {
    let mut qb = QueryBuilder::new(FieldRegistry::new());
    assert_eq!(
        qb.add_rule(&NodePath::root()).unwrap_err(),
        QueryError::EmptyRegistry
    );
    // groups need no field
    assert!(qb.add_group(&NodePath::root()).is_ok());
}

#[test]
fn test_explicit_default_field() {
    let registry = sample_registry()
        .with_field("name", FieldDescriptor::string("Name"))
        .with_default_field("name");
    let mut qb = QueryBuilder::new(registry);
    let path = qb.add_rule(&NodePath::root()).unwrap();
    assert_eq!(
        qb.root().rule_at(&path).unwrap(),
        &Rule::new("name", "=", Value::from(""))
    );
}

#[test]
fn test_into_root_returns_tree() {
    let mut qb = QueryBuilder::new(sample_registry());
    qb.add_rule(&NodePath::root()).unwrap();
    let tree = qb.into_root();
    assert_eq!(tree.rule_count(), 1);
}
