// property tests: coercion shape and idempotence, add/remove invariants

use crate::common::*;
use proptest::prelude::*;
use qtree::coerce::coerce_for_arity;
use qtree::{Arity, NodePath, QueryBuilder, Rule, Value};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Number),
        (-1.0e6..1.0e6f64).prop_map(Value::Float),
        prop::string::string_regex("[a-z ]{0,12}")
            .unwrap()
            .prop_map(Value::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 5, |inner| {
        prop::collection::vec(inner, 0..5).prop_map(Value::List)
    })
}

fn arity_strategy() -> impl Strategy<Value = Arity> {
    prop_oneof![
        Just(Arity::Single),
        Just(Arity::Multi),
        Just(Arity::Range),
        Just(Arity::Nullary),
    ]
}

fn operator_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["=", "!=", "in", "not in"])
}

// =============================================================================
// COERCION PROPERTIES
// =============================================================================

mod coercion_properties {
    use super::*;

    proptest! {
        /// coercing an already coerced value changes nothing
        #[test]
        fn coercion_is_idempotent(arity in arity_strategy(), value in value_strategy()) {
            let once = coerce_for_arity(arity, value);
            let twice = coerce_for_arity(arity, once.clone());
            prop_assert_eq!(once, twice);
        }

        /// each arity produces the shape its operators expect
        #[test]
        fn coercion_produces_arity_shape(value in value_strategy()) {
            prop_assert!(!coerce_for_arity(Arity::Single, value.clone()).is_list());
            prop_assert!(coerce_for_arity(Arity::Multi, value.clone()).is_list());
            prop_assert!(coerce_for_arity(Arity::Nullary, value.clone()).is_null());

            let range = coerce_for_arity(Arity::Range, value);
            prop_assert_eq!(range.as_list().map(|l| l.len()), Some(2));
        }

        /// scalars are wrapped, never altered
        #[test]
        fn multi_wraps_scalars(value in scalar_strategy()) {
            prop_assume!(!value.is_null());
            prop_assert_eq!(
                coerce_for_arity(Arity::Multi, value.clone()),
                Value::List(vec![value])
            );
        }

        /// a range built from a scalar uses it for both bounds
        #[test]
        fn range_from_scalar_repeats_it(value in scalar_strategy()) {
            prop_assert_eq!(
                coerce_for_arity(Arity::Range, value.clone()),
                Value::List(vec![value.clone(), value])
            );
        }

        /// lists of the right shape pass through untouched
        #[test]
        fn multi_keeps_lists(items in prop::collection::vec(scalar_strategy(), 0..8)) {
            let value = Value::List(items);
            prop_assert_eq!(coerce_for_arity(Arity::Multi, value.clone()), value);
        }
    }
}

// =============================================================================
// BUILDER PROPERTIES
// =============================================================================

mod builder_properties {
    use super::*;

    proptest! {
        /// n add_rule calls give n rules and n notification bursts
        #[test]
        fn add_rule_grows_by_one(n in 0usize..12) {
            let mut qb = QueryBuilder::new(sample_registry());
            let counters = Counters::attach(&mut qb);

            for i in 0..n {
                let path = qb.add_rule(&NodePath::root()).unwrap();
                prop_assert_eq!(path, NodePath::from([i]));
            }

            prop_assert_eq!(qb.root().len(), n);
            prop_assert_eq!(counters.get(), (n, n));
        }

        /// removing an existing rule shrinks the group by one and notifies once;
        /// removing a missing rule changes nothing
        #[test]
        fn remove_rule_shrinks_by_one(
            n in 1usize..10,
            pick in any::<prop::sample::Index>(),
        ) {
            let mut qb = QueryBuilder::new(sample_registry());
            for i in 0..n {
                let path = qb.add_rule(&NodePath::root()).unwrap();
                qb.set_value(Value::Number(i as i64), &path).unwrap();
            }
            let counters = Counters::attach(&mut qb);

            let index = pick.index(n);
            let target = qb.root().rule_at(&NodePath::from([index])).unwrap().clone();
            prop_assert!(qb.remove_rule(&target, &NodePath::root()).unwrap());
            prop_assert_eq!(qb.root().len(), n - 1);
            prop_assert_eq!(counters.get(), (1, 1));

            // gone now, so a second removal is a silent no-op
            prop_assert!(!qb.remove_rule(&target, &NodePath::root()).unwrap());
            prop_assert_eq!(qb.root().len(), n - 1);
            prop_assert_eq!(counters.get(), (1, 1));
        }

        /// change_operator leaves a value that re-coercing would not change
        #[test]
        fn change_operator_stores_coerced_value(
            value in value_strategy(),
            operator in operator_strategy(),
        ) {
            let mut qb = QueryBuilder::new(sample_registry());
            let path = qb.add_rule(&NodePath::root()).unwrap();
            qb.change_field("status", &path).unwrap();
            qb.set_value(value, &path).unwrap();

            qb.change_operator(operator, &path).unwrap();

            let rule: Rule = qb.root().rule_at(&path).unwrap().clone();
            let again = qb.coerce_value_for_operator(operator, rule.value.clone(), &rule);
            prop_assert_eq!(rule.value, again);
        }
    }
}
