//! value coercion by operator arity
//!
//! the shape of a rule value follows its operator:
//! - multi: a list (scalars are wrapped, null becomes empty)
//! - range: a `[low, high]` pair (a scalar `v` becomes `[v, v]`)
//! - nullary: null
//! - single: a scalar (lists collapse to their first element)
//!
//! every rule is idempotent: coercing an already-coerced value is a no-op.

use crate::fields::Arity;
use crate::tree::Value;

/// reshape `value` for an operator of the given arity
pub fn coerce_for_arity(arity: Arity, value: Value) -> Value {
    match arity {
        Arity::Multi => match value {
            Value::List(items) => Value::List(items),
            Value::Null => Value::List(Vec::new()),
            scalar => Value::List(vec![scalar]),
        },
        Arity::Range => match value {
            Value::List(mut items) => match items.len() {
                0 => Value::List(vec![Value::Null, Value::Null]),
                1 => {
                    let low = items.remove(0);
                    Value::List(vec![low.clone(), low])
                }
                2 => Value::List(items),
                _ => {
                    items.truncate(2);
                    Value::List(items)
                }
            },
            scalar => Value::List(vec![scalar.clone(), scalar]),
        },
        Arity::Nullary => Value::Null,
        Arity::Single => match value {
            // nested lists collapse all the way down to a scalar
            Value::List(items) => items
                .into_iter()
                .next()
                .map(|first| coerce_for_arity(Arity::Single, first))
                .unwrap_or(Value::Null),
            scalar => scalar,
        },
    }
}
