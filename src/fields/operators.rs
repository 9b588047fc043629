//! operator tables: default operator lists per field type and operator arity

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::FieldType;

/// operators appended for nullable fields
pub const NULL_OPERATORS: [&str; 2] = ["is null", "is not null"];

/// how many values an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    /// one scalar value: =, !=, >, contains, ...
    Single,
    /// any number of values: in, not in
    Multi,
    /// a [low, high] pair: between, not between
    Range,
    /// no value: is null, is not null
    Nullary,
}

impl Arity {
    /// built-in arity of an operator; unknown operators take a single value
    pub fn of(operator: &str) -> Self {
        match operator {
            "in" | "not in" => Arity::Multi,
            "between" | "not between" => Arity::Range,
            "is null" | "is not null" | "is empty" | "is not empty" => Arity::Nullary,
            _ => Arity::Single,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Single => write!(f, "single"),
            Arity::Multi => write!(f, "multi"),
            Arity::Range => write!(f, "range"),
            Arity::Nullary => write!(f, "nullary"),
        }
    }
}

/// default operator list for a field type
pub fn default_operators(field_type: FieldType) -> &'static [&'static str] {
    match field_type {
        FieldType::String => &["=", "!=", "contains", "like"],
        FieldType::Number | FieldType::Date | FieldType::Time => {
            &["=", "!=", ">", ">=", "<", "<="]
        }
        FieldType::Category => &["=", "!=", "in", "not in"],
        FieldType::Boolean | FieldType::Custom => &["="],
    }
}
