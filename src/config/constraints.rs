//! declarative validators: `constraints` in the fields file become a field's
//! validator hook

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fields::{Arity, ValidatorFn};
use crate::tree::{Rule, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// value must not be blank (null checks are exempt)
    pub required: bool,
    /// lower bound for numbers, minimum length for strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// upper bound for numbers, maximum length for strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// regex that string values must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// replaces every generated message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        !self.required && self.min.is_none() && self.max.is_none() && self.pattern.is_none()
    }

    /// build the validator hook for a field
    ///
    /// `operator_arity` holds the configured arity overrides, so operators
    /// declared nullary there are exempt like the built-in null checks
    pub fn compile(
        &self,
        field_name: &str,
        operator_arity: &BTreeMap<String, Arity>,
    ) -> Result<ValidatorFn> {
        let pattern = self
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("invalid pattern for field '{}'", field_name))?;

        let checker = Checker {
            field_name: field_name.to_string(),
            constraints: self.clone(),
            pattern,
            operator_arity: operator_arity.clone(),
        };
        Ok(Arc::new(move |value: &Value, rule: &Rule| checker.check(value, rule)))
    }
}

struct Checker {
    field_name: String,
    constraints: Constraints,
    pattern: Option<Regex>,
    operator_arity: BTreeMap<String, Arity>,
}

impl Checker {
    fn check(&self, value: &Value, rule: &Rule) -> Option<String> {
        let nullary = rule
            .operator
            .as_deref()
            .map(|op| self.arity_of(op) == Arity::Nullary)
            .unwrap_or(false);
        if nullary {
            return None;
        }

        if value.is_blank() {
            return self
                .constraints
                .required
                .then(|| self.message(format!("{} is required", self.field_name)));
        }

        match value {
            Value::List(items) => items.iter().find_map(|item| self.check_scalar(item)),
            scalar => self.check_scalar(scalar),
        }
    }

    fn check_scalar(&self, value: &Value) -> Option<String> {
        let c = &self.constraints;

        let (measure, unit) = match value {
            Value::Number(_) | Value::Float(_) => (value.as_f64(), ""),
            Value::String(s) => (Some(s.chars().count() as f64), " characters"),
            _ => (None, ""),
        };

        if let Some(measure) = measure {
            if let Some(min) = c.min {
                if measure < min {
                    return Some(self.message(format!(
                        "{} must be at least {}{}",
                        self.field_name, min, unit
                    )));
                }
            }
            if let Some(max) = c.max {
                if measure > max {
                    return Some(self.message(format!(
                        "{} must be at most {}{}",
                        self.field_name, max, unit
                    )));
                }
            }
        }

        if let (Some(re), Value::String(s)) = (&self.pattern, value) {
            if !re.is_match(s) {
                return Some(self.message(format!(
                    "{} does not match {}",
                    self.field_name,
                    re.as_str()
                )));
            }
        }

        None
    }

    fn arity_of(&self, operator: &str) -> Arity {
        self.operator_arity
            .get(operator)
            .copied()
            .unwrap_or_else(|| Arity::of(operator))
    }

    fn message(&self, generated: String) -> String {
        self.constraints.message.clone().unwrap_or(generated)
    }
}
