//! query validation
//!
//! walks the tree once and reports the first failing check per rule:
//! - empty field id
//! - field not in the registry
//! - missing or disallowed operator (when `require_operator` is set)
//! - blank value for an operator that takes one (when `require_value` is set)
//! - the field's own validator hook
//!
//! groups with no children are reported when `allow_empty_groups` is off.

mod report;

pub use report::{ReportEntry, ValidationReport};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueryError;
use crate::fields::{Arity, FieldRegistry};
use crate::tree::{Node, Rule, RuleGroup};

pub const FIELD_REQUIRED: &str = "Field required";
pub const OPERATOR_REQUIRED: &str = "Operator required";
pub const VALUE_REQUIRED: &str = "Value required";
pub const EMPTY_GROUP: &str = "Empty rulesets are not allowed.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub allow_empty_groups: bool,
    pub require_operator: bool,
    pub require_value: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            allow_empty_groups: true,
            require_operator: false,
            require_value: false,
        }
    }
}

impl ValidationOptions {
    /// every presence check on, empty groups rejected
    pub fn strict() -> Self {
        Self {
            allow_empty_groups: false,
            require_operator: true,
            require_value: true,
        }
    }
}

/// validate a tree against a registry; `None` when there is nothing to report
pub fn validate(
    tree: &RuleGroup,
    registry: &FieldRegistry,
    options: &ValidationOptions,
) -> Option<ValidationReport> {
    let report = validate_group(tree, registry, options);
    debug!(errors = report.error_count(), "validated query");
    (!report.is_empty()).then_some(report)
}

fn validate_group(
    group: &RuleGroup,
    registry: &FieldRegistry,
    options: &ValidationOptions,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if group.rules.is_empty() && !options.allow_empty_groups {
        report.empty = Some(EMPTY_GROUP.to_string());
    }

    for node in &group.rules {
        match node {
            Node::Rule(rule) => {
                if let Some(message) = validate_rule(rule, registry, options) {
                    report.rules.push(ReportEntry::Message(message));
                }
            }
            Node::Group(child) => {
                let nested = validate_group(child, registry, options);
                if !nested.is_empty() {
                    report.rules.push(ReportEntry::Group(nested));
                }
            }
        }
    }

    report
}

/// first error for a single rule
pub fn validate_rule(
    rule: &Rule,
    registry: &FieldRegistry,
    options: &ValidationOptions,
) -> Option<String> {
    if rule.field.is_empty() {
        return Some(FIELD_REQUIRED.to_string());
    }

    let field = match registry.describe(&rule.field) {
        Ok(field) => field,
        Err(e) => return Some(e.to_string()),
    };

    if options.require_operator {
        match &rule.operator {
            None => return Some(OPERATOR_REQUIRED.to_string()),
            Some(op) => {
                if !registry.is_operator_allowed(&rule.field, op).unwrap_or(false) {
                    return Some(
                        QueryError::InvalidOperator {
                            field: rule.field.clone(),
                            operator: op.clone(),
                        }
                        .to_string(),
                    );
                }
            }
        }
    }

    if options.require_value {
        let arity = rule
            .operator
            .as_deref()
            .map(|op| registry.arity_of(op))
            .unwrap_or(Arity::Single);
        if arity != Arity::Nullary && rule.value.is_blank() {
            return Some(VALUE_REQUIRED.to_string());
        }
    }

    let validator = field.validator.as_ref()?;
    validator(&rule.value, rule).filter(|message| !message.is_empty())
}
