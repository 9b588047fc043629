//! query parser - converts JSON to a rule tree
//!
//! accepts the query format produced by the builder:
//! - a group has `condition` and `rules` (and optionally `not`)
//! - a rule has `field`, optionally `operator`, `value` and `entity`
//! - a node with `condition` or `rules` is a group, anything else must be a rule

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use super::types::{Condition, Node, Rule, RuleGroup, Value};

/// error type for parsing queries
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub path: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// parse a JSON value into a rule tree
///
/// the top-level value must be a group
pub fn parse_query(json: &JsonValue) -> Result<RuleGroup, ParseError> {
    match parse_node(json, "")? {
        Node::Group(group) => Ok(group),
        Node::Rule(_) => Err(ParseError::new(
            "top-level node must be a group with 'condition' and 'rules'",
            "",
        )),
    }
}

/// parse query text (JSON)
pub fn parse_query_str(text: &str) -> Result<RuleGroup, ParseError> {
    let json: JsonValue =
        serde_json::from_str(text).map_err(|e| ParseError::new(format!("invalid JSON: {}", e), ""))?;
    parse_query(&json)
}

fn parse_node(json: &JsonValue, path: &str) -> Result<Node, ParseError> {
    let obj = json
        .as_object()
        .ok_or_else(|| ParseError::new(format!("expected object, got {}", json), path))?;

    if obj.contains_key("condition") || obj.contains_key("rules") {
        parse_group(obj, path).map(Node::Group)
    } else {
        parse_rule(obj, path).map(Node::Rule)
    }
}

fn parse_group(
    obj: &serde_json::Map<String, JsonValue>,
    path: &str,
) -> Result<RuleGroup, ParseError> {
    let condition = match obj.get("condition") {
        Some(JsonValue::String(s)) => Condition::parse(s).ok_or_else(|| {
            ParseError::new(
                format!("unknown condition: '{}' (expected 'and' or 'or')", s),
                path,
            )
        })?,
        Some(other) => {
            return Err(ParseError::new(
                format!("'condition' must be a string, got {}", other),
                path,
            ))
        }
        // a group without condition defaults to AND
        None => Condition::And,
    };

    let not = match obj.get("not") {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(other) => {
            return Err(ParseError::new(
                format!("'not' must be a boolean, got {}", other),
                path,
            ))
        }
    };

    let rules = match obj.get("rules") {
        None => Vec::new(),
        Some(JsonValue::Array(arr)) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| parse_node(v, &child_path(path, i)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ParseError::new("'rules' must be an array", path)),
    };

    Ok(RuleGroup {
        condition,
        not,
        rules,
    })
}

fn parse_rule(obj: &serde_json::Map<String, JsonValue>, path: &str) -> Result<Rule, ParseError> {
    let field = match obj.get("field") {
        Some(JsonValue::String(s)) => s.clone(),
        // a rule without field is kept as "no field selected" and reported by validation
        None | Some(JsonValue::Null) => String::new(),
        Some(other) => {
            return Err(ParseError::new(
                format!("'field' must be a string, got {}", other),
                path,
            ))
        }
    };

    let operator = optional_string(obj, "operator", path)?;
    let entity = optional_string(obj, "entity", path)?;

    let value = match obj.get("value") {
        None => Value::Null,
        Some(v) => parse_value(v, &format!("{}.value", display_path(path)))?,
    };

    Ok(Rule {
        field,
        operator,
        value,
        entity,
    })
}

fn optional_string(
    obj: &serde_json::Map<String, JsonValue>,
    key: &str,
    path: &str,
) -> Result<Option<String>, ParseError> {
    match obj.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ParseError::new(
            format!("'{}' must be a string, got {}", key, other),
            path,
        )),
    }
}

fn parse_value(json: &JsonValue, path: &str) -> Result<Value, ParseError> {
    match json {
        JsonValue::Object(_) => Err(ParseError::new(
            "nested objects not supported as values",
            path,
        )),
        JsonValue::Array(arr) => {
            let values = arr
                .iter()
                .enumerate()
                .map(|(i, v)| parse_value(v, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        _ => Value::deserialize(json).map_err(|e| ParseError::new(e.to_string(), path)),
    }
}

fn child_path(path: &str, index: usize) -> String {
    if path.is_empty() {
        format!("rules[{}]", index)
    } else {
        format!("{}.rules[{}]", path, index)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "root"
    } else {
        path
    }
}

impl<'de> Deserialize<'de> for RuleGroup {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        parse_query(&json).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for RuleGroup {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_query_str(s)
    }
}
