//! core types for the rule tree

use std::fmt;

use serde::{Deserialize, Serialize};

/// a rule value
///
/// covers the scalar and list shapes a rule can hold; objects are not values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// no value (e.g. for `is null` operators)
    #[default]
    Null,
    /// boolean value
    Bool(bool),
    /// integer value
    Number(i64),
    /// floating point value
    Float(f64),
    /// string value
    String(String),
    /// list of values (for set and range operators)
    List(Vec<Value>),
}

impl Value {
    /// try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// try to get as integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// try to get as float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// try to get as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// null, whitespace-only string or empty list
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::List(l) => l.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// logical operator joining the children of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    And,
    Or,
}

impl Condition {
    /// parse condition from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Some(Condition::And),
            "or" => Some(Condition::Or),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::And => write!(f, "and"),
            Condition::Or => write!(f, "or"),
        }
    }
}

/// a single leaf condition
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Rule {
    /// field id from the registry; empty means "no field selected"
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl Rule {
    /// create a rule with field, operator and value
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: Some(operator.into()),
            value,
            entity: None,
        }
    }

    /// create a rule with only a field and a value
    pub fn with_value(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: None,
            value,
            entity: None,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = if self.field.is_empty() {
            "?"
        } else {
            &self.field
        };
        match &self.operator {
            Some(op) => write!(f, "{} {} {}", field, op, self.value),
            None => write!(f, "{} ? {}", field, self.value),
        }
    }
}

/// a logical group of rules and nested groups
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RuleGroup {
    pub condition: Condition,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub not: bool,
    pub rules: Vec<Node>,
}

/// a tree node: either a rule or a nested group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Rule(Rule),
    Group(RuleGroup),
}

impl Node {
    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Node::Rule(r) => Some(r),
            Node::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&RuleGroup> {
        match self {
            Node::Group(g) => Some(g),
            Node::Rule(_) => None,
        }
    }
}

impl From<Rule> for Node {
    fn from(rule: Rule) -> Self {
        Node::Rule(rule)
    }
}

impl From<RuleGroup> for Node {
    fn from(group: RuleGroup) -> Self {
        Node::Group(group)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Rule(r) => write!(f, "{}", r),
            Node::Group(g) => write!(f, "{}", g),
        }
    }
}

impl RuleGroup {
    /// create an empty group
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            not: false,
            rules: Vec::new(),
        }
    }

    /// create an AND group
    pub fn and(rules: Vec<Node>) -> Self {
        Self {
            condition: Condition::And,
            not: false,
            rules,
        }
    }

    /// create an OR group
    pub fn or(rules: Vec<Node>) -> Self {
        Self {
            condition: Condition::Or,
            not: false,
            rules,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// resolve a node by path; the empty path is not a node (it is this group)
    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.group_at(&parent)?.rules.get(last)
    }

    /// resolve a group by path; the empty path is this group
    pub fn group_at(&self, path: &NodePath) -> Option<&RuleGroup> {
        let mut group = self;
        for &index in path.indexes() {
            group = group.rules.get(index)?.as_group()?;
        }
        Some(group)
    }

    pub fn group_at_mut(&mut self, path: &NodePath) -> Option<&mut RuleGroup> {
        let mut group = self;
        for &index in path.indexes() {
            group = match group.rules.get_mut(index)? {
                Node::Group(g) => g,
                Node::Rule(_) => return None,
            };
        }
        Some(group)
    }

    pub fn rule_at(&self, path: &NodePath) -> Option<&Rule> {
        self.node_at(path)?.as_rule()
    }

    pub fn rule_at_mut(&mut self, path: &NodePath) -> Option<&mut Rule> {
        let (last, parent) = path.split_last()?;
        match self.group_at_mut(&parent)?.rules.get_mut(last)? {
            Node::Rule(r) => Some(r),
            Node::Group(_) => None,
        }
    }

    /// number of rules in this group and all nested groups
    pub fn rule_count(&self) -> usize {
        self.rules
            .iter()
            .map(|node| match node {
                Node::Rule(_) => 1,
                Node::Group(g) => g.rule_count(),
            })
            .sum()
    }
}

impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.not {
            write!(f, "not(")?;
        }
        write!(f, "{}(", self.condition)?;
        for (i, node) in self.rules.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, ")")?;
        if self.not {
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// location of a node as child indexes from the root group
///
/// the empty path is the root group itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    /// path of the child at `index` below this path
    pub fn child(&self, index: usize) -> Self {
        let mut indexes = self.0.clone();
        indexes.push(index);
        Self(indexes)
    }

    /// parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        self.split_last().map(|(_, parent)| parent)
    }

    fn split_last(&self) -> Option<(usize, NodePath)> {
        let (last, rest) = self.0.split_last()?;
        Some((*last, NodePath(rest.to_vec())))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "rules[{}]", index)?;
        }
        Ok(())
    }
}

impl<const N: usize> From<[usize; N]> for NodePath {
    fn from(indexes: [usize; N]) -> Self {
        Self(indexes.to_vec())
    }
}
