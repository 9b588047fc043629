//! rule tree data model
//!
//! a query is a tree of groups and rules:
//! - a group joins its children with `and` / `or` and may be negated
//! - a rule compares one field against a value with an operator
//! - nodes are addressed by `NodePath` (child indexes from the root)
//!
//! trees serialize to and parse from the JSON query format.

mod parser;
mod types;

pub use parser::{parse_query, parse_query_str, ParseError};
pub use types::{Condition, Node, NodePath, Rule, RuleGroup, Value};
