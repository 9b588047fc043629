// library crate for qtree
// rule-tree engine behind a visual query builder; the binary is a thin CLI over it

pub mod builder;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod error;
pub mod fields;
pub mod tree;
pub mod validate;

pub use builder::{ListenerId, OperatorPolicy, QueryBuilder};
pub use error::{QueryError, QueryResult};
pub use fields::{Arity, FieldDescriptor, FieldOption, FieldRegistry, FieldType};
pub use tree::{Condition, Node, NodePath, Rule, RuleGroup, Value};
pub use validate::{validate, ValidationOptions, ValidationReport};
