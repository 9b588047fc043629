//! field registry
//!
//! describes the fields a query can reference:
//! - value type, allowed operators, default operator and default value
//! - options for enumerated (category) fields
//! - optional entity grouping for multi-entity queries
//! - optional validator and coercion hooks
//!
//! the registry is built once and shared read-only with the builder.

mod operators;
mod registry;
mod types;

pub use operators::{default_operators, Arity, NULL_OPERATORS};
pub use registry::FieldRegistry;
pub use types::{
    CoercerFn, EntityDescriptor, FieldDescriptor, FieldOption, FieldType, ValidatorFn,
};
