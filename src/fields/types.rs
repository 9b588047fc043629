//! field descriptors

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tree::{Rule, Value};

/// custom rule validator: returns an error message for an invalid rule
pub type ValidatorFn = Arc<dyn Fn(&Value, &Rule) -> Option<String> + Send + Sync>;

/// custom coercion: maps (operator, value, rule) to the value to store
pub type CoercerFn = Arc<dyn Fn(&str, Value, &Rule) -> Value + Send + Sync>;

/// the value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Date,
    Time,
    Category,
    /// any type name the engine has no built-in handling for
    #[serde(other)]
    Custom,
}

impl FieldType {
    pub const ALL: [FieldType; 7] = [
        FieldType::Number,
        FieldType::String,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Time,
        FieldType::Category,
        FieldType::Custom,
    ];

    /// strict name lookup; unlike deserialization, unknown names give `None`
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Category => "category",
            FieldType::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// one selectable value of an enumerated field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub name: String,
    pub value: Value,
}

impl FieldOption {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// description of one field: type, operators, defaults and hooks
#[derive(Clone)]
pub struct FieldDescriptor {
    /// display label
    pub name: String,
    pub field_type: FieldType,
    /// allowed operators in display order; `None` uses the type defaults
    pub operators: Option<Vec<String>>,
    pub default_value: Option<Value>,
    pub default_operator: Option<String>,
    pub options: Vec<FieldOption>,
    pub entity: Option<String>,
    /// adds `is null` / `is not null` to the operator list
    pub nullable: bool,
    pub validator: Option<ValidatorFn>,
    pub coercer: Option<CoercerFn>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            operators: None,
            default_value: None,
            default_operator: None,
            options: Vec::new(),
            entity: None,
            nullable: false,
            validator: None,
            coercer: None,
        }
    }

    /// shorthand for a number field
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// shorthand for a string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// shorthand for a boolean field
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// shorthand for a date field
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    /// shorthand for a category field with fixed options
    pub fn category(name: impl Into<String>, options: Vec<FieldOption>) -> Self {
        Self {
            options,
            ..Self::new(name, FieldType::Category)
        }
    }

    pub fn with_operators<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators = Some(operators.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_default_operator(mut self, operator: impl Into<String>) -> Self {
        self.default_operator = Some(operator.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value, &Rule) -> Option<String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_coercer<F>(mut self, coercer: F) -> Self
    where
        F: Fn(&str, Value, &Rule) -> Value + Send + Sync + 'static,
    {
        self.coercer = Some(Arc::new(coercer));
        self
    }

    /// type-derived zero value used when no default is configured
    pub fn zero_value(&self) -> Value {
        match self.field_type {
            FieldType::Number => Value::Number(0),
            FieldType::String => Value::String(String::new()),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Category => self
                .options
                .first()
                .map(|o| o.value.clone())
                .unwrap_or(Value::Null),
            FieldType::Date | FieldType::Time | FieldType::Custom => Value::Null,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("operators", &self.operators)
            .field("default_value", &self.default_value)
            .field("default_operator", &self.default_operator)
            .field("options", &self.options)
            .field("entity", &self.entity)
            .field("nullable", &self.nullable)
            .field("validator", &self.validator.is_some())
            .field("coercer", &self.coercer.is_some())
            .finish()
    }
}

/// a named group of fields (multi-entity queries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_field: Option<String>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_field: None,
        }
    }
}
