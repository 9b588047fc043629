use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::constraints::Constraints;
use crate::builder::OperatorPolicy;
use crate::fields::{Arity, EntityDescriptor, FieldOption, FieldType};
use crate::tree::Value;
use crate::validate::ValidationOptions;

/// contents of a fields file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// field id -> field, in file order
    #[serde(with = "ordered")]
    pub fields: Vec<(String, FieldConfig)>,
    #[serde(with = "ordered", skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<(String, EntityDescriptor)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_field: Option<String>,
    /// type name -> operator list, replacing the built-in defaults
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub operator_map: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub operator_arity: BTreeMap<String, Arity>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// display name; the field id when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_operator: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// what `change_operator` does with an operator the field does not allow
    pub invalid_operator: OperatorPolicy,
    #[serde(flatten)]
    pub validation: ValidationOptions,
}

impl FieldConfig {
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(id)
    }
}

impl fmt::Display for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_type)?;
        if self.nullable {
            write!(f, ", nullable")?;
        }
        if let Some(entity) = &self.entity {
            write!(f, ", entity {}", entity)?;
        }
        Ok(())
    }
}

/// JSON object <-> `Vec<(String, T)>` keeping key order
mod ordered {
    use super::*;

    pub fn serialize<S, T>(entries: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }

    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "an object")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries: Vec<(String, T)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, T>()? {
                // a repeated key replaces the earlier entry in place
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value,
                    None => entries.push((key, value)),
                }
            }
            Ok(entries)
        }
    }
}
