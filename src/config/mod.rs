mod constraints;
mod schema;

pub use constraints::Constraints;
pub use schema::{FieldConfig, FieldsConfig, Settings};

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builder::QueryBuilder;
use crate::fields::{default_operators, FieldDescriptor, FieldRegistry, FieldType, NULL_OPERATORS};

const FIELDS_ENV_VAR: &str = "QTREE_FIELDS";

/// fields file location: explicit override, then `QTREE_FIELDS`, then
/// `~/.qtree/fields.json`
pub fn get_fields_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = env::var(FIELDS_ENV_VAR) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".qtree")
        .join("fields.json"))
}

fn is_json5(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json5"))
        .unwrap_or(false)
}

/// parse fields file contents; JSON5 accepts comments and unquoted keys
pub fn parse(content: &str, json5: bool) -> Result<FieldsConfig> {
    if json5 {
        json5::from_str(content).map_err(|e| anyhow!("invalid JSON5: {}", e))
    } else {
        serde_json::from_str(content).map_err(|e| anyhow!("invalid JSON: {}", e))
    }
}

pub fn load(path: &Path) -> Result<FieldsConfig> {
    if !path.exists() {
        return Err(anyhow!("fields file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fields file: {}", path.display()))?;

    let config = parse(&content, is_json5(path))
        .with_context(|| format!("Failed to parse fields file: {}", path.display()))?;

    tracing::debug!(path = %path.display(), fields = config.fields.len(), "loaded fields file");
    Ok(config)
}

/// Verify a fields file and return it with its list of errors
pub fn verify(path: &Path) -> Result<(FieldsConfig, Vec<String>)> {
    if !path.exists() {
        return Err(anyhow!("fields file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read fields file: {}", path.display()))?;

    let config = parse(&content, is_json5(path))?;
    let errors = verify_config(&config);

    Ok((config, errors))
}

/// semantic checks that deserialization cannot express
pub fn verify_config(config: &FieldsConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.fields.is_empty() {
        errors.push("fields: no fields defined".to_string());
    }

    if let Some(default) = &config.default_field {
        if !config.fields.iter().any(|(id, _)| id == default) {
            errors.push(format!("default_field: unknown field '{}'", default));
        }
    }

    for (id, entity) in &config.entities {
        if let Some(default) = &entity.default_field {
            match config.fields.iter().find(|(f, _)| f == default) {
                None => errors.push(format!(
                    "entities.{}: default_field '{}' is not a field",
                    id, default
                )),
                Some((_, field)) if field.entity.as_deref() != Some(id.as_str()) => {
                    errors.push(format!(
                        "entities.{}: default_field '{}' belongs to another entity",
                        id, default
                    ))
                }
                Some(_) => {}
            }
        }
    }

    for type_name in config.operator_map.keys() {
        if FieldType::parse(type_name).is_none() {
            errors.push(format!("operator_map: unknown field type '{}'", type_name));
        }
    }

    for (id, field) in &config.fields {
        let prefix = format!("fields.{}", id);

        if let Some(entity) = &field.entity {
            if !config.entities.iter().any(|(e, _)| e == entity) {
                errors.push(format!("{}: unknown entity '{}'", prefix, entity));
            }
        }

        if let Some(op) = &field.default_operator {
            if !config.effective_operators(field).contains(op) {
                errors.push(format!(
                    "{}: default_operator '{}' is not in operators",
                    prefix, op
                ));
            }
        }

        if !field.options.is_empty() && field.field_type != FieldType::Category {
            errors.push(format!(
                "{}: options are only used by category fields (type is {})",
                prefix, field.field_type
            ));
        }

        if let Some(constraints) = &field.constraints {
            if let Err(e) = constraints.compile(field.display_name(id), &config.operator_arity) {
                errors.push(format!("{}: {:#}", prefix, e));
            }
            if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
                if min > max {
                    errors.push(format!("{}: constraints min {} exceeds max {}", prefix, min, max));
                }
            }
        }
    }

    errors
}

impl FieldsConfig {
    /// build the registry described by this file
    pub fn to_registry(&self) -> Result<FieldRegistry> {
        let mut registry = FieldRegistry::new();

        for (id, entity) in &self.entities {
            registry = registry.with_entity(id.clone(), entity.clone());
        }

        for (id, field) in &self.fields {
            registry = registry.with_field(id.clone(), self.field_descriptor(id, field)?);
        }

        if let Some(default) = &self.default_field {
            registry = registry.with_default_field(default.clone());
        }

        for (type_name, operators) in &self.operator_map {
            let field_type = FieldType::parse(type_name)
                .ok_or_else(|| anyhow!("operator_map: unknown field type '{}'", type_name))?;
            registry = registry.with_type_operators(field_type, operators.iter().cloned());
        }

        for (operator, arity) in &self.operator_arity {
            registry = registry.with_operator_arity(operator.clone(), *arity);
        }

        Ok(registry)
    }

    /// builder over this file's registry, honoring its operator policy
    pub fn to_builder(&self) -> Result<QueryBuilder> {
        Ok(QueryBuilder::new(self.to_registry()?)
            .with_operator_policy(self.settings.invalid_operator))
    }

    /// operators a field allows once type defaults, `operator_map` and the
    /// null checks are applied
    fn effective_operators(&self, field: &FieldConfig) -> Vec<String> {
        let mut operators = match &field.operators {
            Some(ops) => ops.clone(),
            None => self
                .operator_map
                .iter()
                .find(|(name, _)| FieldType::parse(name) == Some(field.field_type))
                .map(|(_, ops)| ops.clone())
                .unwrap_or_else(|| {
                    default_operators(field.field_type)
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
        };
        if field.nullable {
            operators.extend(NULL_OPERATORS.iter().map(|s| s.to_string()));
        }
        operators
    }

    fn field_descriptor(&self, id: &str, field: &FieldConfig) -> Result<FieldDescriptor> {
        let name = field.display_name(id);
        let mut descriptor = FieldDescriptor::new(name, field.field_type);

        descriptor.operators = field.operators.clone();
        descriptor.default_value = field.default_value.clone();
        descriptor.default_operator = field.default_operator.clone();
        descriptor.options = field.options.clone();
        descriptor.entity = field.entity.clone();
        descriptor.nullable = field.nullable;

        if let Some(constraints) = field.constraints.as_ref().filter(|c| !c.is_empty()) {
            descriptor.validator = Some(
                constraints
                    .compile(name, &self.operator_arity)
                    .with_context(|| format!("fields.{}", id))?,
            );
        }

        Ok(descriptor)
    }
}
