//! field registry: ordered field lookup and the default policies built on it

use std::collections::HashMap;

use strsim::levenshtein;

use super::operators::{default_operators, Arity, NULL_OPERATORS};
use super::types::{EntityDescriptor, FieldDescriptor, FieldOption, FieldType};
use crate::coerce::coerce_for_arity;
use crate::error::{QueryError, QueryResult};
use crate::tree::{Rule, Value};

/// maximum edit distance for "did you mean" suggestions
const SUGGESTION_DISTANCE: usize = 2;

/// field id -> descriptor, in declaration order
///
/// declaration order is the iteration order and drives the default field
/// unless an explicit default is set
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<(String, FieldDescriptor)>,
    index: HashMap<String, usize>,
    entities: Vec<(String, EntityDescriptor)>,
    default_field: Option<String>,
    type_operators: HashMap<FieldType, Vec<String>>,
    operator_arity: HashMap<String, Arity>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a field; re-adding an id replaces the descriptor in place
    pub fn with_field(mut self, id: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        let id = id.into();
        match self.index.get(&id) {
            Some(&i) => self.fields[i].1 = descriptor,
            None => {
                self.index.insert(id.clone(), self.fields.len());
                self.fields.push((id, descriptor));
            }
        }
        self
    }

    pub fn with_entity(mut self, id: impl Into<String>, entity: EntityDescriptor) -> Self {
        let id = id.into();
        match self.entities.iter_mut().find(|(e, _)| *e == id) {
            Some((_, existing)) => *existing = entity,
            None => self.entities.push((id, entity)),
        }
        self
    }

    /// field used for new rules instead of the first declared one
    pub fn with_default_field(mut self, id: impl Into<String>) -> Self {
        self.default_field = Some(id.into());
        self
    }

    /// override the default operator list for a field type
    pub fn with_type_operators<I, S>(mut self, field_type: FieldType, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_operators
            .insert(field_type, operators.into_iter().map(Into::into).collect());
        self
    }

    /// declare or override the arity of an operator
    pub fn with_operator_arity(mut self, operator: impl Into<String>, arity: Arity) -> Self {
        self.operator_arity.insert(operator.into(), arity);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(id, d)| (id.as_str(), d))
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(id, _)| id.as_str())
    }

    pub fn entities(&self) -> impl Iterator<Item = (&str, &EntityDescriptor)> {
        self.entities.iter().map(|(id, e)| (id.as_str(), e))
    }

    pub fn entity(&self, id: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|(e, _)| e == id).map(|(_, e)| e)
    }

    pub fn describe(&self, id: &str) -> QueryResult<&FieldDescriptor> {
        self.index
            .get(id)
            .map(|&i| &self.fields[i].1)
            .ok_or_else(|| QueryError::UnknownField {
                field: id.to_string(),
                suggestions: self.suggest(id),
            })
    }

    /// allowed operators for a field, in display order
    ///
    /// descriptor operators, else the registry's per-type override, else the
    /// built-in type defaults; nullable fields get the null checks appended
    pub fn operators_for(&self, id: &str) -> QueryResult<Vec<String>> {
        let field = self.describe(id)?;

        let mut operators = match &field.operators {
            Some(ops) => ops.clone(),
            None => match self.type_operators.get(&field.field_type) {
                Some(ops) => ops.clone(),
                None => default_operators(field.field_type)
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        };

        if field.nullable {
            for op in NULL_OPERATORS {
                if !operators.iter().any(|o| o == op) {
                    operators.push(op.to_string());
                }
            }
        }

        Ok(operators)
    }

    pub fn is_operator_allowed(&self, id: &str, operator: &str) -> QueryResult<bool> {
        Ok(self.operators_for(id)?.iter().any(|o| o == operator))
    }

    /// operator given to a rule when its field is (re)selected
    ///
    /// a configured default the field does not allow falls back to the first
    /// allowed operator
    pub fn default_operator_for(&self, id: &str) -> QueryResult<Option<String>> {
        let field = self.describe(id)?;
        let operators = self.operators_for(id)?;

        if let Some(op) = &field.default_operator {
            if operators.contains(op) {
                return Ok(Some(op.clone()));
            }
            tracing::warn!(
                field = %id,
                operator = %op,
                "default operator is not allowed, using first operator"
            );
        }
        Ok(operators.into_iter().next())
    }

    /// value given to a rule when its field is (re)selected
    pub fn default_value_for(&self, id: &str) -> QueryResult<Value> {
        let field = self.describe(id)?;
        Ok(field
            .default_value
            .clone()
            .unwrap_or_else(|| field.zero_value()))
    }

    pub fn options_for(&self, id: &str) -> QueryResult<&[FieldOption]> {
        Ok(&self.describe(id)?.options)
    }

    /// field for new rules: the explicit default when it is known, else the first declared
    pub fn default_field(&self) -> Option<&str> {
        if let Some(id) = &self.default_field {
            if self.contains(id) {
                return Some(id.as_str());
            }
            tracing::warn!(field = %id, "default field is not registered, using first field");
        }
        self.field_ids().next()
    }

    /// fields belonging to an entity, in declaration order
    pub fn fields_for_entity<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(_, d)| d.entity.as_deref() == Some(entity))
            .map(|(id, _)| id.as_str())
    }

    /// field selected when a rule switches to an entity
    pub fn default_field_for_entity(&self, entity: &str) -> QueryResult<Option<&str>> {
        let descriptor = self
            .entity(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?;

        if let Some(id) = &descriptor.default_field {
            if self.contains(id) {
                return Ok(Some(id.as_str()));
            }
        }
        Ok(self
            .fields
            .iter()
            .find(|(_, d)| d.entity.as_deref() == Some(entity))
            .map(|(id, _)| id.as_str()))
    }

    /// arity of an operator, honoring registry overrides
    pub fn arity_of(&self, operator: &str) -> Arity {
        self.operator_arity
            .get(operator)
            .copied()
            .unwrap_or_else(|| Arity::of(operator))
    }

    /// reshape a value to what the operator expects
    ///
    /// a field coercer takes precedence over the arity rules
    pub fn coerce_value_for_operator(&self, operator: &str, value: Value, rule: &Rule) -> Value {
        if let Some(coercer) = self
            .index
            .get(&rule.field)
            .and_then(|&i| self.fields[i].1.coercer.as_ref())
        {
            return coercer(operator, value, rule);
        }
        coerce_for_arity(self.arity_of(operator), value)
    }

    /// similar field ids for an unknown id: prefix matches, then close edits
    pub fn suggest(&self, query: &str) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();

        let mut scored: Vec<(usize, &str)> = self
            .field_ids()
            .filter_map(|id| {
                let id_lower = id.to_lowercase();
                if id_lower.starts_with(&query_lower) || query_lower.starts_with(&id_lower) {
                    return Some((0, id));
                }
                let distance = levenshtein(&query_lower, &id_lower);
                (distance <= SUGGESTION_DISTANCE).then_some((distance, id))
            })
            .collect();

        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().map(|(_, id)| id.to_string()).collect()
    }
}
