//! query builder: owns the rule tree and applies mutations to it
//!
//! every successful mutation emits exactly one notification burst
//! (touched listeners, then change listeners). failed mutations and no-ops
//! leave the tree as it was and emit nothing.
//!
//! nodes are addressed by `NodePath`; the empty path is the root group.

mod listeners;

pub use listeners::{Callback, ListenerId, Listeners};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::fields::FieldRegistry;
use crate::tree::{Condition, Node, NodePath, Rule, RuleGroup, Value};
use crate::validate::{validate, ValidationOptions, ValidationReport};

/// what `change_operator` does with an operator the field does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorPolicy {
    /// fail with `InvalidOperator`
    #[default]
    Reject,
    /// leave the rule unchanged and log a warning
    Ignore,
}

impl fmt::Display for OperatorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorPolicy::Reject => write!(f, "reject"),
            OperatorPolicy::Ignore => write!(f, "ignore"),
        }
    }
}

pub struct QueryBuilder {
    registry: Arc<FieldRegistry>,
    root: RuleGroup,
    listeners: Listeners,
    operator_policy: OperatorPolicy,
}

impl QueryBuilder {
    /// create a builder with an empty AND root group
    pub fn new(registry: impl Into<Arc<FieldRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            root: RuleGroup::new(Condition::And),
            listeners: Listeners::new(),
            operator_policy: OperatorPolicy::default(),
        }
    }

    pub fn with_root(mut self, root: RuleGroup) -> Self {
        self.root = root;
        self
    }

    pub fn with_operator_policy(mut self, policy: OperatorPolicy) -> Self {
        self.operator_policy = policy;
        self
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn root(&self) -> &RuleGroup {
        &self.root
    }

    pub fn into_root(self) -> RuleGroup {
        self.root
    }

    pub fn operator_policy(&self) -> OperatorPolicy {
        self.operator_policy
    }

    /// replace the tree with one supplied by the caller
    ///
    /// this is a load, not an edit: listeners are not notified and rules that
    /// reference unknown fields are kept as they are
    pub fn set_root(&mut self, root: RuleGroup) {
        self.root = root;
    }

    /// replace the field registry; existing rules are not migrated
    pub fn reconfigure(&mut self, registry: impl Into<Arc<FieldRegistry>>) {
        self.registry = registry.into();
        debug!(fields = self.registry.len(), "field registry replaced");
    }

    pub fn on_touched(&mut self, callback: impl FnMut() + 'static) -> ListenerId {
        self.listeners.on_touched(callback)
    }

    pub fn on_change(&mut self, callback: impl FnMut() + 'static) -> ListenerId {
        self.listeners.on_change(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// append a rule built from the registry defaults; returns its path
    pub fn add_rule(&mut self, group: &NodePath) -> QueryResult<NodePath> {
        let rule = self.default_rule()?;
        let target = self.group_mut(group)?;

        debug!(group = %group, rule = %rule, "adding rule");
        target.rules.push(Node::Rule(rule));
        let path = group.child(target.rules.len() - 1);

        self.listeners.notify();
        Ok(path)
    }

    /// remove the first rule in `parent` equal to `rule`
    ///
    /// returns false (and notifies nobody) when no such rule exists
    pub fn remove_rule(&mut self, rule: &Rule, parent: &NodePath) -> QueryResult<bool> {
        let target = self.group_mut(parent)?;

        let position = target
            .rules
            .iter()
            .position(|node| matches!(node, Node::Rule(r) if r == rule));

        match position {
            Some(index) => {
                target.rules.remove(index);
                debug!(group = %parent, index, "removed rule");
                self.listeners.notify();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// append an empty AND group; returns its path
    pub fn add_group(&mut self, group: &NodePath) -> QueryResult<NodePath> {
        let target = self.group_mut(group)?;

        target.rules.push(Node::Group(RuleGroup::new(Condition::And)));
        let path = group.child(target.rules.len() - 1);
        debug!(group = %group, path = %path, "added group");

        self.listeners.notify();
        Ok(path)
    }

    /// remove the first nested group in `parent` equal to `group`
    pub fn remove_group(&mut self, group: &RuleGroup, parent: &NodePath) -> QueryResult<bool> {
        let target = self.group_mut(parent)?;

        let position = target
            .rules
            .iter()
            .position(|node| matches!(node, Node::Group(g) if g == group));

        match position {
            Some(index) => {
                target.rules.remove(index);
                debug!(group = %parent, index, "removed group");
                self.listeners.notify();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// select a new field and reset operator and value to its defaults
    ///
    /// the reset is unconditional: the previous operator and value are
    /// discarded even when the new field would accept them
    pub fn change_field(&mut self, field: &str, rule: &NodePath) -> QueryResult<()> {
        let entity = self.registry.describe(field)?.entity.clone();
        let updated = self.field_rule(field, entity)?;

        let target = self.rule_mut(rule)?;
        *target = updated;
        debug!(path = %rule, rule = %target, "changed field");

        self.listeners.notify();
        Ok(())
    }

    /// set the operator and reshape the stored value for its arity
    pub fn change_operator(&mut self, operator: &str, rule: &NodePath) -> QueryResult<()> {
        let field = self.rule_ref(rule)?.field.clone();

        if !self.registry.is_operator_allowed(&field, operator)? {
            match self.operator_policy {
                OperatorPolicy::Reject => {
                    return Err(QueryError::InvalidOperator {
                        field,
                        operator: operator.to_string(),
                    })
                }
                OperatorPolicy::Ignore => {
                    warn!(field = %field, operator, "ignoring operator not allowed for field");
                    return Ok(());
                }
            }
        }

        let mut updated = self.rule_ref(rule)?.clone();
        updated.operator = Some(operator.to_string());
        updated.value =
            self.registry
                .coerce_value_for_operator(operator, updated.value.clone(), &updated);

        let target = self.rule_mut(rule)?;
        *target = updated;
        debug!(path = %rule, rule = %target, "changed operator");

        self.listeners.notify();
        Ok(())
    }

    /// switch a rule to another entity and select that entity's default field
    pub fn change_entity(&mut self, entity: &str, rule: &NodePath) -> QueryResult<()> {
        let field = self
            .registry
            .default_field_for_entity(entity)?
            .map(str::to_string);

        // validate the target before touching anything
        self.rule_ref(rule)?;

        let updated = match field {
            Some(f) => self.field_rule(&f, Some(entity.to_string()))?,
            None => Rule {
                field: String::new(),
                operator: None,
                value: Value::Null,
                entity: Some(entity.to_string()),
            },
        };

        let target = self.rule_mut(rule)?;
        *target = updated;
        debug!(path = %rule, entity, "changed entity");

        self.listeners.notify();
        Ok(())
    }

    /// direct value edit; the value is stored as given
    pub fn set_value(&mut self, value: Value, rule: &NodePath) -> QueryResult<()> {
        let target = self.rule_mut(rule)?;
        target.value = value;
        debug!(path = %rule, value = %target.value, "set value");

        self.listeners.notify();
        Ok(())
    }

    pub fn set_condition(&mut self, condition: Condition, group: &NodePath) -> QueryResult<()> {
        self.group_mut(group)?.condition = condition;
        debug!(group = %group, %condition, "set condition");

        self.listeners.notify();
        Ok(())
    }

    pub fn set_negated(&mut self, negated: bool, group: &NodePath) -> QueryResult<()> {
        self.group_mut(group)?.not = negated;
        debug!(group = %group, negated, "set negation");

        self.listeners.notify();
        Ok(())
    }

    /// reshape a value for an operator without touching the tree
    pub fn coerce_value_for_operator(&self, operator: &str, value: Value, rule: &Rule) -> Value {
        self.registry
            .coerce_value_for_operator(operator, value, rule)
    }

    /// validate the current tree; `None` means no errors
    pub fn validate(&self, options: &ValidationOptions) -> Option<ValidationReport> {
        validate(&self.root, &self.registry, options)
    }

    fn default_rule(&self) -> QueryResult<Rule> {
        let field = self
            .registry
            .default_field()
            .ok_or(QueryError::EmptyRegistry)?;
        let entity = self.registry.describe(field)?.entity.clone();

        self.field_rule(field, entity)
    }

    /// a rule on `field` with its default operator and a default value
    /// already shaped for that operator
    fn field_rule(&self, field: &str, entity: Option<String>) -> QueryResult<Rule> {
        let mut rule = Rule {
            field: field.to_string(),
            operator: self.registry.default_operator_for(field)?,
            value: Value::Null,
            entity,
        };

        let value = self.registry.default_value_for(field)?;
        rule.value = match rule.operator.as_deref() {
            Some(op) => self.registry.coerce_value_for_operator(op, value, &rule),
            None => value,
        };
        Ok(rule)
    }

    fn group_mut(&mut self, path: &NodePath) -> QueryResult<&mut RuleGroup> {
        self.root
            .group_at_mut(path)
            .ok_or_else(|| QueryError::InvalidParent(path.clone()))
    }

    fn rule_ref(&self, path: &NodePath) -> QueryResult<&Rule> {
        self.root
            .rule_at(path)
            .ok_or_else(|| QueryError::NotARule(path.clone()))
    }

    fn rule_mut(&mut self, path: &NodePath) -> QueryResult<&mut Rule> {
        self.root
            .rule_at_mut(path)
            .ok_or_else(|| QueryError::NotARule(path.clone()))
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("fields", &self.registry.len())
            .field("root", &self.root)
            .field("listeners", &self.listeners)
            .field("operator_policy", &self.operator_policy)
            .finish()
    }
}
