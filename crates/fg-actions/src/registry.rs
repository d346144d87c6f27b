// registry.rs: The action registry.
//
// Built once during startup through `&mut self`, then shared as
// `Arc<ActionRegistry>`. After that it is read-only, so concurrent lookups
// need no locking.

use std::collections::HashMap;

use serde::Serialize;

use crate::definition::{json_type_name, ActionDefinition};
use crate::error::ActionError;
use crate::plan::Params;

/// Serializable view of the registry, for introspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ActionManifest<'a> {
    pub actions: Vec<&'a ActionDefinition>,
    pub count: usize,
}

/// Name → definition map, preserving registration order.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    definitions: Vec<ActionDefinition>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of definitions, failing on the first duplicate.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ActionDefinition>,
    ) -> Result<Self, ActionError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, definition: ActionDefinition) -> Result<(), ActionError> {
        if self.index.contains_key(&definition.name) {
            return Err(ActionError::DuplicateAction(definition.name));
        }
        tracing::debug!(action = %definition.name, "registered action");
        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&ActionDefinition, ActionError> {
        self.index
            .get(name)
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| ActionError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All definitions in registration order.
    pub fn list(&self) -> Vec<&ActionDefinition> {
        self.definitions.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn manifest(&self) -> ActionManifest<'_> {
        ActionManifest {
            actions: self.list(),
            count: self.len(),
        }
    }

    /// Check a call's parameters against the action's declared schema.
    ///
    /// Required parameters must be present and non-null. Any declared
    /// parameter that is present and non-null must have the declared type.
    /// Undeclared parameters pass through untouched.
    pub fn validate_params(&self, name: &str, params: &Params) -> Result<(), ActionError> {
        let definition = self.lookup(name)?;

        for spec in &definition.params {
            match params.get(&spec.name) {
                None | Some(serde_json::Value::Null) if spec.required => {
                    return Err(ActionError::MissingParameter {
                        action: definition.name.clone(),
                        param: spec.name.clone(),
                    });
                }
                None | Some(serde_json::Value::Null) => {}
                Some(value) if !spec.param_type.accepts(value) => {
                    return Err(ActionError::TypeMismatch {
                        action: definition.name.clone(),
                        param: spec.name.clone(),
                        expected: spec.param_type,
                        found: json_type_name(value).to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
