use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Process variables keyed by name.
pub type Variables = HashMap<String, serde_json::Value>;

/// A live point of progress in a workflow instance.
///
/// Identifiers are fixed at construction and stay stable for the lifetime
/// of a suspension. Only the variable store is mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
  id: String,
  process_instance_id: String,
  process_definition_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  process_definition_name: Option<String>,
  activity_id: String,
  #[serde(default)]
  variables: Variables,
}

impl Execution {
  pub fn new(
    id: impl Into<String>,
    process_instance_id: impl Into<String>,
    process_definition_id: impl Into<String>,
    activity_id: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      process_instance_id: process_instance_id.into(),
      process_definition_id: process_definition_id.into(),
      process_definition_name: None,
      activity_id: activity_id.into(),
      variables: Variables::new(),
    }
  }

  pub fn with_process_definition_name(mut self, name: impl Into<String>) -> Self {
    self.process_definition_name = Some(name.into());
    self
  }

  pub fn with_variables(mut self, variables: Variables) -> Self {
    self.variables.extend(variables);
    self
  }

  pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.variables.insert(key.into(), value.into());
    self
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn process_instance_id(&self) -> &str {
    &self.process_instance_id
  }

  pub fn process_definition_id(&self) -> &str {
    &self.process_definition_id
  }

  pub fn process_definition_name(&self) -> Option<&str> {
    self.process_definition_name.as_deref()
  }

  pub fn activity_id(&self) -> &str {
    &self.activity_id
  }

  pub fn variables(&self) -> &Variables {
    &self.variables
  }

  pub fn variable(&self, key: &str) -> Option<&serde_json::Value> {
    self.variables.get(key)
  }

  /// Set a variable, returning the previous value.
  pub fn set_variable(
    &mut self,
    key: impl Into<String>,
    value: serde_json::Value,
  ) -> Option<serde_json::Value> {
    self.variables.insert(key.into(), value)
  }

  /// Snapshot of the identifiers, without variables.
  pub fn to_ref(&self) -> ExecutionRef {
    ExecutionRef {
      execution_id: self.id.clone(),
      process_instance_id: self.process_instance_id.clone(),
      process_definition_id: self.process_definition_id.clone(),
      process_definition_name: self.process_definition_name.clone(),
      activity_id: self.activity_id.clone(),
    }
  }
}

/// Serializable reference to an execution.
///
/// Carried as the payload of outbound gateway messages so the far side can
/// see which suspension a request belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRef {
  pub execution_id: String,
  pub process_instance_id: String,
  pub process_definition_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub process_definition_name: Option<String>,
  pub activity_id: String,
}
