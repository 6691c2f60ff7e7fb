//! Engine errors.

use crate::behavior::BehaviorError;

/// Errors raised by a [`ProcessEngine`](crate::ProcessEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// No live (waiting) execution has this id.
  #[error("no waiting execution with id '{execution_id}'")]
  ExecutionNotFound { execution_id: String },

  /// An execution with this id is already running or waiting.
  #[error("execution '{execution_id}' already exists")]
  DuplicateExecution { execution_id: String },

  /// The activity behaviour failed.
  #[error("activity behaviour failed for execution '{execution_id}': {source}")]
  Behavior {
    execution_id: String,
    #[source]
    source: BehaviorError,
  },
}

impl EngineError {
  pub fn not_found(execution_id: impl Into<String>) -> Self {
    Self::ExecutionNotFound {
      execution_id: execution_id.into(),
    }
  }
}
