use async_trait::async_trait;

use crate::error::EngineError;
use crate::execution::Execution;

/// Query and mutation API of a workflow engine.
///
/// Used to resume an execution from outside the call stack that parked it.
/// Every operation addresses the execution by id and only sees executions
/// that are currently waiting.
#[async_trait]
pub trait ProcessEngine: Send + Sync {
  /// Look up a waiting execution.
  async fn find_execution(&self, execution_id: &str) -> Result<Option<Execution>, EngineError>;

  /// Write a variable onto a waiting execution.
  async fn set_variable(
    &self,
    execution_id: &str,
    key: &str,
    value: serde_json::Value,
  ) -> Result<(), EngineError>;

  /// Wake a waiting execution.
  async fn signal(&self, execution_id: &str) -> Result<(), EngineError>;
}
