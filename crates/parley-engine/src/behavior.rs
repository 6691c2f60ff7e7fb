use async_trait::async_trait;

use crate::execution::Execution;

/// Error returned by an [`ActivityBehavior`].
pub type BehaviorError = Box<dyn std::error::Error + Send + Sync>;

/// What the engine should do with an execution after a behaviour call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
  /// Park the execution until it is signalled.
  Wait,
  /// Complete the activity and continue the process.
  Leave,
}

/// Behaviour attached to a wait-state activity.
#[async_trait]
pub trait ActivityBehavior: Send + Sync {
  /// Called when an execution enters the activity.
  async fn execute(&self, execution: &mut Execution) -> Result<ActivityOutcome, BehaviorError>;

  /// Called when a parked execution is signalled.
  async fn signal(
    &self,
    execution: &mut Execution,
    signal_name: Option<&str>,
    data: Option<serde_json::Value>,
  ) -> Result<ActivityOutcome, BehaviorError>;
}
