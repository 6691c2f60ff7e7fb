//! Applying a reply to an execution.
//!
//! A reply is applied in two steps: write the accepted reply headers as
//! variables, then wake the execution. How each step reaches the execution
//! depends on whether the caller still holds it, so both go through a
//! [`SignalCallback`].

use async_trait::async_trait;
use parley_engine::{Execution, ProcessEngine, Variables};
use parley_mapping::ProcessVariableHeaderMapper;
use parley_message::Message;
use tracing::debug;

use crate::error::GatewayError;

#[async_trait]
pub trait SignalCallback: Send + Sync {
  async fn set_variable(
    &self,
    engine: &dyn ProcessEngine,
    execution: &mut Execution,
    key: &str,
    value: serde_json::Value,
  ) -> Result<(), GatewayError>;

  async fn signal(
    &self,
    engine: &dyn ProcessEngine,
    execution: &mut Execution,
  ) -> Result<(), GatewayError>;
}

/// Writes through the engine and wakes the parked execution.
///
/// Used when the reply arrives after the dispatching call has returned and
/// the execution only exists inside the engine.
///
/// Each variable is a separate engine call. If the execution leaves the
/// activity part way through, the variables written before that stay
/// applied and the next write fails with `NotFound`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineSignalCallback;

#[async_trait]
impl SignalCallback for EngineSignalCallback {
  async fn set_variable(
    &self,
    engine: &dyn ProcessEngine,
    execution: &mut Execution,
    key: &str,
    value: serde_json::Value,
  ) -> Result<(), GatewayError> {
    engine
      .set_variable(execution.id(), key, value.clone())
      .await
      .map_err(|e| GatewayError::from_engine(execution.id(), e))?;
    // Keep the local snapshot in step with the engine.
    execution.set_variable(key, value);
    Ok(())
  }

  async fn signal(
    &self,
    engine: &dyn ProcessEngine,
    execution: &mut Execution,
  ) -> Result<(), GatewayError> {
    engine
      .signal(execution.id())
      .await
      .map_err(|e| GatewayError::from_engine(execution.id(), e))
  }
}

/// Writes onto the execution in hand. Signalling is a no-op: the caller
/// leaves the activity itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSignalCallback;

#[async_trait]
impl SignalCallback for DirectSignalCallback {
  async fn set_variable(
    &self,
    _engine: &dyn ProcessEngine,
    execution: &mut Execution,
    key: &str,
    value: serde_json::Value,
  ) -> Result<(), GatewayError> {
    execution.set_variable(key, value);
    Ok(())
  }

  async fn signal(
    &self,
    _engine: &dyn ProcessEngine,
    execution: &mut Execution,
  ) -> Result<(), GatewayError> {
    debug!(execution_id = %execution.id(), "direct signal, nothing to wake");
    Ok(())
  }
}

/// Apply `reply` to `execution` and wake it.
///
/// With `apply` unset the reply headers are ignored and the execution is
/// only signalled. Returns the names of the variables written, sorted.
pub async fn signal_execution(
  engine: &dyn ProcessEngine,
  execution: &mut Execution,
  callback: &dyn SignalCallback,
  mapper: &dyn ProcessVariableHeaderMapper,
  reply: &Message,
  apply: bool,
) -> Result<Vec<String>, GatewayError> {
  let mut applied = Vec::new();

  if apply {
    let mut variables = Variables::new();
    mapper.from_headers(reply.headers(), &mut variables)?;

    let mut entries: Vec<_> = variables.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in entries {
      callback.set_variable(engine, execution, &key, value).await?;
      applied.push(key);
    }
  }

  callback.signal(engine, execution).await?;
  Ok(applied)
}

#[cfg(test)]
mod tests {
  use super::*;
  use parley_engine::{
    ActivityBehavior, ActivityOutcome, BehaviorError, ExecutionStatus, InMemoryProcessEngine,
  };
  use parley_mapping::{CorrelationIdentity, DefaultProcessVariableHeaderMapper, HeaderMappingRules};
  use parley_message::MessageBuilder;
  use serde_json::json;
  use std::sync::Arc;

  struct Park;

  #[async_trait]
  impl ActivityBehavior for Park {
    async fn execute(&self, _execution: &mut Execution) -> Result<ActivityOutcome, BehaviorError> {
      Ok(ActivityOutcome::Wait)
    }

    async fn signal(
      &self,
      _execution: &mut Execution,
      _signal_name: Option<&str>,
      _data: Option<serde_json::Value>,
    ) -> Result<ActivityOutcome, BehaviorError> {
      Ok(ActivityOutcome::Leave)
    }
  }

  fn execution() -> Execution {
    Execution::new("exe-1", "pi-1", "pd-1", "wait")
  }

  fn reply() -> Message {
    MessageBuilder::with_payload(json!(null))
      .copy_headers(CorrelationIdentity::of(&execution()).to_headers())
      .header("status", "approved")
      .header("food", "donuts")
      .build()
  }

  fn mapper() -> DefaultProcessVariableHeaderMapper {
    let rules = HeaderMappingRules::default().with_header_to_variable_names(["status"]);
    DefaultProcessVariableHeaderMapper::new(rules).unwrap()
  }

  #[tokio::test]
  async fn test_direct_callback_writes_in_hand() {
    let engine = InMemoryProcessEngine::new();
    let mut execution = execution();

    let applied = signal_execution(
      &engine,
      &mut execution,
      &DirectSignalCallback,
      &mapper(),
      &reply(),
      true,
    )
    .await
    .unwrap();

    assert_eq!(
      applied,
      ["activityId", "executionId", "processDefinitionId", "processInstanceId", "status"]
    );
    assert_eq!(execution.variable("status"), Some(&json!("approved")));
    assert_eq!(execution.variable("food"), None);
  }

  #[tokio::test]
  async fn test_apply_disabled_only_signals() {
    let engine = InMemoryProcessEngine::new();
    let mut execution = execution();

    let applied = signal_execution(
      &engine,
      &mut execution,
      &DirectSignalCallback,
      &mapper(),
      &reply(),
      false,
    )
    .await
    .unwrap();

    assert!(applied.is_empty());
    assert!(execution.variables().is_empty());
  }

  #[tokio::test]
  async fn test_engine_callback_resumes_parked_execution() {
    let engine = InMemoryProcessEngine::new();
    engine
      .run_activity(execution(), Arc::new(Park))
      .await
      .unwrap();

    let mut found = engine.find_execution("exe-1").await.unwrap().unwrap();
    signal_execution(
      &engine,
      &mut found,
      &EngineSignalCallback,
      &mapper(),
      &reply(),
      true,
    )
    .await
    .unwrap();

    assert_eq!(engine.status("exe-1").await, Some(ExecutionStatus::Completed));
    let completed = engine.completed("exe-1").await.unwrap();
    assert_eq!(completed.variable("status"), Some(&json!("approved")));
    assert_eq!(found.variable("status"), Some(&json!("approved")));
  }

  #[tokio::test]
  async fn test_engine_callback_reports_missing_execution() {
    let engine = InMemoryProcessEngine::new();
    let mut stale = execution();

    let err = signal_execution(
      &engine,
      &mut stale,
      &EngineSignalCallback,
      &mapper(),
      &reply(),
      true,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, GatewayError::NotFound { .. }));
  }
}
