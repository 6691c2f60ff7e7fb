//! In-memory process engine.
//!
//! Executions are kept in a map of per-execution slots. A slot is locked for
//! the whole of a behaviour call, so a resume that races the `execute` call
//! which parked the execution waits until that call has returned, the same
//! way a database-backed engine serialises on the execution row.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{error, info, instrument};

use crate::behavior::{ActivityBehavior, ActivityOutcome, BehaviorError};
use crate::engine::ProcessEngine;
use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::execution::Execution;

/// Lifecycle of an execution inside the in-memory engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Running,
  Waiting,
  Completed,
  Failed,
}

struct Slot {
  execution: Execution,
  status: ExecutionStatus,
  behavior: Arc<dyn ActivityBehavior>,
}

/// A process engine that keeps executions in memory.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use `InMemoryProcessEngine::new()` for no-op notifications.
pub struct InMemoryProcessEngine<N: ExecutionNotifier = NoopNotifier> {
  live: RwLock<HashMap<String, Arc<Mutex<Slot>>>>,
  finished: RwLock<HashMap<String, (ExecutionStatus, Execution)>>,
  notifier: N,
}

impl InMemoryProcessEngine<NoopNotifier> {
  pub fn new() -> Self {
    Self::with_notifier(NoopNotifier)
  }
}

impl Default for InMemoryProcessEngine<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

impl<N: ExecutionNotifier> InMemoryProcessEngine<N> {
  pub fn with_notifier(notifier: N) -> Self {
    Self {
      live: RwLock::new(HashMap::new()),
      finished: RwLock::new(HashMap::new()),
      notifier,
    }
  }

  /// Enter `behavior`'s activity with a new execution.
  ///
  /// Returns the behaviour's outcome: on [`ActivityOutcome::Wait`] the
  /// execution stays parked until signalled, on [`ActivityOutcome::Leave`]
  /// it is completed before this call returns.
  #[instrument(
    name = "engine_run_activity",
    skip(self, execution, behavior),
    fields(execution_id = %execution.id(), activity_id = %execution.activity_id())
  )]
  pub async fn run_activity(
    &self,
    execution: Execution,
    behavior: Arc<dyn ActivityBehavior>,
  ) -> Result<ActivityOutcome, EngineError> {
    let execution_id = execution.id().to_string();
    let activity_id = execution.activity_id().to_string();

    let slot = Arc::new(Mutex::new(Slot {
      execution,
      status: ExecutionStatus::Running,
      behavior,
    }));

    // Lock before publishing the slot so lookups wait for `execute` to return.
    let mut guard = slot.clone().lock_owned().await;
    {
      let mut live = self.live.write().await;
      if live.contains_key(&execution_id) {
        return Err(EngineError::DuplicateExecution { execution_id });
      }
      live.insert(execution_id.clone(), slot);
    }

    self.notifier.notify(ExecutionEvent::ActivityStarted {
      execution_id: execution_id.clone(),
      activity_id,
    });

    let behavior = guard.behavior.clone();
    let result = behavior.execute(&mut guard.execution).await;
    self.settle(guard, result).await
  }

  /// Signal a waiting execution with an optional signal name and data.
  #[instrument(name = "engine_signal", skip(self, data))]
  pub async fn signal_with(
    &self,
    execution_id: &str,
    signal_name: Option<&str>,
    data: Option<serde_json::Value>,
  ) -> Result<ActivityOutcome, EngineError> {
    let mut guard = self.lock_waiting(execution_id).await?;

    self.notifier.notify(ExecutionEvent::Signalled {
      execution_id: execution_id.to_string(),
    });

    let behavior = guard.behavior.clone();
    let result = behavior
      .signal(&mut guard.execution, signal_name, data)
      .await;
    self.settle(guard, result).await
  }

  /// Status of an execution this engine has seen.
  pub async fn status(&self, execution_id: &str) -> Option<ExecutionStatus> {
    if let Some(slot) = self.slot(execution_id).await {
      return Some(slot.lock().await.status);
    }
    self
      .finished
      .read()
      .await
      .get(execution_id)
      .map(|(status, _)| *status)
  }

  /// Final state of an execution that left its activity.
  pub async fn completed(&self, execution_id: &str) -> Option<Execution> {
    self
      .finished
      .read()
      .await
      .get(execution_id)
      .filter(|(status, _)| *status == ExecutionStatus::Completed)
      .map(|(_, execution)| execution.clone())
  }

  /// Number of executions currently parked.
  pub async fn waiting_count(&self) -> usize {
    let slots: Vec<_> = self.live.read().await.values().cloned().collect();
    let mut waiting = 0;
    for slot in slots {
      if slot.lock().await.status == ExecutionStatus::Waiting {
        waiting += 1;
      }
    }
    waiting
  }

  async fn slot(&self, execution_id: &str) -> Option<Arc<Mutex<Slot>>> {
    self.live.read().await.get(execution_id).cloned()
  }

  async fn lock_waiting(&self, execution_id: &str) -> Result<OwnedMutexGuard<Slot>, EngineError> {
    let slot = self
      .slot(execution_id)
      .await
      .ok_or_else(|| EngineError::not_found(execution_id))?;

    let guard = slot.lock_owned().await;
    if guard.status != ExecutionStatus::Waiting {
      return Err(EngineError::not_found(execution_id));
    }
    Ok(guard)
  }

  /// Apply a behaviour result to the locked slot.
  async fn settle(
    &self,
    mut guard: OwnedMutexGuard<Slot>,
    result: Result<ActivityOutcome, BehaviorError>,
  ) -> Result<ActivityOutcome, EngineError> {
    let execution_id = guard.execution.id().to_string();

    match result {
      Ok(ActivityOutcome::Wait) => {
        guard.status = ExecutionStatus::Waiting;
        info!(execution_id = %execution_id, "execution_waiting");
        self.notifier.notify(ExecutionEvent::ActivitySuspended {
          execution_id,
        });
        Ok(ActivityOutcome::Wait)
      }
      Ok(ActivityOutcome::Leave) => {
        guard.status = ExecutionStatus::Completed;
        let variables = guard.execution.variables().clone();
        self.retire(&execution_id, &guard).await;
        info!(execution_id = %execution_id, "execution_completed");
        self.notifier.notify(ExecutionEvent::ActivityCompleted {
          execution_id,
          variables,
        });
        Ok(ActivityOutcome::Leave)
      }
      Err(source) if guard.status == ExecutionStatus::Waiting => {
        // A failed signal leaves the execution parked.
        error!(execution_id = %execution_id, error = %source, "signal_failed");
        self.notifier.notify(ExecutionEvent::ActivityFailed {
          execution_id: execution_id.clone(),
          error: source.to_string(),
        });
        Err(EngineError::Behavior {
          execution_id,
          source,
        })
      }
      Err(source) => {
        guard.status = ExecutionStatus::Failed;
        self.retire(&execution_id, &guard).await;
        error!(execution_id = %execution_id, error = %source, "execution_failed");
        self.notifier.notify(ExecutionEvent::ActivityFailed {
          execution_id: execution_id.clone(),
          error: source.to_string(),
        });
        Err(EngineError::Behavior {
          execution_id,
          source,
        })
      }
    }
  }

  /// Move a slot from the live map to the finished map.
  async fn retire(&self, execution_id: &str, slot: &Slot) {
    self.live.write().await.remove(execution_id);
    self.finished.write().await.insert(
      execution_id.to_string(),
      (slot.status, slot.execution.clone()),
    );
  }
}

#[async_trait]
impl<N: ExecutionNotifier> ProcessEngine for InMemoryProcessEngine<N> {
  async fn find_execution(&self, execution_id: &str) -> Result<Option<Execution>, EngineError> {
    match self.lock_waiting(execution_id).await {
      Ok(guard) => Ok(Some(guard.execution.clone())),
      Err(EngineError::ExecutionNotFound { .. }) => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn set_variable(
    &self,
    execution_id: &str,
    key: &str,
    value: serde_json::Value,
  ) -> Result<(), EngineError> {
    let mut guard = self.lock_waiting(execution_id).await?;
    guard.execution.set_variable(key, value);
    self.notifier.notify(ExecutionEvent::VariableSet {
      execution_id: execution_id.to_string(),
      key: key.to_string(),
    });
    Ok(())
  }

  async fn signal(&self, execution_id: &str) -> Result<(), EngineError> {
    self.signal_with(execution_id, None, None).await.map(|_| ())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::ChannelNotifier;
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tokio::sync::mpsc;

  /// Parks on execute, leaves on signal.
  #[derive(Default)]
  struct ReceiveTask {
    signals: AtomicUsize,
  }

  #[async_trait]
  impl ActivityBehavior for ReceiveTask {
    async fn execute(&self, _execution: &mut Execution) -> Result<ActivityOutcome, BehaviorError> {
      Ok(ActivityOutcome::Wait)
    }

    async fn signal(
      &self,
      execution: &mut Execution,
      signal_name: Option<&str>,
      _data: Option<serde_json::Value>,
    ) -> Result<ActivityOutcome, BehaviorError> {
      self.signals.fetch_add(1, Ordering::SeqCst);
      if let Some(name) = signal_name {
        execution.set_variable("signal", json!(name));
      }
      Ok(ActivityOutcome::Leave)
    }
  }

  struct Broken;

  #[async_trait]
  impl ActivityBehavior for Broken {
    async fn execute(&self, _execution: &mut Execution) -> Result<ActivityOutcome, BehaviorError> {
      Err("no route to service".into())
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

  fn execution(id: &str) -> Execution {
    Execution::new(id, "pi-1", "pd-1", "wait").with_variable("customerId", 22)
  }

  #[tokio::test]
  async fn test_wait_then_signal_completes() {
    let engine = InMemoryProcessEngine::new();
    let behavior = Arc::new(ReceiveTask::default());

    let outcome = engine
      .run_activity(execution("exe-1"), behavior.clone())
      .await
      .unwrap();
    assert_eq!(outcome, ActivityOutcome::Wait);
    assert_eq!(engine.status("exe-1").await, Some(ExecutionStatus::Waiting));
    assert_eq!(engine.waiting_count().await, 1);

    engine
      .set_variable("exe-1", "approved", json!(true))
      .await
      .unwrap();
    engine.signal("exe-1").await.unwrap();

    let done = engine.completed("exe-1").await.unwrap();
    assert_eq!(done.variable("approved"), Some(&json!(true)));
    assert_eq!(done.variable("customerId"), Some(&json!(22)));
    assert_eq!(behavior.signals.load(Ordering::SeqCst), 1);
    assert_eq!(engine.waiting_count().await, 0);
  }

  #[tokio::test]
  async fn test_find_execution_only_sees_waiting() {
    let engine = InMemoryProcessEngine::new();
    let behavior = Arc::new(ReceiveTask::default());

    assert!(engine.find_execution("exe-1").await.unwrap().is_none());

    engine
      .run_activity(execution("exe-1"), behavior)
      .await
      .unwrap();
    let found = engine.find_execution("exe-1").await.unwrap().unwrap();
    assert_eq!(found.process_instance_id(), "pi-1");

    engine.signal("exe-1").await.unwrap();
    assert!(engine.find_execution("exe-1").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_signal_unknown_execution_is_not_found() {
    let engine = InMemoryProcessEngine::new();

    let err = engine.signal("missing").await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutionNotFound { .. }));

    let err = engine
      .set_variable("missing", "k", json!(1))
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::ExecutionNotFound { .. }));
  }

  #[tokio::test]
  async fn test_second_signal_is_not_found() {
    let engine = InMemoryProcessEngine::new();
    let behavior = Arc::new(ReceiveTask::default());
    engine
      .run_activity(execution("exe-1"), behavior.clone())
      .await
      .unwrap();

    engine.signal("exe-1").await.unwrap();
    let err = engine.signal("exe-1").await.unwrap_err();

    assert!(matches!(err, EngineError::ExecutionNotFound { .. }));
    assert_eq!(behavior.signals.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_duplicate_execution_rejected() {
    let engine = InMemoryProcessEngine::new();
    let behavior = Arc::new(ReceiveTask::default());
    engine
      .run_activity(execution("exe-1"), behavior.clone())
      .await
      .unwrap();

    let err = engine
      .run_activity(execution("exe-1"), behavior)
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateExecution { .. }));
  }

  #[tokio::test]
  async fn test_signal_with_name_reaches_behavior() {
    let engine = InMemoryProcessEngine::new();
    engine
      .run_activity(execution("exe-1"), Arc::new(ReceiveTask::default()))
      .await
      .unwrap();

    let outcome = engine
      .signal_with("exe-1", Some("manual"), None)
      .await
      .unwrap();

    assert_eq!(outcome, ActivityOutcome::Leave);
    let done = engine.completed("exe-1").await.unwrap();
    assert_eq!(done.variable("signal"), Some(&json!("manual")));
  }

  #[tokio::test]
  async fn test_failed_execute_is_retired() {
    let engine = InMemoryProcessEngine::new();

    let err = engine
      .run_activity(execution("exe-1"), Arc::new(Broken))
      .await
      .unwrap_err();

    assert!(matches!(err, EngineError::Behavior { .. }));
    assert_eq!(engine.status("exe-1").await, Some(ExecutionStatus::Failed));
    assert!(engine.completed("exe-1").await.is_none());
  }

  #[tokio::test]
  async fn test_events_are_emitted_in_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = InMemoryProcessEngine::with_notifier(ChannelNotifier::new(tx));

    engine
      .run_activity(execution("exe-1"), Arc::new(ReceiveTask::default()))
      .await
      .unwrap();
    engine.set_variable("exe-1", "k", json!(1)).await.unwrap();
    engine.signal("exe-1").await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
      events.push(event);
    }

    assert!(matches!(events[0], ExecutionEvent::ActivityStarted { .. }));
    assert!(matches!(events[1], ExecutionEvent::ActivitySuspended { .. }));
    assert!(matches!(events[2], ExecutionEvent::VariableSet { .. }));
    assert!(matches!(events[3], ExecutionEvent::Signalled { .. }));
    assert!(matches!(events[4], ExecutionEvent::ActivityCompleted { .. }));
  }
}
