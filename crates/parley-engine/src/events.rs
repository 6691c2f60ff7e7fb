//! Execution events and notifiers for observability.
//!
//! Events are emitted as executions enter, park in and leave wait-state
//! activities, so tests and drivers can observe progress without polling.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::execution::Variables;

/// Events emitted by the in-memory engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// An execution entered its activity.
  ActivityStarted {
    execution_id: String,
    activity_id: String,
  },

  /// The activity asked the engine to park the execution.
  ActivitySuspended { execution_id: String },

  /// A variable was written onto a waiting execution.
  VariableSet { execution_id: String, key: String },

  /// A waiting execution was signalled.
  Signalled { execution_id: String },

  /// The execution left its activity.
  ActivityCompleted {
    execution_id: String,
    variables: Variables,
  },

  /// The activity behaviour failed.
  ActivityFailed { execution_id: String, error: String },
}

/// Trait for receiving execution events.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
