use std::sync::Arc;

use async_trait::async_trait;
use parley_engine::{ActivityBehavior, ActivityOutcome, BehaviorError, Execution};
use parley_message::{Message, MessageChannel};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::asynchronous::Asynchronous;
use crate::error::GatewayError;
use crate::shared::GatewayCore;
use crate::state::GatewayState;
use crate::strategy::DispatchStrategy;
use crate::synchronous::Synchronous;

/// Wait-state activity that hands the execution to a message channel.
///
/// Register it with the engine as the behaviour of the activity. Build it
/// with [`GatewayBuilder`](crate::GatewayBuilder).
pub struct MessagingGateway<S: DispatchStrategy> {
  core: Arc<GatewayCore>,
  strategy: S,
  cancel: CancellationToken,
}

/// Gateway that blocks for the reply and leaves in the same call.
pub type SyncGateway = MessagingGateway<Synchronous>;

/// Gateway that parks the execution until a correlated reply arrives.
pub type AsyncGateway = MessagingGateway<Asynchronous>;

impl<S: DispatchStrategy> MessagingGateway<S> {
  pub(crate) fn init(core: GatewayCore, cancel: CancellationToken) -> Result<Self, GatewayError> {
    let core = Arc::new(core);
    let strategy = S::on_init(&core, &cancel)?;
    Ok(Self {
      core,
      strategy,
      cancel,
    })
  }

  /// Cycle state of `execution_id` as seen by this gateway.
  pub fn state(&self, execution_id: &str) -> GatewayState {
    self.core.state(execution_id)
  }

  /// Drop the record of a finished cycle.
  pub fn forget(&self, execution_id: &str) {
    self.core.cycles.forget(execution_id);
  }

  /// Number of executions this gateway holds cycle state for.
  pub fn tracked_cycles(&self) -> usize {
    self.core.cycles.len()
  }

  pub fn request_channel(&self) -> &Arc<dyn MessageChannel> {
    self.core.request_channel()
  }

  pub fn reply_channel(&self) -> &Arc<dyn MessageChannel> {
    self.core.reply_channel()
  }

  /// Stop background work and wait for it to finish.
  pub async fn shutdown(&self) {
    self.cancel.cancel();
    self.strategy.on_shutdown().await;
  }
}

impl AsyncGateway {
  /// Apply a reply without going through the reply channel.
  ///
  /// Returns the variables written to the execution.
  pub async fn handle_reply(&self, reply: &Message) -> Result<Vec<String>, GatewayError> {
    self.core.resume(reply).await
  }
}

impl<S: DispatchStrategy> Drop for MessagingGateway<S> {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

#[async_trait]
impl<S: DispatchStrategy> ActivityBehavior for MessagingGateway<S> {
  #[instrument(
    name = "gateway_execute",
    skip(self, execution),
    fields(execution_id = %execution.id())
  )]
  async fn execute(&self, execution: &mut Execution) -> Result<ActivityOutcome, BehaviorError> {
    let execution_id = execution.id().to_string();
    let request = self.core.build_request(execution)?;

    self.core.cycles.set(&execution_id, GatewayState::Suspended);
    match self.strategy.on_execute(&self.core, execution, request).await {
      Ok(outcome) => Ok(outcome),
      Err(err) => {
        self.core.cycles.forget(&execution_id);
        error!(
          execution_id = %execution_id,
          kind = %err.kind(),
          error = %err,
          "gateway_dispatch_failed"
        );
        Err(err.into())
      }
    }
  }

  /// Always leaves the activity.
  async fn signal(
    &self,
    execution: &mut Execution,
    signal_name: Option<&str>,
    _data: Option<serde_json::Value>,
  ) -> Result<ActivityOutcome, BehaviorError> {
    // Replies hold their own claim; anything else is an outside signal.
    self.core.cycles.resume_if_suspended(execution.id());
    info!(
      execution_id = %execution.id(),
      signal = signal_name.unwrap_or_default(),
      "gateway_signalled"
    );
    Ok(ActivityOutcome::Leave)
  }
}
