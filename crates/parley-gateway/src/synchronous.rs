use std::sync::Arc;

use async_trait::async_trait;
use parley_engine::{ActivityOutcome, Execution};
use parley_mapping::correlation;
use parley_message::{ChannelError, Message};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::callback::{DirectSignalCallback, signal_execution};
use crate::error::GatewayError;
use crate::shared::GatewayCore;
use crate::state::GatewayState;
use crate::strategy::DispatchStrategy;

/// Send the request and wait for the reply inside `execute`.
///
/// The reply is applied to the execution in hand and the activity is left
/// in the same call, so the execution never parks. The engine call stays
/// open for the whole round trip; set a reply timeout for slow services.
#[derive(Debug, Clone, Copy, Default)]
pub struct Synchronous;

#[async_trait]
impl DispatchStrategy for Synchronous {
  fn on_init(_core: &Arc<GatewayCore>, _cancel: &CancellationToken) -> Result<Self, GatewayError> {
    Ok(Self)
  }

  async fn on_execute(
    &self,
    core: &GatewayCore,
    execution: &mut Execution,
    request: Message,
  ) -> Result<ActivityOutcome, GatewayError> {
    let execution_id = execution.id().to_string();
    info!(
      execution_id = %execution_id,
      channel = %core.request_channel.name(),
      message_id = %request.id(),
      "gateway_dispatched"
    );

    let reply = core
      .template
      .send_and_receive(
        core.request_channel.as_ref(),
        request,
        core.settings.reply_timeout,
      )
      .await
      .map_err(|err| match err {
        ChannelError::ReplyTimeout { timeout_ms, .. } => GatewayError::ReplyTimeout {
          execution_id: execution_id.clone(),
          timeout_ms,
        },
        other => GatewayError::Channel(other),
      })?;
    info!(execution_id = %execution_id, "reply_received");

    // The reply channel is private to this call, so a missing id is fine;
    // a different one is not.
    if let Some(received) = correlation::execution_id(reply.headers()) {
      if received != execution_id {
        return Err(GatewayError::CorrelationMismatch {
          expected: execution_id,
          received: received.to_string(),
        });
      }
    }

    core.cycles.set(&execution_id, GatewayState::Resuming);
    let applied = signal_execution(
      core.engine.as_ref(),
      execution,
      &DirectSignalCallback,
      core.mapper.as_ref(),
      &reply,
      core.settings.update_variables_from_reply,
    )
    .await?;
    // The reply slot was private to this call, so there is no late reply to
    // reject and nothing to remember.
    core.cycles.forget(&execution_id);

    info!(
      execution_id = %execution_id,
      applied = applied.len(),
      "execution_resumed"
    );
    Ok(ActivityOutcome::Leave)
  }
}
