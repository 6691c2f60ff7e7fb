use std::sync::Arc;

use async_trait::async_trait;
use parley_engine::{ActivityOutcome, Execution};
use parley_message::Message;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;
use crate::shared::GatewayCore;

/// The two steps in which gateway strategies differ.
///
/// Request building, cycle tracking and the engine-facing behaviour are
/// shared by [`MessagingGateway`](crate::MessagingGateway).
#[async_trait]
pub trait DispatchStrategy: Send + Sync + Sized + 'static {
  /// Set up the strategy once the gateway is wired. `cancel` stops any
  /// background work the strategy starts.
  fn on_init(core: &Arc<GatewayCore>, cancel: &CancellationToken) -> Result<Self, GatewayError>;

  /// Dispatch `request` for `execution` and decide whether it waits.
  async fn on_execute(
    &self,
    core: &GatewayCore,
    execution: &mut Execution,
    request: Message,
  ) -> Result<ActivityOutcome, GatewayError>;

  /// Wait for background work to stop after cancellation.
  async fn on_shutdown(&self) {}
}
