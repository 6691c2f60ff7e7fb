//! Channel and handler traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::Message;

/// Error returned by a [`MessageHandler`].
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A named destination messages can be sent to.
///
/// Consumers discover how to read from a channel through
/// [`into_pollable`](MessageChannel::into_pollable) and
/// [`into_subscribable`](MessageChannel::into_subscribable). A send-only
/// channel returns `None` from both.
#[async_trait]
pub trait MessageChannel: Send + Sync {
  fn name(&self) -> &str;

  async fn send(&self, message: Message) -> Result<(), ChannelError>;

  /// Pull-based view of this channel, if it buffers messages.
  fn into_pollable(self: Arc<Self>) -> Option<Arc<dyn PollableChannel>> {
    None
  }

  /// Push-based view of this channel, if it dispatches to subscribers.
  fn into_subscribable(self: Arc<Self>) -> Option<Arc<dyn SubscribableChannel>> {
    None
  }
}

/// A channel consumers pull messages from.
#[async_trait]
pub trait PollableChannel: MessageChannel {
  /// Wait up to `timeout` for the next message.
  async fn receive(&self, timeout: Duration) -> Option<Message>;
}

/// A channel that pushes messages to subscribed handlers.
pub trait SubscribableChannel: MessageChannel {
  fn subscribe(&self, handler: Arc<dyn MessageHandler>);
}

/// Receives messages pushed by a [`SubscribableChannel`].
#[async_trait]
pub trait MessageHandler: Send + Sync {
  async fn handle_message(&self, message: Message) -> Result<(), HandlerError>;
}
