//! Channel error types.

use crate::channel::HandlerError;

/// Errors raised while sending or receiving messages.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
  /// The channel no longer accepts messages.
  #[error("channel '{channel}' is closed")]
  Closed { channel: String },

  /// A subscribable channel was sent to while nobody was subscribed.
  #[error("channel '{channel}' has no subscribers")]
  NoSubscribers { channel: String },

  /// A subscriber failed to handle the message.
  #[error("delivery on channel '{channel}' failed: {source}")]
  Delivery {
    channel: String,
    #[source]
    source: HandlerError,
  },

  /// No reply arrived within the configured timeout.
  #[error("no reply on '{channel}' within {timeout_ms}ms")]
  ReplyTimeout { channel: String, timeout_ms: u128 },

  /// The reply channel was dropped before a reply was sent.
  #[error("request on '{channel}' was dropped without a reply")]
  NoReply { channel: String },

  /// A reply had nowhere to go.
  #[error("message '{message_id}' has no reply channel and no output channel is configured")]
  MissingReplyChannel { message_id: String },
}
