//! Send and send-and-receive helpers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

use crate::channel::MessageChannel;
use crate::error::ChannelError;
use crate::message::Message;

/// Sends messages, optionally waiting for a single reply.
#[derive(Debug, Clone, Default)]
pub struct MessagingTemplate;

impl MessagingTemplate {
  pub fn new() -> Self {
    Self
  }

  pub async fn send(
    &self,
    channel: &dyn MessageChannel,
    message: Message,
  ) -> Result<(), ChannelError> {
    debug!(
      channel = %channel.name(),
      message_id = %message.id(),
      "sending message"
    );
    channel.send(message).await
  }

  /// Send `message` and wait for the reply.
  ///
  /// The message is re-addressed to a temporary reply channel that accepts
  /// exactly one reply. Any reply channel already set on the message is
  /// replaced. With `timeout` unset the wait is unbounded.
  pub async fn send_and_receive(
    &self,
    channel: &dyn MessageChannel,
    message: Message,
    timeout: Option<Duration>,
  ) -> Result<Message, ChannelError> {
    let (sender, receiver) = oneshot::channel();
    let reply_slot = Arc::new(ReplySlot {
      name: format!("{}.reply.{}", channel.name(), message.id()),
      sender: Mutex::new(Some(sender)),
    });

    let message = message.with_reply_channel(reply_slot);
    self.send(channel, message).await?;

    let reply = match timeout {
      Some(timeout) => tokio::time::timeout(timeout, receiver)
        .await
        .map_err(|_| ChannelError::ReplyTimeout {
          channel: channel.name().to_string(),
          timeout_ms: timeout.as_millis(),
        })?,
      None => receiver.await,
    };

    reply.map_err(|_| ChannelError::NoReply {
      channel: channel.name().to_string(),
    })
  }
}

/// Temporary reply channel for a single exchange.
struct ReplySlot {
  name: String,
  sender: Mutex<Option<oneshot::Sender<Message>>>,
}

#[async_trait]
impl MessageChannel for ReplySlot {
  fn name(&self) -> &str {
    &self.name
  }

  async fn send(&self, message: Message) -> Result<(), ChannelError> {
    let sender = self
      .sender
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();

    // A second reply, or a reply after the requester gave up, has nowhere to go.
    let closed = || ChannelError::Closed {
      channel: self.name.clone(),
    };
    sender.ok_or_else(closed)?.send(message).map_err(|_| closed())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::channel::PollableChannel;
  use crate::message::MessageBuilder;
  use crate::queue::QueueChannel;
  use serde_json::json;

  #[tokio::test]
  async fn test_send_and_receive_gets_reply() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let service_requests = requests.clone();

    tokio::spawn(async move {
      let request = service_requests
        .receive(Duration::from_secs(1))
        .await
        .unwrap();
      let reply = MessageBuilder::from_message(&request)
        .header("handled", true)
        .build();
      request.reply_channel().unwrap().send(reply).await.unwrap();
    });

    let reply = MessagingTemplate::new()
      .send_and_receive(
        requests.as_ref(),
        MessageBuilder::with_payload(json!("ping")).build(),
        Some(Duration::from_secs(1)),
      )
      .await
      .unwrap();

    assert_eq!(reply.payload(), &json!("ping"));
    assert_eq!(reply.header("handled"), Some(&json!(true)));
  }

  #[tokio::test]
  async fn test_send_and_receive_times_out() {
    let requests = QueueChannel::new("requests");

    let err = MessagingTemplate::new()
      .send_and_receive(
        &requests,
        MessageBuilder::with_payload(json!("ping")).build(),
        Some(Duration::from_millis(10)),
      )
      .await
      .unwrap_err();

    assert!(matches!(err, ChannelError::ReplyTimeout { .. }));
  }

  #[tokio::test]
  async fn test_dropped_request_reports_no_reply() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let service_requests = requests.clone();

    tokio::spawn(async move {
      // Consume and drop the request without replying.
      let _ = service_requests.receive(Duration::from_secs(1)).await;
    });

    let err = MessagingTemplate::new()
      .send_and_receive(
        requests.as_ref(),
        MessageBuilder::with_payload(json!("ping")).build(),
        None,
      )
      .await
      .unwrap_err();

    assert!(matches!(err, ChannelError::NoReply { .. }));
  }

  #[tokio::test]
  async fn test_second_reply_is_rejected() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let service_requests = requests.clone();

    let service = tokio::spawn(async move {
      let request = service_requests
        .receive(Duration::from_secs(1))
        .await
        .unwrap();
      let reply_channel = request.reply_channel().unwrap().clone();
      reply_channel
        .send(MessageBuilder::from_message(&request).build())
        .await
        .unwrap();
      reply_channel
        .send(MessageBuilder::from_message(&request).build())
        .await
    });

    MessagingTemplate::new()
      .send_and_receive(
        requests.as_ref(),
        MessageBuilder::with_payload(json!("ping")).build(),
        Some(Duration::from_secs(1)),
      )
      .await
      .unwrap();

    let second = service.await.unwrap();
    assert!(matches!(second, Err(ChannelError::Closed { .. })));
  }
}
