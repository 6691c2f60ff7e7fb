use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::channel::{MessageChannel, PollableChannel};
use crate::error::ChannelError;
use crate::message::Message;

/// A buffered, pollable channel.
///
/// Sends never block. Each message is received by exactly one consumer.
pub struct QueueChannel {
  name: String,
  sender: mpsc::UnboundedSender<Message>,
  receiver: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl QueueChannel {
  pub fn new(name: impl Into<String>) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      name: name.into(),
      sender,
      receiver: Mutex::new(receiver),
    }
  }
}

#[async_trait]
impl MessageChannel for QueueChannel {
  fn name(&self) -> &str {
    &self.name
  }

  async fn send(&self, message: Message) -> Result<(), ChannelError> {
    self
      .sender
      .send(message)
      .map_err(|_| ChannelError::Closed {
        channel: self.name.clone(),
      })
  }

  fn into_pollable(self: Arc<Self>) -> Option<Arc<dyn PollableChannel>> {
    Some(self)
  }
}

#[async_trait]
impl PollableChannel for QueueChannel {
  async fn receive(&self, timeout: Duration) -> Option<Message> {
    let mut receiver = self.receiver.lock().await;
    tokio::time::timeout(timeout, receiver.recv())
      .await
      .ok()
      .flatten()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::message::MessageBuilder;
  use serde_json::json;

  #[tokio::test]
  async fn test_receive_in_send_order() {
    let channel = QueueChannel::new("orders");

    for n in 0..3 {
      channel
        .send(MessageBuilder::with_payload(json!(n)).build())
        .await
        .unwrap();
    }

    for n in 0..3 {
      let message = channel.receive(Duration::from_millis(10)).await.unwrap();
      assert_eq!(message.payload(), &json!(n));
    }
  }

  #[tokio::test]
  async fn test_receive_times_out_when_empty() {
    let channel = QueueChannel::new("empty");
    assert!(channel.receive(Duration::from_millis(5)).await.is_none());
  }

  #[tokio::test]
  async fn test_is_pollable_not_subscribable() {
    let channel: Arc<dyn MessageChannel> = Arc::new(QueueChannel::new("q"));
    assert!(channel.clone().into_pollable().is_some());
    assert!(channel.into_subscribable().is_none());
  }
}
