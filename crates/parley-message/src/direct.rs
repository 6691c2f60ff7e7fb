use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::channel::{MessageChannel, MessageHandler, SubscribableChannel};
use crate::error::ChannelError;
use crate::message::Message;

/// A push-based channel.
///
/// `send` invokes one subscribed handler on the sender's task, rotating
/// round-robin between subscribers. Handler failures surface to the sender.
pub struct DirectChannel {
  name: String,
  handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,
  next: AtomicUsize,
}

impl DirectChannel {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      handlers: RwLock::new(Vec::new()),
      next: AtomicUsize::new(0),
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self
      .handlers
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  fn next_handler(&self) -> Option<Arc<dyn MessageHandler>> {
    let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
    if handlers.is_empty() {
      return None;
    }
    let index = self.next.fetch_add(1, Ordering::Relaxed) % handlers.len();
    Some(handlers[index].clone())
  }
}

#[async_trait]
impl MessageChannel for DirectChannel {
  fn name(&self) -> &str {
    &self.name
  }

  async fn send(&self, message: Message) -> Result<(), ChannelError> {
    let handler = self.next_handler().ok_or_else(|| ChannelError::NoSubscribers {
      channel: self.name.clone(),
    })?;

    handler
      .handle_message(message)
      .await
      .map_err(|source| ChannelError::Delivery {
        channel: self.name.clone(),
        source,
      })
  }

  fn into_subscribable(self: Arc<Self>) -> Option<Arc<dyn SubscribableChannel>> {
    Some(self)
  }
}

impl SubscribableChannel for DirectChannel {
  fn subscribe(&self, handler: Arc<dyn MessageHandler>) {
    self
      .handlers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .push(handler);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::channel::HandlerError;
  use crate::message::MessageBuilder;
  use serde_json::json;
  use tokio::sync::Mutex;

  #[derive(Default)]
  struct Recorder {
    seen: Mutex<Vec<serde_json::Value>>,
  }

  #[async_trait]
  impl MessageHandler for Recorder {
    async fn handle_message(&self, message: Message) -> Result<(), HandlerError> {
      self.seen.lock().await.push(message.payload().clone());
      Ok(())
    }
  }

  struct Failing;

  #[async_trait]
  impl MessageHandler for Failing {
    async fn handle_message(&self, _message: Message) -> Result<(), HandlerError> {
      Err("boom".into())
    }
  }

  #[tokio::test]
  async fn test_send_without_subscribers_fails() {
    let channel = DirectChannel::new("direct");
    let err = channel
      .send(MessageBuilder::with_payload(json!(1)).build())
      .await
      .unwrap_err();

    assert!(matches!(err, ChannelError::NoSubscribers { .. }));
  }

  #[tokio::test]
  async fn test_round_robin_between_subscribers() {
    let channel = DirectChannel::new("direct");
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    channel.subscribe(first.clone());
    channel.subscribe(second.clone());

    for n in 0..4 {
      channel
        .send(MessageBuilder::with_payload(json!(n)).build())
        .await
        .unwrap();
    }

    assert_eq!(*first.seen.lock().await, vec![json!(0), json!(2)]);
    assert_eq!(*second.seen.lock().await, vec![json!(1), json!(3)]);
  }

  #[tokio::test]
  async fn test_handler_failure_surfaces_to_sender() {
    let channel = DirectChannel::new("direct");
    channel.subscribe(Arc::new(Failing));

    let err = channel
      .send(MessageBuilder::with_payload(json!(1)).build())
      .await
      .unwrap_err();

    assert!(matches!(err, ChannelError::Delivery { .. }));
    assert!(err.to_string().contains("boom"));
  }
}
