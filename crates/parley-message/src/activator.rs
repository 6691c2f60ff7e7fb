//! Service activator endpoint.
//!
//! The `ServiceActivator` drains a pollable request channel, hands each
//! request to a handler and routes the handler's result to the request's
//! reply channel (or a configured output channel).

use std::sync::Arc;
use std::time::Duration;

use parley_config::DEFAULT_POLL_TIMEOUT_MS;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::channel::{HandlerError, MessageChannel, PollableChannel};
use crate::error::ChannelError;
use crate::message::Message;

type ServiceFn = dyn Fn(Message) -> Result<Message, HandlerError> + Send + Sync;

/// A request/reply endpoint on the far side of a request channel.
///
/// # Usage
///
/// ```ignore
/// let activator = ServiceActivator::new(requests, |request| {
///   Ok(MessageBuilder::from_message(&request).header("status", "done").build())
/// });
///
/// let cancel = CancellationToken::new();
/// let handle = activator.spawn(cancel.clone());
/// ```
pub struct ServiceActivator {
  input: Arc<dyn PollableChannel>,
  output: Option<Arc<dyn MessageChannel>>,
  handler: Arc<ServiceFn>,
  poll_timeout: Duration,
}

impl ServiceActivator {
  pub fn new<F>(input: Arc<dyn PollableChannel>, handler: F) -> Self
  where
    F: Fn(Message) -> Result<Message, HandlerError> + Send + Sync + 'static,
  {
    Self {
      input,
      output: None,
      handler: Arc::new(handler),
      poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
    }
  }

  /// Channel used for results whose request carries no reply channel.
  pub fn with_output_channel(mut self, output: Arc<dyn MessageChannel>) -> Self {
    self.output = Some(output);
    self
  }

  pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
    self.poll_timeout = poll_timeout;
    self
  }

  pub fn poll_timeout(&self) -> Duration {
    self.poll_timeout
  }

  /// Handle one request and route its result.
  pub async fn handle(&self, request: Message) -> Result<(), ChannelError> {
    let target = request
      .reply_channel()
      .cloned()
      .or_else(|| self.output.clone())
      .ok_or_else(|| ChannelError::MissingReplyChannel {
        message_id: request.id().to_string(),
      })?;

    let request_id = request.id().to_string();
    let reply = (self.handler)(request).map_err(|source| ChannelError::Delivery {
      channel: self.input.name().to_string(),
      source,
    })?;

    debug!(
      request_id = %request_id,
      reply_id = %reply.id(),
      target = %target.name(),
      "routing service reply"
    );

    target.send(reply).await
  }

  /// Run the polling loop until cancelled.
  pub async fn start(self, cancel: CancellationToken) {
    info!(channel = %self.input.name(), "starting service activator");

    loop {
      tokio::select! {
          _ = cancel.cancelled() => {
              info!(channel = %self.input.name(), "service activator cancelled");
              break;
          }
          request = self.input.receive(self.poll_timeout) => {
              if let Some(request) = request {
                  if let Err(e) = self.handle(request).await {
                      error!(
                          channel = %self.input.name(),
                          error = %e,
                          "service activator failed to handle request"
                      );
                  }
              }
          }
      }
    }
  }

  /// Spawn the polling loop on the current runtime.
  pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(self.start(cancel))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::message::MessageBuilder;
  use crate::queue::QueueChannel;
  use crate::template::MessagingTemplate;
  use serde_json::json;

  fn echo(request: Message) -> Result<Message, HandlerError> {
    Ok(
      MessageBuilder::from_message(&request)
        .header("echoed", true)
        .build(),
    )
  }

  #[tokio::test]
  async fn test_routes_to_reply_channel() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let cancel = CancellationToken::new();
    let handle = ServiceActivator::new(requests.clone(), echo).spawn(cancel.clone());

    let reply = MessagingTemplate::new()
      .send_and_receive(
        requests.as_ref(),
        MessageBuilder::with_payload(json!("hi")).build(),
        Some(Duration::from_secs(1)),
      )
      .await
      .unwrap();

    assert_eq!(reply.header("echoed"), Some(&json!(true)));

    cancel.cancel();
    handle.await.unwrap();
  }

  #[tokio::test]
  async fn test_falls_back_to_output_channel() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let output = Arc::new(QueueChannel::new("output"));
    let activator = ServiceActivator::new(requests, echo).with_output_channel(output.clone());

    activator
      .handle(MessageBuilder::with_payload(json!(7)).build())
      .await
      .unwrap();

    let routed = output.receive(Duration::from_millis(10)).await.unwrap();
    assert_eq!(routed.payload(), &json!(7));
  }

  #[test]
  fn test_poll_timeout_matches_gateway_default() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let activator = ServiceActivator::new(requests.clone(), echo);
    assert_eq!(
      activator.poll_timeout(),
      Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS)
    );

    let activator = ServiceActivator::new(requests, echo).with_poll_timeout(Duration::from_secs(1));
    assert_eq!(activator.poll_timeout(), Duration::from_secs(1));
  }

  #[tokio::test]
  async fn test_missing_reply_target() {
    let requests = Arc::new(QueueChannel::new("requests"));
    let activator = ServiceActivator::new(requests, echo);

    let err = activator
      .handle(MessageBuilder::with_payload(json!(7)).build())
      .await
      .unwrap_err();

    assert!(matches!(err, ChannelError::MissingReplyChannel { .. }));
  }
}
