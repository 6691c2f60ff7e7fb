//! Fire-and-park dispatch with a long-lived reply consumer.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use parley_engine::{ActivityOutcome, Execution};
use parley_message::{HandlerError, Message, MessageHandler, PollableChannel};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::GatewayError;
use crate::shared::GatewayCore;
use crate::strategy::DispatchStrategy;

/// Send the request with the gateway's reply channel as return address and
/// park the execution.
///
/// A consumer started at init resumes executions as replies arrive. Pushed
/// replies are forwarded to the consumer task rather than applied on the
/// sender's task, because the sender may be running inside the `execute`
/// call that parked the execution.
pub struct Asynchronous {
  consumer: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl DispatchStrategy for Asynchronous {
  fn on_init(core: &Arc<GatewayCore>, cancel: &CancellationToken) -> Result<Self, GatewayError> {
    let runtime = Handle::try_current().map_err(|_| {
      GatewayError::configuration("an asynchronous gateway must be built inside a Tokio runtime")
    })?;

    let reply_channel = core.reply_channel.clone();
    let channel_name = reply_channel.name().to_string();

    let task = if let Some(subscribable) = reply_channel.clone().into_subscribable() {
      let (sender, receiver) = mpsc::unbounded_channel();
      subscribable.subscribe(Arc::new(ReplyForwarder { sender }));
      runtime.spawn(consume_pushed(core.clone(), receiver, cancel.clone()))
    } else if let Some(pollable) = reply_channel.into_pollable() {
      let poll_timeout = core.settings.poll_timeout;
      runtime.spawn(consume_polled(
        core.clone(),
        pollable,
        poll_timeout,
        cancel.clone(),
      ))
    } else {
      return Err(GatewayError::configuration(format!(
        "reply channel '{channel_name}' is neither pollable nor subscribable"
      )));
    };

    info!(channel = %channel_name, "reply_consumer_started");
    Ok(Self {
      consumer: Mutex::new(Some(task)),
    })
  }

  async fn on_execute(
    &self,
    core: &GatewayCore,
    execution: &mut Execution,
    request: Message,
  ) -> Result<ActivityOutcome, GatewayError> {
    let message_id = request.id().to_string();
    let request = request.with_reply_channel(core.reply_channel.clone());
    core
      .template
      .send(core.request_channel.as_ref(), request)
      .await?;

    info!(
      execution_id = %execution.id(),
      channel = %core.request_channel.name(),
      message_id = %message_id,
      "gateway_dispatched"
    );
    Ok(ActivityOutcome::Wait)
  }

  async fn on_shutdown(&self) {
    let task = self
      .consumer
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(task) = task {
      if let Err(e) = task.await {
        error!(error = %e, "reply_consumer_join_failed");
      }
    }
  }
}

/// Hands pushed replies to the consumer task.
struct ReplyForwarder {
  sender: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl MessageHandler for ReplyForwarder {
  async fn handle_message(&self, message: Message) -> Result<(), HandlerError> {
    self
      .sender
      .send(message)
      .map_err(|_| HandlerError::from("reply consumer has stopped"))
  }
}

async fn consume_pushed(
  core: Arc<GatewayCore>,
  mut replies: mpsc::UnboundedReceiver<Message>,
  cancel: CancellationToken,
) {
  loop {
    tokio::select! {
        _ = cancel.cancelled() => {
            info!(channel = %core.reply_channel.name(), "reply_consumer_stopped");
            break;
        }
        reply = replies.recv() => {
            match reply {
                Some(reply) => consume(&core, reply).await,
                None => break,
            }
        }
    }
  }
}

async fn consume_polled(
  core: Arc<GatewayCore>,
  channel: Arc<dyn PollableChannel>,
  poll_timeout: Duration,
  cancel: CancellationToken,
) {
  loop {
    tokio::select! {
        _ = cancel.cancelled() => {
            info!(channel = %channel.name(), "reply_consumer_stopped");
            break;
        }
        reply = channel.receive(poll_timeout) => {
            if let Some(reply) = reply {
                consume(&core, reply).await;
            }
        }
    }
  }
}

async fn consume(core: &GatewayCore, reply: Message) {
  if let Err(err) = core.resume(&reply).await {
    core.reply_failed(&reply, &err).await;
  }
}
