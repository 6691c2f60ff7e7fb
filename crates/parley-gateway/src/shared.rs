use std::sync::Arc;
use std::time::Duration;

use parley_config::DEFAULT_POLL_TIMEOUT_MS;
use parley_engine::{Execution, ProcessEngine};
use parley_mapping::{CorrelationIdentity, ProcessVariableHeaderMapper, correlation};
use parley_message::{Message, MessageBuilder, MessageChannel, MessagingTemplate};
use tracing::{Span, error, field, info, instrument, warn};

use crate::callback::{EngineSignalCallback, signal_execution};
use crate::contributor::HeaderContributor;
use crate::error::GatewayError;
use crate::state::{CycleTable, GatewayState};

/// Resumed cycles remembered per gateway by default.
pub const DEFAULT_RESUMED_HISTORY: usize = 1024;

/// Behaviour switches shared by both dispatch strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
  /// Map process variables onto request headers. When off, requests carry
  /// only the correlation headers and contributed headers.
  pub forward_variables_as_headers: bool,
  /// Write accepted reply headers back as process variables.
  pub update_variables_from_reply: bool,
  /// Bound on the synchronous wait for a reply. `None` waits forever.
  pub reply_timeout: Option<Duration>,
  /// Receive timeout per poll of a pollable reply channel.
  pub poll_timeout: Duration,
  /// How many resumed cycles to remember for rejecting late replies.
  /// Older late replies are still rejected by the engine lookup.
  pub resumed_history: usize,
}

impl Default for GatewaySettings {
  fn default() -> Self {
    Self {
      forward_variables_as_headers: true,
      update_variables_from_reply: true,
      reply_timeout: None,
      poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
      resumed_history: DEFAULT_RESUMED_HISTORY,
    }
  }
}

/// Wiring and cycle state shared by a gateway and its reply consumer.
pub struct GatewayCore {
  pub(crate) engine: Arc<dyn ProcessEngine>,
  pub(crate) request_channel: Arc<dyn MessageChannel>,
  pub(crate) reply_channel: Arc<dyn MessageChannel>,
  pub(crate) error_channel: Option<Arc<dyn MessageChannel>>,
  pub(crate) mapper: Arc<dyn ProcessVariableHeaderMapper>,
  pub(crate) contributor: Option<Arc<dyn HeaderContributor>>,
  pub(crate) template: MessagingTemplate,
  pub(crate) settings: GatewaySettings,
  pub(crate) cycles: CycleTable,
}

impl GatewayCore {
  pub fn engine(&self) -> &Arc<dyn ProcessEngine> {
    &self.engine
  }

  pub fn request_channel(&self) -> &Arc<dyn MessageChannel> {
    &self.request_channel
  }

  pub fn reply_channel(&self) -> &Arc<dyn MessageChannel> {
    &self.reply_channel
  }

  pub fn settings(&self) -> &GatewaySettings {
    &self.settings
  }

  pub fn state(&self, execution_id: &str) -> GatewayState {
    self.cycles.get(execution_id)
  }

  /// Build the request for `execution`.
  ///
  /// The payload is the execution's identifiers. Mapped headers (including
  /// the correlation headers) override contributed ones.
  pub(crate) fn build_request(&self, execution: &Execution) -> Result<Message, GatewayError> {
    let identity = CorrelationIdentity::of(execution);
    let headers = if self.settings.forward_variables_as_headers {
      self.mapper.to_headers(&identity, execution.variables())?
    } else {
      identity.to_headers()
    };
    let contributed = self
      .contributor
      .as_ref()
      .map(|c| c.contribute(execution))
      .unwrap_or_default();

    Ok(
      MessageBuilder::with_payload(serde_json::to_value(execution.to_ref())?)
        .copy_headers_if_absent(contributed)
        .copy_headers(headers)
        .build(),
    )
  }

  /// Resume the execution a reply belongs to.
  ///
  /// Returns the variables written from the reply.
  #[instrument(
    name = "gateway_reply",
    skip(self, reply),
    fields(message_id = %reply.id(), execution_id = field::Empty)
  )]
  pub(crate) async fn resume(&self, reply: &Message) -> Result<Vec<String>, GatewayError> {
    let execution_id = correlation::execution_id(reply.headers())
      .ok_or_else(|| GatewayError::MissingExecutionId {
        message_id: reply.id().to_string(),
      })?
      .to_string();
    Span::current().record("execution_id", execution_id.as_str());
    info!(execution_id = %execution_id, "reply_received");

    let previous = self.cycles.claim(&execution_id)?;
    let mut execution = match self.find_waiting(&execution_id).await {
      Ok(execution) => execution,
      Err(err) => {
        self.cycles.release(&execution_id, previous);
        return Err(err);
      }
    };

    let result = signal_execution(
      self.engine.as_ref(),
      &mut execution,
      &EngineSignalCallback,
      self.mapper.as_ref(),
      reply,
      self.settings.update_variables_from_reply,
    )
    .await;

    match result {
      Ok(applied) => {
        self.cycles.finish(&execution_id);
        info!(
          execution_id = %execution_id,
          applied = applied.len(),
          "execution_resumed"
        );
        Ok(applied)
      }
      Err(err @ GatewayError::NotFound { .. }) => {
        // The execution was waiting at lookup and left while the reply was
        // being applied, so its cycle is over.
        self.cycles.finish(&execution_id);
        warn!(execution_id = %execution_id, "execution_left_during_reply");
        Err(err)
      }
      Err(err) => {
        self.cycles.release(&execution_id, previous);
        Err(err)
      }
    }
  }

  async fn find_waiting(&self, execution_id: &str) -> Result<Execution, GatewayError> {
    self
      .engine
      .find_execution(execution_id)
      .await
      .map_err(|e| GatewayError::from_engine(execution_id, e))?
      .ok_or_else(|| GatewayError::NotFound {
        execution_id: execution_id.to_string(),
      })
  }

  /// Log a failed reply and dead-letter it when an error channel is set.
  pub(crate) async fn reply_failed(&self, reply: &Message, err: &GatewayError) {
    error!(
      message_id = %reply.id(),
      kind = %err.kind(),
      error = %err,
      "reply_failed"
    );

    let Some(channel) = &self.error_channel else {
      return;
    };
    let report = MessageBuilder::with_payload(serde_json::json!({
      "error": err.to_string(),
      "kind": err.kind().as_str(),
      "message_id": reply.id(),
      "payload": reply.payload(),
    }))
    .copy_headers(reply.headers().clone())
    .build();

    if let Err(e) = self.template.send(channel.as_ref(), report).await {
      error!(
        channel = %channel.name(),
        error = %e,
        "error_channel_send_failed"
      );
    }
  }
}
