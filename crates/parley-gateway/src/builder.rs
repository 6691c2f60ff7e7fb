use std::sync::Arc;
use std::time::Duration;

use parley_config::GatewayDef;
use parley_engine::ProcessEngine;
use parley_mapping::{DefaultProcessVariableHeaderMapper, HeaderMappingRules, ProcessVariableHeaderMapper};
use parley_message::{MessageChannel, MessagingTemplate};
use tokio_util::sync::CancellationToken;

use crate::contributor::HeaderContributor;
use crate::error::GatewayError;
use crate::gateway::MessagingGateway;
use crate::shared::{GatewayCore, GatewaySettings};
use crate::state::CycleTable;
use crate::strategy::DispatchStrategy;

/// Wires a [`MessagingGateway`].
///
/// The engine, request channel and reply channel are required. Without an
/// explicit mapper a [`DefaultProcessVariableHeaderMapper`] is built from
/// the mapping rules.
#[derive(Default)]
pub struct GatewayBuilder {
  engine: Option<Arc<dyn ProcessEngine>>,
  request_channel: Option<Arc<dyn MessageChannel>>,
  reply_channel: Option<Arc<dyn MessageChannel>>,
  error_channel: Option<Arc<dyn MessageChannel>>,
  mapper: Option<Arc<dyn ProcessVariableHeaderMapper>>,
  rules: HeaderMappingRules,
  contributor: Option<Arc<dyn HeaderContributor>>,
  settings: GatewaySettings,
  cancel: Option<CancellationToken>,
}

impl GatewayBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from a gateway definition, resolving channel names with
  /// `channels`.
  pub fn from_def<F>(def: &GatewayDef, channels: F) -> Result<Self, GatewayError>
  where
    F: Fn(&str) -> Option<Arc<dyn MessageChannel>>,
  {
    def.validate()?;

    let lookup = |name: &str| {
      channels(name).ok_or_else(|| GatewayError::configuration(format!("unknown channel '{name}'")))
    };

    let mut builder = Self::new()
      .request_channel(lookup(&def.request_channel)?)
      .reply_channel(lookup(&def.reply_channel)?)
      .mapping_rules(HeaderMappingRules::from(def.header_mapping.clone()))
      .forward_variables_as_headers(def.forward_variables_as_headers)
      .update_variables_from_reply(def.update_variables_from_reply)
      .poll_timeout(Duration::from_millis(def.poll_timeout_ms));
    if let Some(name) = &def.error_channel {
      builder = builder.error_channel(lookup(name)?);
    }
    if let Some(ms) = def.reply_timeout_ms {
      builder = builder.reply_timeout(Duration::from_millis(ms));
    }
    Ok(builder)
  }

  pub fn engine(mut self, engine: Arc<dyn ProcessEngine>) -> Self {
    self.engine = Some(engine);
    self
  }

  pub fn request_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
    self.request_channel = Some(channel);
    self
  }

  pub fn reply_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
    self.reply_channel = Some(channel);
    self
  }

  /// Channel that receives replies the asynchronous consumer failed to apply.
  pub fn error_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
    self.error_channel = Some(channel);
    self
  }

  /// Replaces the default mapper. Mapping rules are ignored when set.
  pub fn mapper(mut self, mapper: Arc<dyn ProcessVariableHeaderMapper>) -> Self {
    self.mapper = Some(mapper);
    self
  }

  pub fn mapping_rules(mut self, rules: HeaderMappingRules) -> Self {
    self.rules = rules;
    self
  }

  pub fn header_contributor(mut self, contributor: Arc<dyn HeaderContributor>) -> Self {
    self.contributor = Some(contributor);
    self
  }

  pub fn forward_variables_as_headers(mut self, forward: bool) -> Self {
    self.settings.forward_variables_as_headers = forward;
    self
  }

  pub fn update_variables_from_reply(mut self, update: bool) -> Self {
    self.settings.update_variables_from_reply = update;
    self
  }

  pub fn reply_timeout(mut self, timeout: Duration) -> Self {
    self.settings.reply_timeout = Some(timeout);
    self
  }

  pub fn poll_timeout(mut self, timeout: Duration) -> Self {
    self.settings.poll_timeout = timeout;
    self
  }

  /// How many resumed cycles to remember for rejecting late replies.
  pub fn resumed_history(mut self, history: usize) -> Self {
    self.settings.resumed_history = history;
    self
  }

  /// Parent token for background work. The gateway cancels a child of it
  /// on shutdown.
  pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
    self.cancel = Some(cancel);
    self
  }

  /// Validate the wiring and initialise the strategy.
  pub fn build<S: DispatchStrategy>(self) -> Result<MessagingGateway<S>, GatewayError> {
    let engine = self
      .engine
      .ok_or_else(|| GatewayError::configuration("process engine is required"))?;
    let request_channel = self
      .request_channel
      .ok_or_else(|| GatewayError::configuration("request channel is required"))?;
    let reply_channel = self
      .reply_channel
      .ok_or_else(|| GatewayError::configuration("reply channel is required"))?;
    if self.settings.poll_timeout.is_zero() {
      return Err(GatewayError::configuration("poll timeout must be greater than zero"));
    }

    let mapper = match self.mapper {
      Some(mapper) => mapper,
      None => Arc::new(DefaultProcessVariableHeaderMapper::new(self.rules)?),
    };
    let cancel = self
      .cancel
      .map(|parent| parent.child_token())
      .unwrap_or_default();

    let cycles = CycleTable::new(self.settings.resumed_history);
    let core = GatewayCore {
      engine,
      request_channel,
      reply_channel,
      error_channel: self.error_channel,
      mapper,
      contributor: self.contributor,
      template: MessagingTemplate::new(),
      settings: self.settings,
      cycles,
    };
    MessagingGateway::init(core, cancel)
  }
}
