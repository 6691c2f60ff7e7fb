use std::fmt;

use parley_config::ConfigError;
use parley_engine::EngineError;
use parley_mapping::MappingError;
use parley_message::ChannelError;
use thiserror::Error;

/// Broad failure categories, for callers that only need to branch on the
/// kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  /// Missing or invalid wiring. Fatal at startup.
  Configuration,
  InvalidArgument,
  InvalidState,
  /// A reply named an execution that is not waiting.
  NotFound,
  /// Writing variables to, or waking, the execution failed.
  SignalFailure,
  /// The request or reply could not be moved over a channel.
  Transport,
  /// A reply could not be matched to exactly one suspension.
  Correlation,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Configuration => "configuration",
      Self::InvalidArgument => "invalid_argument",
      Self::InvalidState => "invalid_state",
      Self::NotFound => "not_found",
      Self::SignalFailure => "signal_failure",
      Self::Transport => "transport",
      Self::Correlation => "correlation",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("gateway configuration error: {message}")]
  Configuration { message: String },

  #[error(transparent)]
  Mapping(#[from] MappingError),

  #[error("failed to encode request payload: {0}")]
  Payload(#[from] serde_json::Error),

  #[error("execution '{execution_id}' is not waiting")]
  NotFound { execution_id: String },

  #[error("failed to signal execution '{execution_id}': {source}")]
  SignalFailure {
    execution_id: String,
    #[source]
    source: EngineError,
  },

  #[error(transparent)]
  Channel(#[from] ChannelError),

  #[error("no reply for execution '{execution_id}' within {timeout_ms}ms")]
  ReplyTimeout {
    execution_id: String,
    timeout_ms: u128,
  },

  #[error("reply for execution '{received}' does not belong to execution '{expected}'")]
  CorrelationMismatch { expected: String, received: String },

  #[error("a reply for execution '{execution_id}' is already being applied")]
  DuplicateReply { execution_id: String },

  #[error("reply message '{message_id}' has no execution id header")]
  MissingExecutionId { message_id: String },
}

impl GatewayError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Configuration { .. } => ErrorKind::Configuration,
      Self::Mapping(MappingError::InvalidArgument { .. }) => ErrorKind::InvalidArgument,
      Self::Mapping(MappingError::InvalidState { .. }) | Self::Payload(_) => ErrorKind::InvalidState,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::SignalFailure { .. } => ErrorKind::SignalFailure,
      Self::Channel(_) | Self::ReplyTimeout { .. } => ErrorKind::Transport,
      Self::CorrelationMismatch { .. }
      | Self::DuplicateReply { .. }
      | Self::MissingExecutionId { .. } => ErrorKind::Correlation,
    }
  }

  pub(crate) fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration {
      message: message.into(),
    }
  }

  /// Classify an engine failure raised while resuming `execution_id`.
  pub(crate) fn from_engine(execution_id: &str, source: EngineError) -> Self {
    match source {
      EngineError::ExecutionNotFound { execution_id } => Self::NotFound { execution_id },
      source => Self::SignalFailure {
        execution_id: execution_id.to_string(),
        source,
      },
    }
  }
}

impl From<ConfigError> for GatewayError {
  fn from(err: ConfigError) -> Self {
    Self::configuration(err.to_string())
  }
}
