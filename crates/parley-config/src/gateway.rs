use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mapping::MappingDef;

/// Receive timeout used for each poll of a pollable reply channel.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 10;

/// How a gateway waits for its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
  /// Send the request and block the calling task for the reply, then leave
  /// the activity in the same call.
  Synchronous,
  /// Send the request and return; the execution stays parked until a
  /// correlated reply arrives on the reply channel.
  #[default]
  Asynchronous,
}

/// A messaging gateway definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDef {
  #[serde(default)]
  pub mode: GatewayMode,

  /// Channel the outbound request is sent to.
  pub request_channel: String,

  /// Channel replies are consumed from.
  pub reply_channel: String,

  /// Channel that receives replies which could not be correlated or
  /// applied. Failures are only logged when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_channel: Option<String>,

  #[serde(default = "default_true")]
  pub forward_variables_as_headers: bool,

  #[serde(default = "default_true")]
  pub update_variables_from_reply: bool,

  /// Upper bound on the synchronous wait. Unbounded when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reply_timeout_ms: Option<u64>,

  #[serde(default = "default_poll_timeout_ms")]
  pub poll_timeout_ms: u64,

  #[serde(default)]
  pub header_mapping: MappingDef,
}

impl GatewayDef {
  /// Parse and validate a JSON gateway definition.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let def: GatewayDef = serde_json::from_str(json)?;
    def.validate()?;
    Ok(def)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.request_channel.trim().is_empty() {
      return Err(ConfigError::invalid("request_channel must not be blank"));
    }
    if self.reply_channel.trim().is_empty() {
      return Err(ConfigError::invalid("reply_channel must not be blank"));
    }
    if self
      .error_channel
      .as_deref()
      .is_some_and(|name| name.trim().is_empty())
    {
      return Err(ConfigError::invalid("error_channel must not be blank"));
    }
    if self.poll_timeout_ms == 0 {
      return Err(ConfigError::invalid(
        "poll_timeout_ms must be greater than zero",
      ));
    }

    self.header_mapping.validate()
  }
}

fn default_true() -> bool {
  true
}

fn default_poll_timeout_ms() -> u64 {
  DEFAULT_POLL_TIMEOUT_MS
}
