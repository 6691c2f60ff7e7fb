use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse gateway definition: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid gateway definition: {message}")]
  Invalid { message: String },
}

impl ConfigError {
  pub(crate) fn invalid(message: impl Into<String>) -> Self {
    Self::Invalid {
      message: message.into(),
    }
  }
}
