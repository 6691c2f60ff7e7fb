use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
  /// The mapper was configured or called with a malformed argument.
  #[error("invalid argument: {message}")]
  InvalidArgument { message: String },

  /// A header or variable name was unusable when evaluated.
  #[error("invalid state: {message}")]
  InvalidState { message: String },
}

impl MappingError {
  pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
    Self::InvalidArgument {
      message: message.into(),
    }
  }

  pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
    Self::InvalidState {
      message: message.into(),
    }
  }
}
