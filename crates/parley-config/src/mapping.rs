use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefix reserved for correlation headers.
///
/// Reply headers starting with this prefix are accepted as process
/// variables (with the prefix stripped) unless prefix matching is disabled.
pub const DEFAULT_HEADER_PREFIX: &str = "parley_";

/// Header mapping rules for a gateway.
///
/// Pattern entries are exact names or simple globs (`"crm*"`, `"*Id"`,
/// `"*"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDef {
  /// Reply headers accepted as process variables.
  ///
  /// Empty by default: headers can be rich objects while process variables
  /// should stay lightweight, so only well-known and prefixed headers come
  /// back unless names are listed here.
  #[serde(default)]
  pub header_to_variable_names: Vec<String>,

  /// Process variables exposed as outbound headers.
  #[serde(default = "default_variable_to_header_names")]
  pub variable_to_header_names: Vec<String>,

  /// Prefix of the reserved correlation headers.
  #[serde(default = "default_prefix")]
  pub prefix: String,

  /// Accept any reply header that starts with `prefix`.
  #[serde(default = "default_true")]
  pub include_headers_with_prefix: bool,

  /// Emit exported variables as `prefix + name`.
  #[serde(default)]
  pub prefix_outbound_variables: bool,
}

impl Default for MappingDef {
  fn default() -> Self {
    Self {
      header_to_variable_names: Vec::new(),
      variable_to_header_names: default_variable_to_header_names(),
      prefix: default_prefix(),
      include_headers_with_prefix: true,
      prefix_outbound_variables: false,
    }
  }
}

impl MappingDef {
  /// Reject blank pattern entries.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let lists = [
      ("header_to_variable_names", &self.header_to_variable_names),
      ("variable_to_header_names", &self.variable_to_header_names),
    ];

    for (field, patterns) in lists {
      if let Some(index) = patterns.iter().position(|p| p.trim().is_empty()) {
        return Err(ConfigError::invalid(format!(
          "{field}[{index}] must not be blank"
        )));
      }
    }

    Ok(())
  }
}

fn default_variable_to_header_names() -> Vec<String> {
  vec!["*".to_string()]
}

fn default_prefix() -> String {
  DEFAULT_HEADER_PREFIX.to_string()
}

fn default_true() -> bool {
  true
}
