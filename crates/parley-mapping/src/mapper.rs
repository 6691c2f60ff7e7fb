use parley_config::MappingDef;
use parley_engine::Variables;
use parley_message::Headers;
use tracing::debug;

use crate::correlation::{self, CorrelationIdentity};
use crate::error::MappingError;
use crate::pattern::matches_any;

/// Translates process variables into outbound headers and reply headers
/// back into process variables.
pub trait ProcessVariableHeaderMapper: Send + Sync {
  /// Headers for a message leaving `identity`'s execution.
  ///
  /// The correlation headers are always present in the result.
  fn to_headers(
    &self,
    identity: &CorrelationIdentity,
    variables: &Variables,
  ) -> Result<Headers, MappingError>;

  /// Copy the accepted subset of `headers` into `target`.
  ///
  /// On error `target` is left untouched.
  fn from_headers(&self, headers: &Headers, target: &mut Variables) -> Result<(), MappingError>;
}

/// Filter rules for [`DefaultProcessVariableHeaderMapper`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMappingRules {
  header_to_variable_names: Vec<String>,
  variable_to_header_names: Vec<String>,
  prefix: String,
  include_headers_with_prefix: bool,
  prefix_outbound_variables: bool,
}

impl Default for HeaderMappingRules {
  fn default() -> Self {
    Self::from(MappingDef::default())
  }
}

impl From<MappingDef> for HeaderMappingRules {
  fn from(def: MappingDef) -> Self {
    Self {
      header_to_variable_names: def.header_to_variable_names,
      variable_to_header_names: def.variable_to_header_names,
      prefix: def.prefix,
      include_headers_with_prefix: def.include_headers_with_prefix,
      prefix_outbound_variables: def.prefix_outbound_variables,
    }
  }
}

impl HeaderMappingRules {
  pub fn with_header_to_variable_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.header_to_variable_names = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_variable_to_header_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.variable_to_header_names = names.into_iter().map(Into::into).collect();
    self
  }

  /// An empty prefix disables both prefix matching and outbound prefixing.
  pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.prefix = prefix.into();
    self
  }

  pub fn include_headers_with_prefix(mut self, include: bool) -> Self {
    self.include_headers_with_prefix = include;
    self
  }

  pub fn prefix_outbound_variables(mut self, prefix: bool) -> Self {
    self.prefix_outbound_variables = prefix;
    self
  }

  pub fn header_to_variable_names(&self) -> &[String] {
    &self.header_to_variable_names
  }

  pub fn variable_to_header_names(&self) -> &[String] {
    &self.variable_to_header_names
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  pub fn validate(&self) -> Result<(), MappingError> {
    let lists = [
      ("header_to_variable_names", &self.header_to_variable_names),
      ("variable_to_header_names", &self.variable_to_header_names),
    ];
    for (list, names) in lists {
      if let Some(index) = names.iter().position(|n| n.trim().is_empty()) {
        return Err(MappingError::invalid_argument(format!(
          "{list}[{index}] must not be blank"
        )));
      }
    }
    Ok(())
  }

  fn active_prefix(&self) -> Option<&str> {
    Some(self.prefix.as_str()).filter(|p| !p.is_empty())
  }
}

/// Pattern-driven mapper.
///
/// A reply header becomes a variable when it starts with the prefix (and
/// prefix matching is on), is one of the well-known correlation headers, or
/// matches `header_to_variable_names`. The prefix is stripped from the
/// variable name. A variable becomes a header when it matches
/// `variable_to_header_names`.
#[derive(Debug, Clone, Default)]
pub struct DefaultProcessVariableHeaderMapper {
  rules: HeaderMappingRules,
}

impl DefaultProcessVariableHeaderMapper {
  pub fn new(rules: HeaderMappingRules) -> Result<Self, MappingError> {
    rules.validate()?;
    Ok(Self { rules })
  }

  pub fn rules(&self) -> &HeaderMappingRules {
    &self.rules
  }

  fn should_map_header_to_variable(&self, header: &str) -> bool {
    let prefixed = self.rules.include_headers_with_prefix
      && self
        .rules
        .active_prefix()
        .is_some_and(|prefix| header.starts_with(prefix));
    prefixed
      || correlation::is_well_known(header)
      || matches_any(&self.rules.header_to_variable_names, header)
  }

  fn variable_name_for(&self, header: &str) -> Result<String, MappingError> {
    let name = match self.rules.active_prefix() {
      Some(prefix) => header.strip_prefix(prefix).unwrap_or(header),
      None => header,
    };
    if name.is_empty() {
      return Err(MappingError::invalid_state(format!(
        "header '{header}' maps to an empty variable name"
      )));
    }
    Ok(name.to_string())
  }

  fn header_name_for(&self, variable: &str) -> String {
    match self.rules.active_prefix() {
      Some(prefix) if self.rules.prefix_outbound_variables => format!("{prefix}{variable}"),
      _ => variable.to_string(),
    }
  }
}

impl ProcessVariableHeaderMapper for DefaultProcessVariableHeaderMapper {
  fn to_headers(
    &self,
    identity: &CorrelationIdentity,
    variables: &Variables,
  ) -> Result<Headers, MappingError> {
    let mut headers = Headers::new();
    for (name, value) in variables {
      if name.trim().is_empty() {
        return Err(MappingError::invalid_state("process variable name must not be blank"));
      }
      if matches_any(&self.rules.variable_to_header_names, name) {
        headers.insert(self.header_name_for(name), value.clone());
      }
    }
    identity.encode_into(&mut headers);
    debug!(
      execution_id = %identity.execution_id,
      headers = headers.len(),
      "variables_mapped_to_headers"
    );
    Ok(headers)
  }

  fn from_headers(&self, headers: &Headers, target: &mut Variables) -> Result<(), MappingError> {
    let mut accepted = Variables::new();
    for (header, value) in headers {
      if header.trim().is_empty() {
        return Err(MappingError::invalid_state("header name must not be blank"));
      }
      if self.should_map_header_to_variable(header) {
        accepted.insert(self.variable_name_for(header)?, value.clone());
      }
    }
    debug!(
      headers = headers.len(),
      accepted = accepted.len(),
      "headers_mapped_to_variables"
    );
    target.extend(accepted);
    Ok(())
  }
}
