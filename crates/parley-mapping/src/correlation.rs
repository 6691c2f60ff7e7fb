//! Well-known correlation headers.
//!
//! These keys travel with every gateway message. They all start with
//! [`HEADER_PREFIX`], so a reply header mapper strips them down to
//! `executionId`, `activityId` and so on when they are written back as
//! process variables.

use parley_engine::Execution;
use parley_message::Headers;

/// Prefix reserved for correlation headers.
pub const HEADER_PREFIX: &str = parley_config::DEFAULT_HEADER_PREFIX;

/// Id of the execution a message belongs to. Required on every reply.
pub const EXECUTION_ID_HEADER: &str = "parley_executionId";

pub const ACTIVITY_ID_HEADER: &str = "parley_activityId";

pub const PROCESS_INSTANCE_ID_HEADER: &str = "parley_processInstanceId";

pub const PROCESS_DEFINITION_ID_HEADER: &str = "parley_processDefinitionId";

/// Name of the process definition, when the engine knows it.
pub const PROCESS_DEFINITION_NAME_HEADER: &str = "parley_processDefinitionName";

/// Headers always accepted back as process variables.
pub const WELL_KNOWN_HEADERS: [&str; 5] = [
  EXECUTION_ID_HEADER,
  ACTIVITY_ID_HEADER,
  PROCESS_INSTANCE_ID_HEADER,
  PROCESS_DEFINITION_ID_HEADER,
  PROCESS_DEFINITION_NAME_HEADER,
];

pub fn is_well_known(header: &str) -> bool {
  WELL_KNOWN_HEADERS.contains(&header)
}

/// Execution id carried by a set of headers.
pub fn execution_id(headers: &Headers) -> Option<&str> {
  headers.get(EXECUTION_ID_HEADER).and_then(|v| v.as_str())
}

/// The identifiers that tie a message to its originating suspension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationIdentity {
  pub execution_id: String,
  pub activity_id: String,
  pub process_instance_id: String,
  pub process_definition_id: String,
  pub process_definition_name: Option<String>,
}

impl CorrelationIdentity {
  pub fn of(execution: &Execution) -> Self {
    Self {
      execution_id: execution.id().to_string(),
      activity_id: execution.activity_id().to_string(),
      process_instance_id: execution.process_instance_id().to_string(),
      process_definition_id: execution.process_definition_id().to_string(),
      process_definition_name: execution.process_definition_name().map(str::to_string),
    }
  }

  /// Write the identity into `headers`, replacing any existing values.
  ///
  /// The definition name is only written when known.
  pub fn encode_into(&self, headers: &mut Headers) {
    headers.insert(EXECUTION_ID_HEADER.to_string(), self.execution_id.clone().into());
    headers.insert(ACTIVITY_ID_HEADER.to_string(), self.activity_id.clone().into());
    headers.insert(
      PROCESS_INSTANCE_ID_HEADER.to_string(),
      self.process_instance_id.clone().into(),
    );
    headers.insert(
      PROCESS_DEFINITION_ID_HEADER.to_string(),
      self.process_definition_id.clone().into(),
    );
    if let Some(name) = &self.process_definition_name {
      headers.insert(PROCESS_DEFINITION_NAME_HEADER.to_string(), name.clone().into());
    }
  }

  pub fn to_headers(&self) -> Headers {
    let mut headers = Headers::new();
    self.encode_into(&mut headers);
    headers
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_well_known_headers_share_prefix() {
    for header in WELL_KNOWN_HEADERS {
      assert!(header.starts_with(HEADER_PREFIX), "{header}");
    }
  }

  #[test]
  fn test_encode_without_definition_name() {
    let execution = Execution::new("exe-1", "pi-1", "pd-1", "wait");
    let headers = CorrelationIdentity::of(&execution).to_headers();

    assert_eq!(headers.len(), 4);
    assert_eq!(headers[EXECUTION_ID_HEADER], json!("exe-1"));
    assert_eq!(headers[ACTIVITY_ID_HEADER], json!("wait"));
    assert_eq!(headers[PROCESS_INSTANCE_ID_HEADER], json!("pi-1"));
    assert_eq!(headers[PROCESS_DEFINITION_ID_HEADER], json!("pd-1"));
    assert!(!headers.contains_key(PROCESS_DEFINITION_NAME_HEADER));
  }

  #[test]
  fn test_encode_with_definition_name() {
    let execution =
      Execution::new("exe-1", "pi-1", "pd-1", "wait").with_process_definition_name("onboarding");
    let headers = CorrelationIdentity::of(&execution).to_headers();

    assert_eq!(headers.len(), 5);
    assert_eq!(headers[PROCESS_DEFINITION_NAME_HEADER], json!("onboarding"));
  }

  #[test]
  fn test_execution_id_requires_string() {
    let mut headers = Headers::new();
    assert_eq!(execution_id(&headers), None);

    headers.insert(EXECUTION_ID_HEADER.to_string(), json!(42));
    assert_eq!(execution_id(&headers), None);

    headers.insert(EXECUTION_ID_HEADER.to_string(), json!("exe-1"));
    assert_eq!(execution_id(&headers), Some("exe-1"));
  }
}
