//! Message envelope and builder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::channel::MessageChannel;

/// Message headers. Keys are unique; values are opaque JSON.
pub type Headers = HashMap<String, serde_json::Value>;

/// An immutable message: payload, headers and an optional reply address.
#[derive(Clone)]
pub struct Message {
  id: String,
  payload: serde_json::Value,
  headers: Headers,
  reply_channel: Option<Arc<dyn MessageChannel>>,
}

impl Message {
  /// Unique id assigned when the message was built.
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn payload(&self) -> &serde_json::Value {
    &self.payload
  }

  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  pub fn header(&self, key: &str) -> Option<&serde_json::Value> {
    self.headers.get(key)
  }

  /// String value of a header, if present and a JSON string.
  pub fn header_str(&self, key: &str) -> Option<&str> {
    self.headers.get(key).and_then(|v| v.as_str())
  }

  /// Where the receiver of this message should send its reply.
  pub fn reply_channel(&self) -> Option<&Arc<dyn MessageChannel>> {
    self.reply_channel.as_ref()
  }

  /// Return the same message addressed to a different reply channel.
  pub fn with_reply_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
    self.reply_channel = Some(channel);
    self
  }
}

impl fmt::Debug for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Message")
      .field("id", &self.id)
      .field("payload", &self.payload)
      .field("headers", &self.headers)
      .field(
        "reply_channel",
        &self.reply_channel.as_ref().map(|c| c.name().to_string()),
      )
      .finish()
  }
}

/// Builder for [`Message`].
///
/// ```ignore
/// let message = MessageBuilder::with_payload(json!({ "order": 42 }))
///   .copy_headers_if_absent(defaults)
///   .copy_headers(mapped)
///   .reply_channel(replies)
///   .build();
/// ```
#[derive(Default)]
pub struct MessageBuilder {
  payload: serde_json::Value,
  headers: Headers,
  reply_channel: Option<Arc<dyn MessageChannel>>,
}

impl MessageBuilder {
  pub fn with_payload(payload: serde_json::Value) -> Self {
    Self {
      payload,
      ..Default::default()
    }
  }

  /// Start from an existing message's payload and headers.
  ///
  /// The reply channel is not carried over; the built message gets a new id.
  pub fn from_message(message: &Message) -> Self {
    Self {
      payload: message.payload.clone(),
      headers: message.headers.clone(),
      reply_channel: None,
    }
  }

  pub fn header(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.headers.insert(key.into(), value.into());
    self
  }

  /// Copy all headers, overwriting existing keys.
  pub fn copy_headers(mut self, headers: Headers) -> Self {
    self.headers.extend(headers);
    self
  }

  /// Copy headers whose keys are not already present.
  pub fn copy_headers_if_absent(mut self, headers: Headers) -> Self {
    for (key, value) in headers {
      self.headers.entry(key).or_insert(value);
    }
    self
  }

  pub fn reply_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
    self.reply_channel = Some(channel);
    self
  }

  pub fn build(self) -> Message {
    Message {
      id: uuid::Uuid::new_v4().to_string(),
      payload: self.payload,
      headers: self.headers,
      reply_channel: self.reply_channel,
    }
  }
}
