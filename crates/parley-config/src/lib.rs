//! Parley Config
//!
//! This crate contains the serializable configuration types for parley
//! gateways. A [`GatewayDef`] describes how a wait-state activity is wired
//! to the messaging layer before the gateway is built:
//!
//! - which channels carry requests, replies and failed replies
//! - whether the gateway blocks for its reply or parks the execution
//! - how process variables and message headers are mapped onto each other
//!
//! Definitions are plain JSON documents:
//!
//! ```json
//! {
//!   "mode": "asynchronous",
//!   "request_channel": "crm.requests",
//!   "reply_channel": "crm.replies",
//!   "header_mapping": {
//!     "header_to_variable_names": ["crm*", "customerId"]
//!   }
//! }
//! ```
//!
//! Channel names are resolved to live channels by whoever builds the
//! gateway; this crate never touches the messaging layer.

mod error;
mod gateway;
mod mapping;

pub use error::ConfigError;
pub use gateway::{DEFAULT_POLL_TIMEOUT_MS, GatewayDef, GatewayMode};
pub use mapping::{DEFAULT_HEADER_PREFIX, MappingDef};
