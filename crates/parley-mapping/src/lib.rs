//! Parley Mapping
//!
//! Moves data between process variables and message headers.
//!
//! Every message a gateway sends carries the [`CorrelationIdentity`] of the
//! execution that produced it, under the well-known header keys in
//! [`correlation`]. Replies must echo the execution id header so they can be
//! matched back to the suspended execution.
//!
//! Everything else is filtered by a [`HeaderMappingRules`] set: one pattern
//! list for variables exposed as outbound headers (everything by default)
//! and one for reply headers accepted as variables (nothing by default,
//! apart from well-known and prefixed headers).

pub mod correlation;
mod error;
mod mapper;
mod pattern;

pub use correlation::CorrelationIdentity;
pub use error::MappingError;
pub use mapper::{DefaultProcessVariableHeaderMapper, HeaderMappingRules, ProcessVariableHeaderMapper};
pub use pattern::{matches_any, simple_match};
