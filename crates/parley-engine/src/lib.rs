//! Parley Engine
//!
//! The workflow-engine side of a parley gateway. The engine itself is an
//! external collaborator; this crate only models what a gateway needs from
//! it:
//!
//! - [`Execution`]: a suspended point of progress with its identifiers and
//!   variable store
//! - [`ActivityBehavior`]: the seam the engine calls when an execution
//!   reaches a wait-state activity, and again when it is signalled
//! - [`ProcessEngine`]: the query and live-mutation API used to resume a
//!   parked execution from outside the engine's own call stack
//!
//! [`InMemoryProcessEngine`] is a small engine implementing that contract,
//! used by tests and the command line driver.

mod behavior;
mod engine;
mod error;
mod events;
mod execution;
mod memory;

pub use behavior::{ActivityBehavior, ActivityOutcome, BehaviorError};
pub use engine::ProcessEngine;
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use execution::{Execution, ExecutionRef, Variables};
pub use memory::{ExecutionStatus, InMemoryProcessEngine};
