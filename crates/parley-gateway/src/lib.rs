//! Parley Gateway
//!
//! Bridges a wait-state activity and a message channel. When an execution
//! enters the activity the gateway sends a request carrying the execution's
//! correlation headers and mapped variables, and resumes the execution when
//! the correlated reply comes back.
//!
//! Two strategies are available:
//!
//! - [`SyncGateway`] sends and waits for the reply inside `execute`, applies
//!   it to the execution in hand and leaves the activity straight away.
//! - [`AsyncGateway`] sends and parks the execution. A reply consumer looks
//!   the execution up through the [`ProcessEngine`](parley_engine::ProcessEngine),
//!   writes the reply variables and signals it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use parley_engine::InMemoryProcessEngine;
//! use parley_gateway::{AsyncGateway, GatewayBuilder};
//! use parley_message::QueueChannel;
//!
//! let engine = Arc::new(InMemoryProcessEngine::new());
//! let gateway: AsyncGateway = GatewayBuilder::new()
//!   .engine(engine.clone())
//!   .request_channel(Arc::new(QueueChannel::new("requests")))
//!   .reply_channel(Arc::new(QueueChannel::new("replies")))
//!   .build()?;
//! let gateway = Arc::new(gateway);
//!
//! engine.run_activity(execution, gateway.clone()).await?;
//! ```

mod asynchronous;
mod builder;
mod callback;
mod contributor;
mod error;
mod gateway;
mod shared;
mod state;
mod strategy;
mod synchronous;

pub use asynchronous::Asynchronous;
pub use builder::GatewayBuilder;
pub use callback::{DirectSignalCallback, EngineSignalCallback, SignalCallback, signal_execution};
pub use contributor::HeaderContributor;
pub use error::{ErrorKind, GatewayError};
pub use gateway::{AsyncGateway, MessagingGateway, SyncGateway};
pub use shared::{DEFAULT_RESUMED_HISTORY, GatewayCore, GatewaySettings};
pub use state::GatewayState;
pub use strategy::DispatchStrategy;
pub use synchronous::Synchronous;
