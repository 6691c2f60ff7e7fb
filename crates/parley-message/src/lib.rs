//! Parley Message
//!
//! The messaging side of a parley gateway: a [`Message`] envelope with a
//! JSON payload and a string-keyed header map, and the channels it travels
//! on.
//!
//! Two channel flavours exist, mirroring how a messaging layer hands
//! messages to consumers:
//!
//! - [`PollableChannel`]: messages are buffered and consumers pull them with
//!   a bounded receive timeout ([`QueueChannel`]).
//! - [`SubscribableChannel`]: messages are pushed to subscribed
//!   [`MessageHandler`]s as they are sent ([`DirectChannel`]).
//!
//! [`MessagingTemplate`] provides fire-and-forget sends and
//! send-and-receive exchanges over a temporary reply channel.
//! [`ServiceActivator`] is the far end of a request channel: it drains
//! requests, runs a handler and routes the result back.

mod activator;
mod channel;
mod direct;
mod error;
mod message;
mod queue;
mod template;

pub use activator::ServiceActivator;
pub use channel::{HandlerError, MessageChannel, MessageHandler, PollableChannel, SubscribableChannel};
pub use direct::DirectChannel;
pub use error::ChannelError;
pub use message::{Headers, Message, MessageBuilder};
pub use queue::QueueChannel;
pub use template::MessagingTemplate;
