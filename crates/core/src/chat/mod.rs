//! Chat vocabulary shared between the engine and the transport.
//!
//! The engine consumes [`Incoming`] messages and produces [`Outgoing`]
//! replies; delivery (long-polling, keyboard rendering) is the transport's
//! job and lives in the bot crate.

mod types;

pub use types::*;
