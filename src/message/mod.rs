//! This module exports a minimal message-passing API, which is encapsulated
//! by a `Communicator` trait. Implementors only need to write `send` and
//! `recv` operations for a given transport layer. Two transports are
//! included: in-process crossbeam channels (threads as ranks) and a
//! pure-Rust TCP transport (processes as ranks). The `Mailbox` sits on top of
//! either one and delivers tagged, sequenced envelopes in the order they are
//! asked for.
//!

pub mod channel;
pub mod comm;
pub mod mailbox;
pub mod tcp;
pub mod util;

pub use channel::ChannelCommunicator;
pub use comm::Communicator;
pub use mailbox::{Envelope, Mailbox, Tag};
pub use tcp::TcpCommunicator;
