//! HTTP [`Transport`](replication_core::Transport) for replication messages.
//!
//! Each attempt is a single `POST <instance uri>/replication/messages` with a
//! JSON [`WireMessage`] body. Retrying is left to the sender pipeline.

mod client;
mod wire;

pub use client::{HttpTransport, HttpTransportConfig, MESSAGES_PATH};
pub use wire::WireMessage;
