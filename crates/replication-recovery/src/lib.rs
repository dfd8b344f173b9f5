//! # Replication Recovery
//!
//! Answers `instance_recover_request` messages: every registered
//! [`RecoverHandler`] replays what it owns for the requested window, lowest
//! priority first, then an `instance_recover_finished` notice is sent back to
//! the requester through the regular sender pipeline.

mod handler;
mod receiver;

pub use handler::{RecoverHandler, RecoverHandlerProvider, RecoverHandlerRegistry};
pub use receiver::InstanceRecoverRequestReceiver;
