//! Daemon commands.

mod init;
mod lifecycle;
mod pipeline;
mod recover;

pub use init::run_daemon;
pub use lifecycle::check_status;
pub use recover::{parse_window, request_recovery};
