//! Pipeline tests.
//!
//! - `delivery.rs`     - fan-out, explicit targets, store bookkeeping
//! - `retry.rs`        - per-target retries and unregistered targets
//! - `restart.rs`      - reload of stored records on startup
//! - `backpressure.rs` - bounded intake and queue depth
//! - `shutdown.rs`     - drain, timeout and post-shutdown submissions

mod backpressure;
mod harness;
mod restart;
