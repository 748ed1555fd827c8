//! Structured logging for the worker binary.
//!
//! Library code only emits `tracing` events; installing a subscriber
//! (pretty, compact or JSON output, level and filter directives) is the
//! binary's job.

mod tracing_init;

pub use tracing_init::*;
