//! Small helpers shared across the transport, device-client and control
//! crates: nothing here talks to Modbus or the robot directly.

pub mod backoff;
pub mod counters;

pub use backoff::{Backoff, BackoffConfig};
pub use counters::Counter;
