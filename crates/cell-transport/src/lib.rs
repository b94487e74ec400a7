//! Pooled, serialised access to one TCP Modbus server. All operations are
//! synchronous from the caller's point of view; concurrent callers are
//! serialised through a single worker thread that owns the one connection.

mod client;
mod error;
mod worker;

pub use client::ModbusTransport;
pub use error::TransportError;
