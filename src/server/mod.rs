//! WebSocket frame carrier
//!
//! The transport side of the server: configuration, the accept loop, and
//! per-connection reader/writer tasks. The carrier knows nothing about
//! channels or scheduling; it moves binary frames and reports per-
//! connection queue depth, and forwards opens, messages, and closes to
//! the scheduler as `CarrierEvent`s.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::{Config, ServerConfig};
pub use connection::{CarrierEvent, ConnectionHandle, ConnectionMap};
pub use listener::WsServer;
