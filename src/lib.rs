//! segcast — live adaptive-bitrate segment streaming over WebSocket
//!
//! Clients connect, receive the channel listing, subscribe with
//! `client-init`, and from then on the server pushes the channel's video
//! and audio segment timelines as chunked binary frames. A 10 ms
//! scheduler tick picks, per client and per lane, whether to send the
//! next chunk and at which quality, bounded by the client's reported
//! playback buffer, the unacknowledged in-flight window, and the
//! connection's outbound queue.
//!
//! # Components
//!
//! - [`catalog`] — channels, quality ladders, mmap-backed segment stores,
//!   and the filesystem watcher that fills them.
//! - [`server`] — the WebSocket carrier: accept loop, per-connection
//!   tasks, byte-counted outbound queues.
//! - [`session`] — per-client scheduling state and the registry keyed by
//!   connection id.
//! - [`scheduler`] — the tick-driven core deciding what every client
//!   receives next, with a pluggable quality selector.
//! - [`protocol`] — control and media messages and their binary frame
//!   layout.

pub mod catalog;
pub mod error;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod session;

pub use catalog::ChannelCatalog;
pub use error::{Error, Result};
pub use scheduler::{Scheduler, StreamLimits};
pub use server::{Config, ServerConfig, WsServer};
