//! Client session state
//!
//! Everything the scheduler knows about one connection: the two lane
//! cursors (video and audio), the telemetry the client last reported, the
//! segment currently being chunked out per lane, and send counters. The
//! registry maps connection ids to sessions for the lifetime of the
//! connection.

pub mod client;
pub mod registry;
pub mod segment;
pub mod stats;

pub use client::{ClientSession, LaneState};
pub use registry::ClientRegistry;
pub use segment::SegmentSender;
pub use stats::SessionStats;
