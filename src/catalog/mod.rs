//! Media catalog
//!
//! The catalog side of the server: channels, their per-track quality
//! ladders, and the mmap-backed segment stores that the media watcher
//! fills in as the packager drops files on disk.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<ChannelCatalog>
//!                ┌──────────────────────────┐
//!                │ "news" ─► Channel {      │
//!                │   video: Track{store},   │
//!                │   audio: Track{store},   │
//!                │ }                        │
//!                └─────┬──────────────┬─────┘
//!                      │              │
//!              inserts │              │ reads
//!                      │              │
//!              [MediaWatcher]    [Scheduler]
//!              notify + scan     ready()/data()/init()
//! ```
//!
//! Availability is monotone: the watcher only inserts, so a segment a
//! tick observed as ready stays readable for that tick. Blobs are
//! reference-counted; an in-progress send keeps its mapping alive even
//! if the store is later dropped.

pub mod channel;
pub mod error;
pub mod format;
pub mod storage;
pub mod store;
pub mod watcher;

pub use channel::{Channel, ChannelConfig, Track};
pub use error::CatalogError;
pub use format::{MediaKind, TrackFormat};
pub use storage::{MediaBlob, SegmentStore};
pub use store::ChannelCatalog;
pub use watcher::{scan, MediaWatcher};
