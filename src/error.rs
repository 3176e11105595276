//! Crate-wide error type
//!
//! Startup failures (configuration, media catalog, port binding) are fatal
//! and propagate out of `main`. Per-client failures are handled locally by
//! the scheduler and never reach this type, with one exception: a duplicate
//! connection id indicates a carrier bug and aborts the server.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::protocol::ProtocolError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration parsed but failed validation
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// Media catalog failure (missing directory, mapping failure, ...)
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Listening socket could not be bound
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Protocol-level failure on a path where it is not client-recoverable
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Other I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A connection id was opened twice; indicates a carrier bug
    #[error("connection id {0} already exists")]
    DuplicateConnection(u64),
}
