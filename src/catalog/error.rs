//! Catalog error types

use std::path::PathBuf;

/// Error type for catalog construction and media indexing
#[derive(Debug)]
pub enum CatalogError {
    /// A channel name appears twice in the catalog
    DuplicateChannel(String),
    /// A listed channel has no configuration table
    MissingChannelConfig(String),
    /// A channel configuration is unusable
    InvalidChannel { name: String, reason: String },
    /// A channel's media directory does not exist
    MissingMediaDir(PathBuf),
    /// A media file could not be memory-mapped
    Map {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The filesystem watcher could not be set up
    Watch(notify::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::DuplicateChannel(name) => write!(f, "duplicate channel: {}", name),
            CatalogError::MissingChannelConfig(name) => {
                write!(f, "channel {} is listed but has no configuration", name)
            }
            CatalogError::InvalidChannel { name, reason } => {
                write!(f, "invalid channel {}: {}", name, reason)
            }
            CatalogError::MissingMediaDir(path) => {
                write!(f, "media directory not found: {}", path.display())
            }
            CatalogError::Map { path, source } => {
                write!(f, "failed to map {}: {}", path.display(), source)
            }
            CatalogError::Watch(source) => write!(f, "failed to watch media: {}", source),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Map { source, .. } => Some(source),
            CatalogError::Watch(source) => Some(source),
            _ => None,
        }
    }
}
