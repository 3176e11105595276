//! Media watcher
//!
//! Keeps the segment stores in sync with the media tree on disk. Layout
//! per channel:
//!
//! ```text
//! <dir>/<format>/init.mp4     init data for one quality
//! <dir>/<format>/<ts>.m4s     segment at timestamp <ts>
//! ```
//!
//! Start the watcher before running the startup scan so a file landing
//! between the two is not missed; re-indexing an already-known path just
//! remaps the same blob.

use std::path::{Component, Path};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::channel::Channel;
use super::error::CatalogError;
use super::format::TrackFormat;
use super::storage::MediaBlob;
use super::store::ChannelCatalog;

enum SegmentFile {
    Init,
    Media(u64),
}

/// Filesystem watcher feeding the catalog's segment stores
pub struct MediaWatcher {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl MediaWatcher {
    /// Watch every channel directory and spawn the indexing task
    pub fn spawn(catalog: Arc<ChannelCatalog>) -> Result<Self, CatalogError> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            match event {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(error) => tracing::warn!(%error, "media watch error"),
            }
        })
        .map_err(CatalogError::Watch)?;

        for channel in catalog.iter() {
            if !channel.dir().is_dir() {
                return Err(CatalogError::MissingMediaDir(channel.dir().to_owned()));
            }
            watcher
                .watch(channel.dir(), RecursiveMode::Recursive)
                .map_err(CatalogError::Watch)?;
            tracing::info!(channel = %channel.name(), dir = %channel.dir().display(), "watching media");
        }

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    for path in &event.paths {
                        index_path(&catalog, path);
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Stop the indexing task
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Index the media already on disk; returns the number of files indexed
pub fn scan(catalog: &ChannelCatalog) -> Result<usize, CatalogError> {
    let mut indexed = 0;
    for channel in catalog.iter() {
        if !channel.dir().is_dir() {
            return Err(CatalogError::MissingMediaDir(channel.dir().to_owned()));
        }
        for track in [channel.video(), channel.audio()] {
            for format in track.formats() {
                let dir = channel.dir().join(format.as_str());
                let Ok(entries) = std::fs::read_dir(&dir) else {
                    tracing::debug!(dir = %dir.display(), "format directory not present yet");
                    continue;
                };
                for entry in entries.flatten() {
                    if index_path(catalog, &entry.path()) {
                        indexed += 1;
                    }
                }
            }
        }
    }
    Ok(indexed)
}

/// Map one media path into its channel's segment store
///
/// Paths that do not match the `<dir>/<format>/<file>` shape of a
/// configured channel are ignored.
fn index_path(catalog: &ChannelCatalog, path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let Some(segment_file) = classify(file_name) else {
        return false;
    };

    for channel in catalog.iter() {
        let Ok(rel) = path.strip_prefix(channel.dir()) else {
            continue;
        };
        let mut components = rel.components();
        let Some(Component::Normal(format_dir)) = components.next() else {
            continue;
        };
        let Some(format_name) = format_dir.to_str() else {
            continue;
        };
        if components.next().is_none() || components.next().is_some() {
            continue;
        }

        let format = TrackFormat::from(format_name);
        let Some(track) = lookup_track(channel, &format) else {
            continue;
        };

        let blob = match MediaBlob::map_file(path) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to map media file");
                return false;
            }
        };

        return match segment_file {
            SegmentFile::Init => {
                let inserted = track.store().insert_init(&format, blob);
                if inserted {
                    tracing::debug!(
                        channel = %channel.name(),
                        kind = %track.kind(),
                        format = %format,
                        "indexed init data"
                    );
                }
                inserted
            }
            SegmentFile::Media(ts) => {
                let inserted = track.store().insert_segment(&format, ts, blob);
                if inserted {
                    tracing::trace!(
                        channel = %channel.name(),
                        kind = %track.kind(),
                        format = %format,
                        ts,
                        "indexed segment"
                    );
                }
                inserted
            }
        };
    }
    false
}

fn lookup_track<'a>(channel: &'a Channel, format: &TrackFormat) -> Option<&'a super::channel::Track> {
    if channel.video().formats().contains(format) {
        Some(channel.video())
    } else if channel.audio().formats().contains(format) {
        Some(channel.audio())
    } else {
        None
    }
}

fn classify(file_name: &str) -> Option<SegmentFile> {
    if file_name == "init.mp4" {
        return Some(SegmentFile::Init);
    }
    let stem = file_name.strip_suffix(".m4s")?;
    stem.parse::<u64>().ok().map(SegmentFile::Media)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(matches!(classify("init.mp4"), Some(SegmentFile::Init)));
        assert!(matches!(
            classify("180000.m4s"),
            Some(SegmentFile::Media(180_000))
        ));
        assert!(classify("playlist.m3u8").is_none());
        assert!(classify("notanumber.m4s").is_none());
        assert!(classify("180000.mp4").is_none());
    }
}
