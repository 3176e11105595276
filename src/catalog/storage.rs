//! Segment storage
//!
//! Each track owns a `SegmentStore`: per-format maps from timestamp to a
//! memory-mapped segment blob, plus one init blob per format. The media
//! watcher inserts as files appear on disk; the scheduler only reads.
//! Availability is monotone — a segment, once inserted, is never removed
//! while the store lives, so a readiness check holds for the rest of the
//! tick that observed it.

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use memmap2::Mmap;
use parking_lot::RwLock;

use super::format::TrackFormat;

/// A reference-counted, immutable media blob
///
/// Backed by a memory-mapped file in production and by owned bytes in
/// tests. Cloning is cheap; the underlying mapping lives until the last
/// clone is dropped, so an in-progress segment keeps its data valid.
#[derive(Clone)]
pub struct MediaBlob {
    inner: Arc<BlobData>,
}

enum BlobData {
    Mapped(Mmap),
    Owned(Bytes),
}

impl MediaBlob {
    /// Map a segment file into memory
    ///
    /// Safety of the mapping rests on the packager contract: segment files
    /// are written once and renamed into place, never mutated afterwards.
    pub fn map_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self {
            inner: Arc::new(BlobData::Mapped(map)),
        })
    }

    /// Wrap owned bytes
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            inner: Arc::new(BlobData::Owned(data.into())),
        }
    }

    /// Blob length in bytes
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the blob is empty
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// The blob contents
    pub fn as_slice(&self) -> &[u8] {
        match &*self.inner {
            BlobData::Mapped(map) => map,
            BlobData::Owned(bytes) => bytes,
        }
    }
}

impl Deref for MediaBlob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MediaBlob({} bytes)", self.len())
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    inits: HashMap<TrackFormat, MediaBlob>,
    segments: HashMap<TrackFormat, BTreeMap<u64, MediaBlob>>,
}

/// Per-track segment index
///
/// Thread-safe via `RwLock`; writers (the media watcher) hold the lock
/// only for a map insert, readers only for a lookup plus a blob clone.
#[derive(Debug)]
pub struct SegmentStore {
    formats: Vec<TrackFormat>,
    inner: RwLock<StoreInner>,
}

impl SegmentStore {
    /// Create an empty store for the given ordered format list
    pub fn new(formats: Vec<TrackFormat>) -> Self {
        let mut inner = StoreInner::default();
        for format in &formats {
            inner.segments.insert(format.clone(), BTreeMap::new());
        }
        Self {
            formats,
            inner: RwLock::new(inner),
        }
    }

    /// The ordered format list this store indexes
    pub fn formats(&self) -> &[TrackFormat] {
        &self.formats
    }

    /// Record the init blob for a format; unknown formats are ignored
    pub fn insert_init(&self, format: &TrackFormat, blob: MediaBlob) -> bool {
        if !self.formats.contains(format) {
            return false;
        }
        self.inner.write().inits.insert(format.clone(), blob);
        true
    }

    /// Record a segment blob; unknown formats are ignored
    pub fn insert_segment(&self, format: &TrackFormat, ts: u64, blob: MediaBlob) -> bool {
        let mut inner = self.inner.write();
        match inner.segments.get_mut(format) {
            Some(map) => {
                map.insert(ts, blob);
                true
            }
            None => false,
        }
    }

    /// Init blob for a format
    pub fn init(&self, format: &TrackFormat) -> Option<MediaBlob> {
        self.inner.read().inits.get(format).cloned()
    }

    /// Segment blob for a format at a timestamp
    pub fn segment(&self, format: &TrackFormat, ts: u64) -> Option<MediaBlob> {
        self.inner
            .read()
            .segments
            .get(format)
            .and_then(|map| map.get(&ts))
            .cloned()
    }

    /// Whether a segment at `ts` is present in every format
    pub fn ready_all(&self, ts: u64) -> bool {
        if self.formats.is_empty() {
            return false;
        }
        let inner = self.inner.read();
        self.formats
            .iter()
            .all(|f| inner.segments.get(f).is_some_and(|m| m.contains_key(&ts)))
    }

    /// Whether a segment at `ts` is present in at least one format
    pub fn ready_any(&self, ts: u64) -> bool {
        let inner = self.inner.read();
        self.formats
            .iter()
            .any(|f| inner.segments.get(f).is_some_and(|m| m.contains_key(&ts)))
    }

    /// The formats that have a segment at `ts`, in declaration order
    pub fn ready_formats(&self, ts: u64) -> Vec<TrackFormat> {
        let inner = self.inner.read();
        self.formats
            .iter()
            .filter(|f| inner.segments.get(*f).is_some_and(|m| m.contains_key(&ts)))
            .cloned()
            .collect()
    }

    /// Greatest timestamp with a segment present, in every format when
    /// `require_all`, in some format otherwise
    pub fn latest_ready(&self, require_all: bool) -> Option<u64> {
        let inner = self.inner.read();
        if require_all {
            let first = self.formats.first()?;
            let map = inner.segments.get(first)?;
            map.keys()
                .rev()
                .find(|ts| {
                    self.formats
                        .iter()
                        .all(|f| inner.segments.get(f).is_some_and(|m| m.contains_key(*ts)))
                })
                .copied()
        } else {
            inner
                .segments
                .values()
                .filter_map(|m| m.keys().next_back())
                .max()
                .copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(formats: &[&str]) -> SegmentStore {
        SegmentStore::new(formats.iter().map(|f| TrackFormat::from(*f)).collect())
    }

    fn blob(len: usize) -> MediaBlob {
        MediaBlob::from_bytes(vec![0xAB; len])
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = store(&["hi", "lo"]);
        let hi = TrackFormat::from("hi");

        assert!(store.insert_segment(&hi, 0, blob(10)));
        assert!(store.insert_init(&hi, blob(4)));

        assert_eq!(store.segment(&hi, 0).map(|b| b.len()), Some(10));
        assert_eq!(store.init(&hi).map(|b| b.len()), Some(4));
        assert!(store.segment(&hi, 90_000).is_none());
    }

    #[test]
    fn test_unknown_format_ignored() {
        let store = store(&["hi"]);
        let other = TrackFormat::from("other");

        assert!(!store.insert_segment(&other, 0, blob(10)));
        assert!(!store.insert_init(&other, blob(4)));
        assert!(store.segment(&other, 0).is_none());
    }

    #[test]
    fn test_ready_all_vs_any() {
        let store = store(&["hi", "lo"]);
        let hi = TrackFormat::from("hi");
        let lo = TrackFormat::from("lo");

        store.insert_segment(&hi, 0, blob(10));
        assert!(!store.ready_all(0));
        assert!(store.ready_any(0));
        assert_eq!(store.ready_formats(0), vec![hi.clone()]);

        store.insert_segment(&lo, 0, blob(10));
        assert!(store.ready_all(0));
        assert_eq!(store.ready_formats(0), vec![hi, lo]);
    }

    #[test]
    fn test_latest_ready() {
        let store = store(&["hi", "lo"]);
        let hi = TrackFormat::from("hi");
        let lo = TrackFormat::from("lo");

        assert_eq!(store.latest_ready(true), None);

        store.insert_segment(&hi, 0, blob(1));
        store.insert_segment(&lo, 0, blob(1));
        store.insert_segment(&hi, 180_000, blob(1));

        // 180_000 is only ready in one format
        assert_eq!(store.latest_ready(true), Some(0));
        assert_eq!(store.latest_ready(false), Some(180_000));

        store.insert_segment(&lo, 180_000, blob(1));
        assert_eq!(store.latest_ready(true), Some(180_000));
    }

    #[test]
    fn test_blob_clone_shares_data() {
        let blob = MediaBlob::from_bytes(vec![1, 2, 3]);
        let clone = blob.clone();
        assert_eq!(&blob[..], &clone[..]);
        assert_eq!(clone.len(), 3);
        assert!(!clone.is_empty());
    }
}
