//! In-progress outbound segments
//!
//! A segment usually exceeds the wire frame cap, so it is cut into chunks
//! at the application layer. `SegmentSender` tracks one segment mid-send:
//! the payload blob, an optional init blob prepended on quality changes,
//! and a byte cursor over their concatenation.

use bytes::{Bytes, BytesMut};

use crate::catalog::{MediaBlob, TrackFormat};

/// One segment being chunked onto the wire
///
/// The cursor covers the virtual `init ‖ payload` byte string; exactly one
/// cursor advance happens per emitted frame, and the segment is done when
/// the cursor reaches the total length.
#[derive(Debug)]
pub struct SegmentSender {
    format: TrackFormat,
    init: Option<MediaBlob>,
    payload: MediaBlob,
    cursor: usize,
}

impl SegmentSender {
    /// Start sending a segment, optionally prefixed by init data
    pub fn new(format: TrackFormat, payload: MediaBlob, init: Option<MediaBlob>) -> Self {
        Self {
            format,
            init,
            payload,
            cursor: 0,
        }
    }

    /// The quality variant this segment was fetched at
    pub fn format(&self) -> &TrackFormat {
        &self.format
    }

    /// Bytes already handed out
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Total length of `init ‖ payload`
    pub fn length(&self) -> usize {
        self.init_len() + self.payload.len()
    }

    /// Whether every byte has been handed out
    pub fn done(&self) -> bool {
        self.cursor == self.length()
    }

    /// Read up to `max` bytes from the current cursor, advancing it
    pub fn read(&mut self, max: usize) -> Bytes {
        let end = self.length().min(self.cursor + max);
        let mut out = BytesMut::with_capacity(end.saturating_sub(self.cursor));
        let init_len = self.init_len();

        if let Some(init) = &self.init {
            if self.cursor < init_len {
                let stop = end.min(init_len);
                out.extend_from_slice(&init[self.cursor..stop]);
            }
        }
        if end > init_len {
            let start = self.cursor.max(init_len) - init_len;
            out.extend_from_slice(&self.payload[start..end - init_len]);
        }

        self.cursor = end;
        out.freeze()
    }

    fn init_len(&self) -> usize {
        self.init.as_ref().map_or(0, MediaBlob::len)
    }
}
