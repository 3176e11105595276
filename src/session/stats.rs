//! Per-session send counters

use crate::catalog::MediaKind;

/// Counters for one client session, logged when the session ends
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// Frames handed to the carrier
    pub frames_queued: u64,
    /// Bytes handed to the carrier, headers included
    pub bytes_queued: u64,
    /// Video segments fully sent
    pub video_segments: u64,
    /// Audio segments fully sent
    pub audio_segments: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one queued frame
    pub fn record_frame(&mut self, len: usize) {
        self.frames_queued += 1;
        self.bytes_queued += len as u64;
    }

    /// Record a completed segment
    pub fn record_segment(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Video => self.video_segments += 1,
            MediaKind::Audio => self.audio_segments += 1,
        }
    }
}
