//! Per-client scheduling state
//!
//! A `ClientSession` exists from carrier open to carrier close. Until the
//! first `init` message it has no channel and the scheduler skips it;
//! `init` binds a channel and seeds both lanes at the live edge. Every
//! re-init bumps `init_id` so telemetry from the previous session can be
//! told apart and dropped.

use crate::catalog::{MediaKind, TrackFormat};
use crate::protocol::ClientInfo;

use super::segment::SegmentSender;
use super::stats::SessionStats;

/// Scheduling state for one media lane (video or audio) of one client
#[derive(Debug, Default)]
pub struct LaneState {
    /// Timestamp of the next segment the server will send
    pub next_ts: Option<u64>,
    /// Quality of the most recently completed segment
    pub curr_format: Option<TrackFormat>,
    /// Segment currently being chunked out, if any
    pub in_progress: Option<SegmentSender>,
    /// Timestamp the client reports it will play next
    pub client_next_ts: Option<u64>,
    /// Seconds of media buffered on the client
    pub playback_buf: f64,
}

impl LaneState {
    fn seeded(ts: u64) -> Self {
        Self {
            next_ts: Some(ts),
            client_next_ts: Some(ts),
            ..Self::default()
        }
    }
}

/// Complete per-connection state
#[derive(Debug)]
pub struct ClientSession {
    connection_id: u64,
    init_id: u32,
    channel: Option<String>,
    video: LaneState,
    audio: LaneState,
    stats: SessionStats,
}

impl ClientSession {
    /// Create the state for a fresh connection
    pub fn new(connection_id: u64) -> Self {
        Self {
            connection_id,
            init_id: 0,
            channel: None,
            video: LaneState::default(),
            audio: LaneState::default(),
            stats: SessionStats::new(),
        }
    }

    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Token matched against inbound telemetry
    pub fn init_id(&self) -> u32 {
        self.init_id
    }

    /// The subscribed channel, if any
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Bind a channel and re-seed both lanes at the live edge
    ///
    /// The client-reported timestamps start mirroring the seeds (nothing
    /// is in flight yet) and the playback buffers start at zero, so a
    /// fresh session is eligible on the next tick.
    pub fn init(&mut self, channel: &str, init_vts: u64, init_ats: u64) {
        self.channel = Some(channel.to_owned());
        self.init_id += 1;
        self.video = LaneState::seeded(init_vts);
        self.audio = LaneState::seeded(init_ats);
    }

    /// Lane state for one media kind
    pub fn lane(&self, kind: MediaKind) -> &LaneState {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    /// Mutable lane state for one media kind
    pub fn lane_mut(&mut self, kind: MediaKind) -> &mut LaneState {
        match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Audio => &mut self.audio,
        }
    }

    /// Apply a telemetry report; stale reports are dropped
    ///
    /// Returns whether the report matched the current `init_id`.
    pub fn apply_info(&mut self, info: &ClientInfo) -> bool {
        if info.init_id != self.init_id {
            return false;
        }
        self.video.playback_buf = info.video_buffer_len;
        self.audio.playback_buf = info.audio_buffer_len;
        self.video.client_next_ts = Some(info.next_video_timestamp);
        self.audio.client_next_ts = Some(info.next_audio_timestamp);
        true
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }
}
