//! Channels and tracks
//!
//! A `Channel` is one live programme: a name, a timestamp timescale, and
//! two `Track`s (video, audio). Each track carries a fixed segment
//! duration, an ordered quality ladder, a codec string for client decoder
//! setup, and the segment store the media watcher fills in.
//!
//! Readiness is asymmetric by design: a video timestamp is ready only when
//! every quality has its segment (the selector may pick any rung), while an
//! audio timestamp is ready as soon as some quality has one (the selector
//! is restricted to the ready rungs).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::CatalogError;
use super::format::{MediaKind, TrackFormat};
use super::storage::{MediaBlob, SegmentStore};

/// Per-channel configuration table
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Root of the channel's media tree (`<dir>/<format>/<ts>.m4s`)
    pub dir: PathBuf,
    /// Timestamp ticks per second
    pub timescale: u64,
    /// Video segment length in timescale units
    pub video_duration: u64,
    /// Audio segment length in timescale units
    pub audio_duration: u64,
    /// Ordered video quality ladder
    pub video: Vec<String>,
    /// Ordered audio quality ladder
    pub audio: Vec<String>,
    /// Video codec string sent in the init reply
    pub vcodec: String,
    /// Audio codec string sent in the init reply
    pub acodec: String,
}

/// One media track of a channel
#[derive(Debug)]
pub struct Track {
    kind: MediaKind,
    duration: u64,
    codec: String,
    store: SegmentStore,
}

impl Track {
    /// Create a track with an empty segment store
    pub fn new(kind: MediaKind, duration: u64, codec: String, formats: Vec<TrackFormat>) -> Self {
        Self {
            kind,
            duration,
            codec,
            store: SegmentStore::new(formats),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Segment length in timescale units
    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn codec(&self) -> &str {
        &self.codec
    }

    /// Ordered quality ladder
    pub fn formats(&self) -> &[TrackFormat] {
        self.store.formats()
    }

    /// Whether the segment at `ts` can be served
    pub fn ready(&self, ts: u64) -> bool {
        match self.kind {
            MediaKind::Video => self.store.ready_all(ts),
            MediaKind::Audio => self.store.ready_any(ts),
        }
    }

    /// The formats whose segment at `ts` is present
    pub fn ready_formats(&self, ts: u64) -> Vec<TrackFormat> {
        self.store.ready_formats(ts)
    }

    /// Segment payload for a format at a timestamp
    pub fn data(&self, format: &TrackFormat, ts: u64) -> Option<MediaBlob> {
        self.store.segment(format, ts)
    }

    /// Init data for a format
    pub fn init(&self, format: &TrackFormat) -> Option<MediaBlob> {
        self.store.init(format)
    }

    /// Greatest servable timestamp, per this track's readiness rule
    pub fn live_edge(&self) -> Option<u64> {
        self.store
            .latest_ready(matches!(self.kind, MediaKind::Video))
    }

    /// The underlying store, for the media watcher
    pub fn store(&self) -> &SegmentStore {
        &self.store
    }
}

/// One live channel
#[derive(Debug)]
pub struct Channel {
    name: String,
    dir: PathBuf,
    timescale: u64,
    video: Track,
    audio: Track,
}

impl Channel {
    /// Create a channel from parts
    pub fn new(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        timescale: u64,
        video: Track,
        audio: Track,
    ) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            timescale,
            video,
            audio,
        }
    }

    /// Build a channel from its configuration table
    pub fn from_config(name: &str, config: &ChannelConfig) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidChannel {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };

        if config.timescale == 0 {
            return Err(invalid("timescale must be positive"));
        }
        if config.video_duration == 0 || config.audio_duration == 0 {
            return Err(invalid("segment durations must be positive"));
        }
        if config.video.is_empty() || config.audio.is_empty() {
            return Err(invalid("format lists must be non-empty"));
        }

        let video = Track::new(
            MediaKind::Video,
            config.video_duration,
            config.vcodec.clone(),
            config.video.iter().cloned().map(TrackFormat::from).collect(),
        );
        let audio = Track::new(
            MediaKind::Audio,
            config.audio_duration,
            config.acodec.clone(),
            config.audio.iter().cloned().map(TrackFormat::from).collect(),
        );

        Ok(Self::new(name, &config.dir, config.timescale, video, audio))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the channel's media tree
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Timestamp ticks per second
    pub fn timescale(&self) -> u64 {
        self.timescale
    }

    pub fn video(&self) -> &Track {
        &self.video
    }

    pub fn audio(&self) -> &Track {
        &self.audio
    }

    /// The track of the given kind
    pub fn track(&self, kind: MediaKind) -> &Track {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    /// Live-edge video timestamp new subscribers start from
    pub fn init_vts(&self) -> Option<u64> {
        self.video.live_edge()
    }

    /// The audio timestamp aligned to a video timestamp
    pub fn find_ats(&self, vts: u64) -> u64 {
        vts / self.audio.duration() * self.audio.duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChannelConfig {
        ChannelConfig {
            dir: PathBuf::from("media/news"),
            timescale: 90_000,
            video_duration: 180_000,
            audio_duration: 96_000,
            video: vec!["1280x720-23".into(), "854x480-23".into()],
            audio: vec!["128k".into()],
            vcodec: "avc1.42e020".into(),
            acodec: "mp4a.40.2".into(),
        }
    }

    #[test]
    fn test_from_config() {
        let channel = Channel::from_config("news", &test_config()).unwrap();

        assert_eq!(channel.name(), "news");
        assert_eq!(channel.timescale(), 90_000);
        assert_eq!(channel.video().duration(), 180_000);
        assert_eq!(channel.audio().duration(), 96_000);
        assert_eq!(channel.video().formats().len(), 2);
        assert_eq!(channel.track(MediaKind::Audio).codec(), "mp4a.40.2");
    }

    #[test]
    fn test_from_config_rejects_bad_values() {
        let mut config = test_config();
        config.timescale = 0;
        assert!(Channel::from_config("news", &config).is_err());

        let mut config = test_config();
        config.video.clear();
        assert!(Channel::from_config("news", &config).is_err());

        let mut config = test_config();
        config.audio_duration = 0;
        assert!(Channel::from_config("news", &config).is_err());
    }

    #[test]
    fn test_find_ats_aligns_down() {
        let channel = Channel::from_config("news", &test_config()).unwrap();

        assert_eq!(channel.find_ats(0), 0);
        assert_eq!(channel.find_ats(360_000), 288_000);
        assert_eq!(channel.find_ats(288_000), 288_000);
        assert_eq!(channel.find_ats(95_999), 0);
    }

    #[test]
    fn test_video_readiness_needs_every_format() {
        let channel = Channel::from_config("news", &test_config()).unwrap();
        let hi = TrackFormat::from("1280x720-23");
        let lo = TrackFormat::from("854x480-23");

        channel
            .video()
            .store()
            .insert_segment(&hi, 0, MediaBlob::from_bytes(vec![0; 8]));
        assert!(!channel.video().ready(0));
        assert_eq!(channel.init_vts(), None);

        channel
            .video()
            .store()
            .insert_segment(&lo, 0, MediaBlob::from_bytes(vec![0; 8]));
        assert!(channel.video().ready(0));
        assert_eq!(channel.init_vts(), Some(0));
    }

    #[test]
    fn test_audio_readiness_needs_some_format() {
        let channel = Channel::from_config("news", &test_config()).unwrap();
        let fmt = TrackFormat::from("128k");

        assert!(!channel.audio().ready(0));
        channel
            .audio()
            .store()
            .insert_segment(&fmt, 0, MediaBlob::from_bytes(vec![0; 8]));
        assert!(channel.audio().ready(0));
        assert_eq!(channel.audio().ready_formats(0), vec![fmt]);
    }
}
