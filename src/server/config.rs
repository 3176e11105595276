//! Server configuration
//!
//! Loaded from one TOML document. Top level: the port, the ordered
//! channel list, and optional overrides for the send caps; each listed
//! channel has its own table keyed by the channel name.
//!
//! ```toml
//! port = 9361
//! channel = ["news"]
//!
//! [news]
//! dir = "media/news"
//! timescale = 90000
//! video_duration = 180000
//! audio_duration = 96000
//! video = ["1280x720-23", "854x480-23"]
//! audio = ["128k"]
//! vcodec = "avc1.42e020"
//! acodec = "mp4a.40.2"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::ChannelConfig;
use crate::error::{Error, Result};

pub const DEFAULT_MAX_BUFFER_S: f64 = 60.0;
pub const DEFAULT_MAX_INFLIGHT_S: f64 = 5.0;
pub const DEFAULT_MAX_WS_FRAME_B: usize = 100_000;

/// Frames below this cap cannot fit a header plus a useful chunk
const MIN_WS_FRAME_B: usize = 1_024;

/// The parsed configuration document
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Listening port for the carrier
    pub port: u16,
    /// Ordered list of channels to load
    pub channel: Vec<String>,
    /// Per-stream client buffer cap in seconds
    pub max_buffer_s: Option<f64>,
    /// Per-stream in-flight cap in seconds
    pub max_inflight_s: Option<f64>,
    /// Max frame bytes, header included
    pub max_ws_frame_b: Option<usize>,
    /// Max per-connection queued bytes
    pub max_ws_queue_b: Option<usize>,
    /// Channel tables, keyed by channel name
    #[serde(flatten)]
    pub channels: HashMap<String, ChannelConfig>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::ConfigInvalid("port cannot be 0".into()));
        }
        if self.channel.is_empty() {
            return Err(Error::ConfigInvalid("no channels configured".into()));
        }
        for name in &self.channel {
            if !self.channels.contains_key(name) {
                return Err(Error::ConfigInvalid(format!(
                    "channel {} is listed but has no table",
                    name
                )));
            }
        }
        let frame_cap = self.max_ws_frame_b.unwrap_or(DEFAULT_MAX_WS_FRAME_B);
        if frame_cap < MIN_WS_FRAME_B {
            return Err(Error::ConfigInvalid(format!(
                "max_ws_frame_b must be at least {}",
                MIN_WS_FRAME_B
            )));
        }
        Ok(())
    }

    /// The runtime settings with defaults applied
    pub fn server(&self) -> ServerConfig {
        let max_ws_frame_b = self.max_ws_frame_b.unwrap_or(DEFAULT_MAX_WS_FRAME_B);
        ServerConfig {
            port: self.port,
            max_buffer_s: self.max_buffer_s.unwrap_or(DEFAULT_MAX_BUFFER_S),
            max_inflight_s: self.max_inflight_s.unwrap_or(DEFAULT_MAX_INFLIGHT_S),
            max_ws_frame_b,
            // The queue cap defaults to the frame cap: one full frame of
            // backlog is the backpressure threshold.
            max_ws_queue_b: self.max_ws_queue_b.unwrap_or(max_ws_frame_b),
        }
    }
}

/// Runtime server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_buffer_s: f64,
    pub max_inflight_s: f64,
    pub max_ws_frame_b: usize,
    pub max_ws_queue_b: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        port = 9361
        channel = ["news", "sports"]
        max_buffer_s = 30
        max_inflight_s = 2
        max_ws_frame_b = 50000

        [news]
        dir = "media/news"
        timescale = 90000
        video_duration = 180000
        audio_duration = 96000
        video = ["1280x720-23"]
        audio = ["128k"]
        vcodec = "avc1.42e020"
        acodec = "mp4a.40.2"

        [sports]
        dir = "media/sports"
        timescale = 90000
        video_duration = 180000
        audio_duration = 96000
        video = ["854x480-23"]
        audio = ["64k"]
        vcodec = "avc1.42e020"
        acodec = "mp4a.40.2"
    "#;

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(FULL);
        config.validate().unwrap();

        assert_eq!(config.port, 9361);
        assert_eq!(config.channel, vec!["news".to_owned(), "sports".to_owned()]);
        assert_eq!(config.channels["news"].timescale, 90_000);
        assert_eq!(config.channels["sports"].audio, vec!["64k".to_owned()]);

        let server = config.server();
        assert_eq!(server.max_buffer_s, 30.0);
        assert_eq!(server.max_inflight_s, 2.0);
        assert_eq!(server.max_ws_frame_b, 50_000);
        // queue cap follows the frame cap when unset
        assert_eq!(server.max_ws_queue_b, 50_000);
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(
            r#"
            port = 9361
            channel = ["news"]

            [news]
            dir = "media/news"
            timescale = 90000
            video_duration = 180000
            audio_duration = 96000
            video = ["1280x720-23"]
            audio = ["128k"]
            vcodec = "avc1.42e020"
            acodec = "mp4a.40.2"
        "#,
        );
        config.validate().unwrap();

        let server = config.server();
        assert_eq!(server.max_buffer_s, DEFAULT_MAX_BUFFER_S);
        assert_eq!(server.max_inflight_s, DEFAULT_MAX_INFLIGHT_S);
        assert_eq!(server.max_ws_frame_b, DEFAULT_MAX_WS_FRAME_B);
        assert_eq!(server.max_ws_queue_b, DEFAULT_MAX_WS_FRAME_B);
    }

    #[test]
    fn test_listed_channel_without_table_rejected() {
        let config = parse(
            r#"
            port = 9361
            channel = ["news", "missing"]

            [news]
            dir = "media/news"
            timescale = 90000
            video_duration = 180000
            audio_duration = 96000
            video = ["1280x720-23"]
            audio = ["128k"]
            vcodec = "avc1.42e020"
            acodec = "mp4a.40.2"
        "#,
        );
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_tiny_frame_cap_rejected() {
        let mut config = parse(FULL);
        config.max_ws_frame_b = Some(100);
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_empty_channel_list_rejected() {
        let mut config = parse(FULL);
        config.channel.clear();
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
    }
}
