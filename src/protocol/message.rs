//! Control and media message types
//!
//! Inbound messages are plain JSON objects tagged by `type`; outbound
//! headers use the same tagging and travel inside the frame layout of
//! [`super::wire`].

use serde::{Deserialize, Serialize};

use crate::catalog::MediaKind;

use super::error::ProtocolError;

/// Subscription request
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInit {
    /// Requested channel; absent means the first catalog entry
    #[serde(default)]
    pub channel: Option<String>,
}

/// Periodic playback telemetry
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Echo of the `server-init` token this report belongs to
    pub init_id: u32,
    /// Seconds of video buffered on the client
    pub video_buffer_len: f64,
    /// Seconds of audio buffered on the client
    pub audio_buffer_len: f64,
    /// Video timestamp the client will play next
    pub next_video_timestamp: u64,
    /// Audio timestamp the client will play next
    pub next_audio_timestamp: u64,
}

/// Any message a client may send
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "client-init")]
    Init(ClientInit),
    #[serde(rename = "client-info")]
    Info(ClientInfo),
}

/// Parse an inbound message
pub fn parse_client_message(payload: &[u8]) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_slice(payload).map_err(ProtocolError::Malformed)
}

/// Channel listing sent once per connection
#[derive(Debug, Serialize)]
pub struct ServerHello<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channels: &'a [String],
}

impl<'a> ServerHello<'a> {
    pub fn new(channels: &'a [String]) -> Self {
        Self {
            kind: "server-hello",
            channels,
        }
    }
}

/// Subscription reply carrying decoder setup and the session seed
#[derive(Debug, Serialize)]
pub struct ServerInit<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: &'a str,
    vcodec: &'a str,
    acodec: &'a str,
    timescale: u64,
    init_vts: u64,
    init_id: u32,
}

impl<'a> ServerInit<'a> {
    pub fn new(
        channel: &'a str,
        vcodec: &'a str,
        acodec: &'a str,
        timescale: u64,
        init_vts: u64,
        init_id: u32,
    ) -> Self {
        Self {
            kind: "server-init",
            channel,
            vcodec,
            acodec,
            timescale,
            init_vts,
            init_id,
        }
    }
}

/// Header preceding one chunk of a media segment
///
/// `offset` is the chunk's byte position and `length` the total byte
/// length, both over the `init ‖ payload` concatenation of the segment.
#[derive(Debug, Serialize)]
pub struct MediaHeader<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    format: &'a str,
    ts: u64,
    duration: u64,
    offset: u64,
    length: u64,
}

impl<'a> MediaHeader<'a> {
    pub fn new(
        kind: MediaKind,
        format: &'a str,
        ts: u64,
        duration: u64,
        offset: u64,
        length: u64,
    ) -> Self {
        Self {
            kind: kind.as_str(),
            format,
            ts,
            duration,
            offset,
            length,
        }
    }
}
