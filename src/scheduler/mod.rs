//! Streaming scheduler
//!
//! The core of the server: a single task that owns every client session
//! and decides, on a 10 ms tick, what each connection receives next.
//!
//! # Architecture
//!
//! ```text
//!   [connection tasks]                [media watcher]
//!        │  CarrierEvent                    │ inserts
//!        ▼                                  ▼
//!   ┌─────────────────────────┐      Arc<ChannelCatalog>
//!   │ Scheduler task          │             ▲
//!   │   select! {             │             │ ready()/data()
//!   │     event ──► handlers  │─────────────┘
//!   │     tick  ──► serve all │
//!   │   }                     │──► FrameSink::queue_frame ──► sockets
//!   └─────────────────────────┘
//! ```
//!
//! Carrier events and ticks are processed one at a time on this task, so
//! handlers never observe each other mid-mutation. Per tick and per
//! client, at most one frame is emitted per lane; the lane that is behind
//! in media time goes first, and every send is gated on the client's
//! reported playback buffer, the unacknowledged in-flight window, and the
//! carrier's outbound queue for that connection.

pub mod quality;

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::catalog::{Channel, ChannelCatalog, MediaKind};
use crate::error::Result;
use crate::protocol::{
    self, ClientInit, ClientMessage, MediaHeader, ProtocolError, ServerHello, ServerInit,
};
use crate::server::config::ServerConfig;
use crate::server::connection::{CarrierEvent, ConnectionMap};
use crate::session::{ClientRegistry, ClientSession, LaneState, SegmentSender};

pub use quality::{QualitySelector, RandomSelector};

/// Cadence of the streaming tick
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Outbound frame interface the scheduler drives
///
/// Implemented by the live connection map and by in-memory recorders in
/// tests. `queue_frame` must not block; `queue_size` reports bytes
/// accepted but not yet written to the socket.
pub trait FrameSink {
    fn queue_frame(&mut self, id: u64, frame: Bytes);
    fn queue_size(&self, id: u64) -> usize;
    fn close(&mut self, id: u64);
}

/// Send caps applied per client and per lane
#[derive(Debug, Clone, Copy)]
pub struct StreamLimits {
    /// Client-reported buffer above which a lane is paused, seconds
    pub max_buffer_s: f64,
    /// Unacknowledged media above which a lane is paused, seconds
    pub max_inflight_s: f64,
    /// Frame size cap, header included, bytes
    pub max_frame_bytes: usize,
    /// Per-connection outbound queue cap, bytes
    pub max_queue_bytes: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            max_buffer_s: 60.0,
            max_inflight_s: 5.0,
            max_frame_bytes: 100_000,
            max_queue_bytes: 100_000,
        }
    }
}

impl From<&ServerConfig> for StreamLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_buffer_s: config.max_buffer_s,
            max_inflight_s: config.max_inflight_s,
            max_frame_bytes: config.max_ws_frame_b,
            max_queue_bytes: config.max_ws_queue_b,
        }
    }
}

/// The per-client streaming scheduler
pub struct Scheduler<S: FrameSink> {
    catalog: Arc<ChannelCatalog>,
    clients: ClientRegistry,
    sink: S,
    selector: Box<dyn QualitySelector>,
    limits: StreamLimits,
}

impl<S: FrameSink> Scheduler<S> {
    pub fn new(
        catalog: Arc<ChannelCatalog>,
        sink: S,
        selector: Box<dyn QualitySelector>,
        limits: StreamLimits,
    ) -> Self {
        Self {
            catalog,
            clients: ClientRegistry::new(),
            sink,
            selector,
            limits,
        }
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn clients_mut(&mut self) -> &mut ClientRegistry {
        &mut self.clients
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Carrier open: greet the connection and register a session
    ///
    /// A duplicate connection id is a carrier bug and aborts the server.
    pub fn handle_open(&mut self, id: u64) -> Result<()> {
        tracing::info!(id, "client connected");

        let hello = protocol::encode_frame(&ServerHello::new(self.catalog.names()), &[])?;
        self.sink.queue_frame(id, hello);
        self.clients.insert(ClientSession::new(id))?;
        Ok(())
    }

    /// Carrier close: release the session and its in-progress segments
    pub fn handle_close(&mut self, id: u64) {
        if let Some(client) = self.clients.remove(id) {
            let stats = client.stats();
            tracing::debug!(
                id,
                frames = stats.frames_queued,
                bytes = stats.bytes_queued,
                video_segments = stats.video_segments,
                audio_segments = stats.audio_segments,
                "client disconnected"
            );
        }
        self.sink.close(id);
    }

    /// Carrier message: demultiplex a control message
    ///
    /// A protocol error drops the offending client and nobody else.
    pub fn handle_message(&mut self, id: u64, payload: &[u8]) {
        if self.clients.get(id).is_none() {
            tracing::debug!(id, "message from unknown connection");
            return;
        }
        if let Err(error) = self.process_message(id, payload) {
            tracing::debug!(id, %error, "bad client message, dropping client");
            self.clients.remove(id);
            self.sink.close(id);
        }
    }

    fn process_message(&mut self, id: u64, payload: &[u8]) -> std::result::Result<(), ProtocolError> {
        match protocol::parse_client_message(payload)? {
            ClientMessage::Init(init) => self.handle_init(id, init),
            ClientMessage::Info(info) => {
                if let Some(client) = self.clients.get_mut(id) {
                    if !client.apply_info(&info) {
                        tracing::trace!(id, init_id = info.init_id, "stale client-info dropped");
                    }
                }
                Ok(())
            }
        }
    }

    /// Bind the client to a channel and seed it at the live edge
    fn handle_init(&mut self, id: u64, init: ClientInit) -> std::result::Result<(), ProtocolError> {
        let channel = self.catalog.resolve(init.channel.as_deref()).ok_or_else(|| {
            ProtocolError::UnknownChannel(init.channel.clone().unwrap_or_else(|| "<first>".into()))
        })?;

        let init_vts = channel
            .init_vts()
            .ok_or_else(|| ProtocolError::ChannelUnavailable(channel.name().to_owned()))?;
        let init_ats = channel.find_ats(init_vts);

        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        client.init(channel.name(), init_vts, init_ats);

        let reply = ServerInit::new(
            channel.name(),
            channel.video().codec(),
            channel.audio().codec(),
            channel.timescale(),
            init_vts,
            client.init_id(),
        );
        let frame = protocol::encode_frame(&reply, &[])?;
        self.sink.queue_frame(id, frame);

        tracing::info!(id, channel = %channel.name(), init_vts, "client subscribed");
        Ok(())
    }

    /// One streaming tick: serve every bound client once
    pub fn tick(&mut self) {
        for id in self.clients.ids() {
            self.serve_client(id);
        }
    }

    /// Decide what one client receives this tick
    ///
    /// The lane that is behind in media time goes first; the other lane is
    /// served in the same tick only if it is eligible and the connection
    /// queue is still under the cap after the first send.
    fn serve_client(&mut self, id: u64) {
        let catalog = Arc::clone(&self.catalog);
        let Some(client) = self.clients.get(id) else {
            return;
        };
        let Some(channel) = client.channel().and_then(|name| catalog.get(name)) else {
            return;
        };

        if self.sink.queue_size(id) >= self.limits.max_queue_bytes {
            return;
        }

        let timescale = channel.timescale();
        let can_video = lane_eligible(client.lane(MediaKind::Video), timescale, &self.limits);
        let can_audio = lane_eligible(client.lane(MediaKind::Audio), timescale, &self.limits);
        let (Some(next_vts), Some(next_ats)) = (
            client.lane(MediaKind::Video).next_ts,
            client.lane(MediaKind::Audio).next_ts,
        ) else {
            return;
        };

        // Audio first iff it is behind video in media time
        let order = if next_vts > next_ats {
            [(MediaKind::Audio, can_audio), (MediaKind::Video, can_video)]
        } else {
            [(MediaKind::Video, can_video), (MediaKind::Audio, can_audio)]
        };

        for (index, (kind, eligible)) in order.into_iter().enumerate() {
            if !eligible {
                continue;
            }
            if index > 0 && self.sink.queue_size(id) >= self.limits.max_queue_bytes {
                break;
            }
            let Some(client) = self.clients.get_mut(id) else {
                return;
            };
            Self::serve_lane(
                &mut self.sink,
                self.selector.as_ref(),
                self.limits.max_frame_bytes,
                client,
                channel,
                kind,
            );
        }
    }

    /// Emit at most one frame of the lane's current segment
    ///
    /// Starts a new segment when none is in progress: defers if the
    /// channel is not ready at the lane's timestamp, otherwise selects a
    /// quality and attaches init data iff the quality changed. The lane's
    /// cursor and current quality advance only when the segment completes.
    fn serve_lane(
        sink: &mut S,
        selector: &dyn QualitySelector,
        max_frame_bytes: usize,
        client: &mut ClientSession,
        channel: &Channel,
        kind: MediaKind,
    ) {
        let id = client.connection_id();
        let track = channel.track(kind);
        let lane = client.lane_mut(kind);
        let Some(ts) = lane.next_ts else {
            return;
        };

        if lane.in_progress.is_none() {
            if !track.ready(ts) {
                return;
            }
            let Some(format) = selector.select(lane, track, ts) else {
                return;
            };
            let Some(payload) = track.data(&format, ts) else {
                return;
            };
            let init = match &lane.curr_format {
                Some(curr) if *curr == format => None,
                _ => track.init(&format),
            };
            tracing::debug!(id, kind = %kind, ts, format = %format, "serving segment");
            lane.in_progress = Some(SegmentSender::new(format, payload, init));
        } else {
            tracing::trace!(id, kind = %kind, ts, "continuing segment");
        }

        let Some(segment) = lane.in_progress.as_mut() else {
            return;
        };
        let header = MediaHeader::new(
            kind,
            segment.format().as_str(),
            ts,
            track.duration(),
            segment.offset() as u64,
            segment.length() as u64,
        );
        let prelude = match protocol::encode_prelude(&header) {
            Ok(prelude) => prelude,
            Err(error) => {
                tracing::error!(id, %error, "failed to encode media header");
                return;
            }
        };

        let budget = max_frame_bytes.saturating_sub(prelude.len());
        let chunk = segment.read(budget);
        let finished = segment.done();
        let completed_format = finished.then(|| segment.format().clone());

        let mut frame = BytesMut::with_capacity(prelude.len() + chunk.len());
        frame.extend_from_slice(&prelude);
        frame.extend_from_slice(&chunk);
        let frame = frame.freeze();
        let frame_len = frame.len();

        sink.queue_frame(id, frame);

        if finished {
            tracing::trace!(id, kind = %kind, ts, "segment complete");
            lane.next_ts = Some(ts + track.duration());
            lane.curr_format = completed_format;
            lane.in_progress = None;
        }

        let stats = client.stats_mut();
        stats.record_frame(frame_len);
        if finished {
            stats.record_segment(kind);
        }
    }
}

impl Scheduler<ConnectionMap> {
    /// Run the event loop until the carrier goes away
    ///
    /// Carrier events and ticks are strictly serialized here. Closure of
    /// the event channel means the listener and every connection are gone;
    /// it is treated as a clean shutdown.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<CarrierEvent>) -> Result<()> {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(CarrierEvent::Open { id, handle }) => {
                        self.sink.insert(id, handle);
                        self.handle_open(id)?;
                    }
                    Some(CarrierEvent::Message { id, payload }) => {
                        tracing::trace!(id, len = payload.len(), "client message");
                        self.handle_message(id, &payload);
                    }
                    Some(CarrierEvent::Close { id }) => self.handle_close(id),
                    None => {
                        tracing::info!("carrier event channel closed, stopping scheduler");
                        return Ok(());
                    }
                },
                _ = ticker.tick() => self.tick(),
            }
        }
    }
}

/// Whether a lane may receive another segment this tick
///
/// `in_flight` is the media time between what the server has pushed and
/// what the client reports it will play next; together with the reported
/// buffer it bounds committed future playback.
fn lane_eligible(lane: &LaneState, timescale: u64, limits: &StreamLimits) -> bool {
    let (Some(next_ts), Some(client_next_ts)) = (lane.next_ts, lane.client_next_ts) else {
        return false;
    };
    let in_flight = next_ts.saturating_sub(client_next_ts) as f64 / timescale as f64;
    lane.playback_buf < limits.max_buffer_s && in_flight < limits.max_inflight_s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(next_ts: u64, client_next_ts: u64, playback_buf: f64) -> LaneState {
        LaneState {
            next_ts: Some(next_ts),
            client_next_ts: Some(client_next_ts),
            playback_buf,
            ..LaneState::default()
        }
    }

    #[test]
    fn test_unseeded_lane_is_ineligible() {
        assert!(!lane_eligible(
            &LaneState::default(),
            90_000,
            &StreamLimits::default()
        ));
    }

    #[test]
    fn test_buffer_cap_blocks() {
        let limits = StreamLimits::default();

        assert!(lane_eligible(&lane(0, 0, 59.9), 90_000, &limits));
        assert!(!lane_eligible(&lane(0, 0, 60.0), 90_000, &limits));
    }

    #[test]
    fn test_inflight_cap_blocks() {
        let limits = StreamLimits::default();

        // 4 seconds in flight at timescale 90_000
        assert!(lane_eligible(&lane(360_000, 0, 0.0), 90_000, &limits));
        // 5 seconds in flight
        assert!(!lane_eligible(&lane(450_000, 0, 0.0), 90_000, &limits));
        // client ahead of the server saturates to zero
        assert!(lane_eligible(&lane(0, 450_000, 0.0), 90_000, &limits));
    }
}
