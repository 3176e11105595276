//! Per-connection plumbing
//!
//! One WebSocket connection is three pieces: a reader driving inbound
//! messages into the scheduler's event channel, a writer draining the
//! outbound frame queue onto the socket, and a `ConnectionHandle` the
//! scheduler holds to enqueue frames and observe the queue depth.
//!
//! Queue accounting: `queue_frame` adds the frame length to an atomic
//! counter before handing the frame to the writer; the writer subtracts
//! after the socket write completes. The counter is the backpressure
//! ground truth the scheduler checks every tick.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::scheduler::FrameSink;

/// Event delivered from the carrier to the scheduler task
#[derive(Debug)]
pub enum CarrierEvent {
    /// A connection completed the WebSocket handshake
    Open { id: u64, handle: ConnectionHandle },
    /// A text or binary message arrived
    Message { id: u64, payload: Bytes },
    /// The connection is gone; no further events follow for this id
    Close { id: u64 },
}

/// Scheduler-side handle to one connection's outbound queue
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    frames: mpsc::UnboundedSender<Bytes>,
    queued: Arc<AtomicUsize>,
}

impl ConnectionHandle {
    /// Enqueue a binary frame; never blocks
    pub fn queue_frame(&self, frame: Bytes) {
        let len = frame.len();
        self.queued.fetch_add(len, Ordering::Relaxed);
        if self.frames.send(frame).is_err() {
            // writer already gone; undo so the counter stays consistent
            self.queued.fetch_sub(len, Ordering::Relaxed);
        }
    }

    /// Bytes accepted but not yet written to the socket
    pub fn queue_size(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }
}

/// The scheduler's view of all live connections
#[derive(Debug, Default)]
pub struct ConnectionMap {
    connections: HashMap<u64, ConnectionHandle>,
}

impl ConnectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's handle on carrier open
    pub fn insert(&mut self, id: u64, handle: ConnectionHandle) {
        self.connections.insert(id, handle);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl FrameSink for ConnectionMap {
    fn queue_frame(&mut self, id: u64, frame: Bytes) {
        if let Some(handle) = self.connections.get(&id) {
            handle.queue_frame(frame);
        }
    }

    fn queue_size(&self, id: u64) -> usize {
        // A missing connection reports a full queue so nothing is built
        // for it.
        self.connections
            .get(&id)
            .map_or(usize::MAX, ConnectionHandle::queue_size)
    }

    fn close(&mut self, id: u64) {
        self.connections.remove(&id);
    }
}

/// Drive one accepted TCP connection for its whole life
///
/// Emits exactly one `Open` (on handshake success) and one `Close`; after
/// `Close` no further events carry this id.
pub(crate) async fn run_connection(
    id: u64,
    stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::UnboundedSender<CarrierEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(error) => {
            tracing::debug!(id, peer = %peer_addr, %error, "websocket handshake failed");
            return;
        }
    };
    let (mut socket_out, mut socket_in) = ws.split();

    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<Bytes>();
    let queued = Arc::new(AtomicUsize::new(0));
    let handle = ConnectionHandle {
        frames: frames_tx,
        queued: Arc::clone(&queued),
    };

    if events.send(CarrierEvent::Open { id, handle }).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(frame) = frames_rx.recv().await {
            let len = frame.len();
            let result = socket_out.send(Message::Binary(frame)).await;
            queued.fetch_sub(len, Ordering::Relaxed);
            if let Err(error) = result {
                tracing::debug!(id, %error, "write failed");
                break;
            }
        }
    });

    while let Some(message) = socket_in.next().await {
        match message {
            Ok(Message::Binary(payload)) => {
                if events.send(CarrierEvent::Message { id, payload }).is_err() {
                    break;
                }
            }
            Ok(Message::Text(text)) => {
                let payload = Bytes::copy_from_slice(text.as_bytes());
                if events.send(CarrierEvent::Message { id, payload }).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(id, %error, "read failed");
                break;
            }
        }
    }

    let _ = events.send(CarrierEvent::Close { id });
    writer.abort();
}
