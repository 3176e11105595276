//! WebSocket listener
//!
//! Handles the TCP accept loop, allocates connection ids, and spawns one
//! task per connection. Everything a connection learns flows to the
//! scheduler as `CarrierEvent`s.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

use super::config::ServerConfig;
use super::connection::{run_connection, CarrierEvent};

/// The frame carrier: accepts WebSocket connections and feeds the
/// scheduler's event channel
pub struct WsServer {
    config: ServerConfig,
    next_connection_id: AtomicU64,
}

impl WsServer {
    /// Create a server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Run the server
    ///
    /// This method blocks until the listening socket fails.
    pub async fn run(&self, events: mpsc::UnboundedSender<CarrierEvent>) -> Result<()> {
        let listener = self.bind().await?;
        self.accept_loop(&listener, &events).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, events: mpsc::UnboundedSender<CarrierEvent>, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener, &events) => result,
        }
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port));
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            port: self.config.port,
            source,
        })?;
        tracing::info!(%addr, "listening");
        Ok(listener)
    }

    async fn accept_loop(
        &self,
        listener: &TcpListener,
        events: &mpsc::UnboundedSender<CarrierEvent>,
    ) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, events);
                }
                Err(error) => {
                    tracing::error!(%error, "failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        events: &mpsc::UnboundedSender<CarrierEvent>,
    ) {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        if let Err(error) = socket.set_nodelay(true) {
            tracing::debug!(id, %error, "failed to set TCP_NODELAY");
        }

        tracing::debug!(id, peer = %peer_addr, "new connection");

        let events = events.clone();
        tokio::spawn(run_connection(id, socket, peer_addr, events));
    }

    /// The configured listening port
    pub fn port(&self) -> u16 {
        self.config.port
    }
}
