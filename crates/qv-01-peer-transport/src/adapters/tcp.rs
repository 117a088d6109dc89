//! TCP implementation of the [`Transport`] port.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::connection::{spawn_read_loop, stopped};
use super::peer::Peer;
use crate::domain::{
    FrameLimits, Rpc, TransportError, DEFAULT_IO_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE,
    DEFAULT_STREAM_TIMEOUT,
};
use crate::ports::{PeerHandler, Transport};

/// Configuration for [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    /// Address to listen on, e.g. `127.0.0.1:3000` (port 0 picks a free port).
    pub listen_addr: String,
    /// Largest accepted control message body.
    pub max_message_size: usize,
    /// Window in which an announced stream must be opened or make progress.
    pub stream_timeout: Duration,
    /// Longest a single read or write inside a unit may stall.
    pub io_timeout: Duration,
    /// Timeout for establishing outbound connections.
    pub dial_timeout: Duration,
    /// Capacity of the inbound control message channel.
    pub inbound_buffer: usize,
}

impl TcpTransportConfig {
    /// Default configuration listening on `listen_addr`.
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            ..Self::default()
        }
    }

    fn limits(&self) -> FrameLimits {
        FrameLimits {
            max_message_size: self.max_message_size,
            stream_timeout: self.stream_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            dial_timeout: Duration::from_secs(5),
            inbound_buffer: 1024,
        }
    }
}

/// Peer transport over TCP.
pub struct TcpTransport {
    config: TcpTransportConfig,
    handler: Arc<dyn PeerHandler>,
    inbound_tx: mpsc::Sender<Rpc>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Rpc>>>,
    bound_addr: RwLock<Option<String>>,
    shutdown: watch::Sender<bool>,
}

impl TcpTransport {
    /// Create a transport. Nothing is bound until
    /// [`Transport::listen_and_accept`] is called.
    pub fn new(config: TcpTransportConfig, handler: Arc<dyn PeerHandler>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_buffer.max(1));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            handler,
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            bound_addr: RwLock::new(None),
            shutdown,
        }
    }

    /// Transport configuration.
    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Wrap an established stream, hand it to the handler, start its read loop.
    fn attach(
        stream: TcpStream,
        outbound: bool,
        limits: FrameLimits,
        handler: &Arc<dyn PeerHandler>,
        inbound: &mpsc::Sender<Rpc>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Arc<Peer>, TransportError> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("[qv-01] Failed to set TCP_NODELAY: {}", e);
        }

        let remote = stream.peer_addr()?.to_string();
        let local = stream.local_addr()?.to_string();
        let (reader, writer) = stream.into_split();
        let peer = Arc::new(Peer::new(remote, local, outbound, reader, writer, limits));

        handler.on_peer_connected(Arc::clone(&peer))?;
        spawn_read_loop(
            Arc::clone(&peer),
            inbound.clone(),
            limits,
            Arc::clone(handler),
            shutdown,
        );

        Ok(peer)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn local_addr(&self) -> String {
        self.bound_addr
            .read()
            .clone()
            .unwrap_or_else(|| self.config.listen_addr.clone())
    }

    async fn listen_and_accept(&self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| TransportError::BindFailed {
                addr: self.config.listen_addr.clone(),
                reason: e.to_string(),
            })?;

        let bound = listener.local_addr()?.to_string();
        *self.bound_addr.write() = Some(bound.clone());
        info!("[qv-01] 🔌 Listening on {}", bound);

        let limits = self.config.limits();
        let handler = Arc::clone(&self.handler);
        let inbound = self.inbound_tx.clone();
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    accepted = listener.accept() => accepted,
                    _ = stopped(&mut shutdown) => break,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        debug!("[qv-01] Accepted connection from {}", addr);
                        if let Err(e) = Self::attach(
                            stream,
                            false,
                            limits,
                            &handler,
                            &inbound,
                            shutdown.clone(),
                        ) {
                            warn!(peer = %addr, error = %e, "[qv-01] Inbound peer rejected");
                        }
                    }
                    Err(e) => {
                        error!("[qv-01] Accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
            info!("[qv-01] Listener on {} stopped", bound);
        });

        Ok(())
    }

    async fn dial(&self, addr: &str) -> Result<(), TransportError> {
        if self.is_shut_down() {
            return Err(TransportError::ConnectionClosed(addr.to_string()));
        }

        let stream = tokio::time::timeout(self.config.dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::DialFailed {
                addr: addr.to_string(),
                reason: format!("timed out after {:?}", self.config.dial_timeout),
            })?
            .map_err(|e| TransportError::DialFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;

        let peer = Self::attach(
            stream,
            true,
            self.config.limits(),
            &self.handler,
            &self.inbound_tx,
            self.shutdown.subscribe(),
        )?;

        info!("[qv-01] 🤝 Connected to {}", peer.remote_addr());
        Ok(())
    }

    fn consume(&self) -> Result<mpsc::Receiver<Rpc>, TransportError> {
        self.inbound_rx
            .lock()
            .take()
            .ok_or(TransportError::AlreadyConsumed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.shutdown.send_replace(true) {
            return Ok(());
        }
        info!("[qv-01] Transport on {} shutting down", self.local_addr());
        Ok(())
    }
}
