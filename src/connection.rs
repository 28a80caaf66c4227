//! Public connection handle for tick-driven consumers.
//!
//! A [`Connection`] owns one TCP socket through a background I/O loop task.
//! The consumer interacts with it only through synchronous, non-blocking
//! calls: [`Connection::send`] queues a message, [`Connection::poll`] drains
//! whatever has arrived, and [`Connection::state`] reports progress. Only
//! establishment and [`Connection::close`] are asynchronous.

use std::{io, net::SocketAddr};

use tokio::{
    net::{TcpSocket, TcpStream, lookup_host},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    codec::DecimalFrameCodec,
    config::ConnectionConfig,
    envelope::Registration,
    error::{ConnectError, FailureReason, SendError},
    handler::MessageHandler,
    io_loop::{IoLoop, LoopSettings},
    queue::{ConsumerQueues, DuplexQueuePair, OutboundSender},
    state::{ConnectionState, SharedState},
};

/// A registered, framed TCP connection to a peer.
///
/// Dropping the connection cancels its I/O loop without waiting for it; call
/// [`Connection::close`] to wait until the socket is released.
///
/// # Examples
///
/// ```no_run
/// use tickwire::{Connection, ConnectionState};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = Connection::connect("127.0.0.1", 9000, "sensor-1").await?;
/// conn.send(r#"{"type":"message","to":"display","from":"sensor-1","data":1}"#)?;
/// for message in conn.poll() {
///     println!("{message}");
/// }
/// conn.close().await;
/// assert_eq!(conn.state(), ConnectionState::Closed);
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    identifier: String,
    peer: SocketAddr,
    queues: ConsumerQueues,
    state: SharedState,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
    max_frame_length: usize,
}

impl Connection {
    /// Connect to `host:port` with default settings and register as
    /// `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] if resolution, connection, or socket
    /// configuration fails, or if establishment exceeds the connect timeout.
    pub async fn connect(
        host: &str,
        port: u16,
        identifier: impl Into<String>,
    ) -> Result<Self, ConnectError> {
        Self::connect_with_config(host, port, identifier, ConnectionConfig::default()).await
    }

    /// Connect using explicit [`ConnectionConfig`] settings.
    ///
    /// The registration message is queued before the I/O loop starts, so it
    /// is always the first frame the peer receives.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub async fn connect_with_config(
        host: &str,
        port: u16,
        identifier: impl Into<String>,
        config: ConnectionConfig,
    ) -> Result<Self, ConnectError> {
        let identifier = identifier.into();
        let state = SharedState::new(ConnectionState::Disconnected);
        state.transition(ConnectionState::Connecting);
        debug!(host, port, identifier = %identifier, "connecting");

        let limit = config.connect_timeout_value();
        let stream = timeout(limit, establish(host, port, config.nodelay_value()))
            .await
            .map_err(|_elapsed| ConnectError::Timeout {
                host: host.to_owned(),
                port,
                timeout: limit,
            })??;
        let peer = stream.peer_addr().map_err(ConnectError::Socket)?;

        let (queues, loop_queues) = DuplexQueuePair::new();
        let registration = Registration::new(identifier.as_str()).to_json()?;
        queues
            .outbound
            .enqueue(registration)
            .map_err(|_| ConnectError::Socket(io::ErrorKind::BrokenPipe.into()))?;

        let codec = DecimalFrameCodec::new(config.max_frame_length_value());
        let settings = LoopSettings {
            codec,
            readiness_timeout: config.readiness_timeout_value(),
            read_chunk_size: config.read_chunk_size_value(),
        };
        let shutdown = CancellationToken::new();
        let io_loop = IoLoop::new(stream, loop_queues, state.clone(), shutdown.clone(), settings);
        state.transition(ConnectionState::Connected);
        let task = tokio::spawn(io_loop.run());
        info!(%peer, identifier = %identifier, "connection established");

        Ok(Self {
            identifier,
            peer,
            queues,
            state,
            shutdown,
            task: Some(task),
            max_frame_length: codec.max_frame_length(),
        })
    }

    /// Queue `message` for transmission.
    ///
    /// Never blocks. Messages are written in the order they were queued.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] or [`SendError::Failed`] once the
    /// connection has stopped, and [`SendError::Oversized`] if the message
    /// exceeds the maximum frame length.
    pub fn send(&self, message: impl Into<String>) -> Result<(), SendError> {
        if let Some(err) = SendError::for_state(self.state.get()) {
            return Err(err);
        }
        let message = message.into();
        if message.len() > self.max_frame_length {
            return Err(SendError::Oversized {
                size: message.len(),
                max: self.max_frame_length,
            });
        }
        self.queues
            .outbound
            .enqueue(message)
            .map_err(|_| SendError::for_state(self.state.get()).unwrap_or(SendError::Closed))
    }

    /// Drain every message received so far, oldest first.
    ///
    /// Never blocks and returns an empty vector when nothing is pending.
    /// Messages received before the connection closed or failed are still
    /// returned.
    pub fn poll(&mut self) -> Vec<String> { self.queues.inbound.dequeue_all() }

    /// Number of received messages waiting for [`Connection::poll`].
    #[must_use]
    pub fn pending(&self) -> usize { self.queues.inbound.len() }

    /// Drain pending messages through `handler`, queueing any replies.
    ///
    /// Every drained message reaches the handler even if a reply cannot be
    /// queued. Returns the number of messages handled.
    ///
    /// # Errors
    ///
    /// Returns the first [`SendError`] raised while queueing a reply.
    pub fn dispatch<H>(&mut self, handler: &mut H) -> Result<usize, SendError>
    where
        H: MessageHandler + ?Sized,
    {
        let messages = self.poll();
        let mut first_error = None;
        for message in &messages {
            let Some(reply) = handler.on_message(message) else {
                continue;
            };
            if let Err(err) = self.send(reply) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(messages.len()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { self.state.get() }

    /// Why the I/O loop stopped, if it failed.
    #[must_use]
    pub fn failure(&self) -> Option<FailureReason> { self.state.failure() }

    /// Identifier announced during registration.
    #[must_use]
    pub fn identifier(&self) -> &str { &self.identifier }

    /// Address of the connected peer.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr { self.peer }

    /// Additional producer handle for the outbound queue.
    ///
    /// Handles bypass the state and size checks made by [`Connection::send`];
    /// enqueueing fails once the I/O loop has stopped.
    #[must_use]
    pub fn sender(&self) -> OutboundSender { self.queues.outbound.clone() }

    /// Stop the I/O loop and wait for it to release the socket.
    ///
    /// Unsent outbound messages are discarded. A connection that already
    /// failed keeps its `Failed` state; otherwise the state becomes `Closed`.
    /// Calling `close` again does nothing.
    pub async fn close(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        debug!(peer = %self.peer, "closing connection");
        self.shutdown.cancel();
        if let Err(err) = task.await {
            warn!(peer = %self.peer, error = %err, "I/O loop task ended abnormally");
            self.state.fail(FailureReason::Io {
                kind: io::ErrorKind::Other,
                message: err.to_string(),
            });
        }
        self.state.transition(ConnectionState::Closed);
    }
}

impl Drop for Connection {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

/// Resolve `host` and connect to the first address that accepts.
async fn establish(host: &str, port: u16, nodelay: bool) -> Result<TcpStream, ConnectError> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|source| ConnectError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .collect();

    let mut addrs = addrs.into_iter();
    let Some(first) = addrs.next() else {
        return Err(ConnectError::NoAddresses {
            host: host.to_owned(),
            port,
        });
    };
    let mut result = connect_addr(first, nodelay).await;
    for addr in addrs {
        if result.is_ok() {
            break;
        }
        if let Err(err) = &result {
            debug!(error = %err, next = %addr, "connection attempt failed; trying next address");
        }
        result = connect_addr(addr, nodelay).await;
    }
    result
}

async fn connect_addr(addr: SocketAddr, nodelay: bool) -> Result<TcpStream, ConnectError> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(ConnectError::Socket)?;
    socket.set_nodelay(nodelay).map_err(ConnectError::Socket)?;
    socket
        .connect(addr)
        .await
        .map_err(|source| ConnectError::Connect { addr, source })
}
