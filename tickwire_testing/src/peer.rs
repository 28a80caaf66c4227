//! Scripted far end of a framed connection.

use std::{
    collections::VecDeque,
    io,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use tickwire::{DecimalFrameCodec, codec::IncrementalDecoder};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

/// Upper bound on any single wait performed by the peer.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback listener a connection under test dials.
pub struct TestPeer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TestPeer {
    /// Bind to an unused port on `127.0.0.1`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while binding.
    pub async fn bind() -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Port the listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 { self.addr.port() }

    /// Accept the next connection.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::TimedOut`] if nothing connects within
    /// [`PEER_TIMEOUT`], or any accept error.
    pub async fn accept(&self) -> io::Result<PeerStream> {
        let (stream, _) = timeout(PEER_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;
        Ok(PeerStream::new(stream))
    }
}

/// Accepted socket that reads and writes frames.
pub struct PeerStream {
    stream: TcpStream,
    decoder: IncrementalDecoder,
    pending: VecDeque<String>,
    buf: Vec<u8>,
}

impl PeerStream {
    /// Wrap an accepted stream.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: DecimalFrameCodec::default().incremental_decoder(),
            pending: VecDeque::new(),
            buf: vec![0; 4096],
        }
    }

    /// Read the next framed message sent by the connection.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::TimedOut`] if no complete frame arrives within
    /// [`PEER_TIMEOUT`], [`io::ErrorKind::UnexpectedEof`] if the connection
    /// closes first, and [`io::ErrorKind::InvalidData`] for malformed input.
    pub async fn read_message(&mut self) -> io::Result<String> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(message);
            }
            let read = timeout(PEER_TIMEOUT, self.stream.read(&mut self.buf))
                .await
                .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))??;
            if read == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            for frame in self.decoder.decode(&self.buf[..read])? {
                let message = frame
                    .into_message()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                self.pending.push_back(message);
            }
        }
    }

    /// Read `count` messages in arrival order.
    ///
    /// # Errors
    ///
    /// See [`PeerStream::read_message`].
    pub async fn read_messages(&mut self, count: usize) -> io::Result<Vec<String>> {
        let mut messages = Vec::with_capacity(count);
        for _ in 0..count {
            messages.push(self.read_message().await?);
        }
        Ok(messages)
    }

    /// Wait until the connection closes its end of the socket.
    ///
    /// Bytes arriving before the close are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::TimedOut`] if the socket stays open for
    /// [`PEER_TIMEOUT`].
    pub async fn expect_closed(&mut self) -> io::Result<()> {
        loop {
            let read = timeout(PEER_TIMEOUT, self.stream.read(&mut self.buf))
                .await
                .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))?;
            match read {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Frame and write one message.
    ///
    /// # Errors
    ///
    /// Returns any write error.
    pub async fn send_message(&mut self, message: &str) -> io::Result<()> {
        self.write_raw(&crate::frame(message)).await
    }

    /// Write bytes exactly as given.
    ///
    /// # Errors
    ///
    /// Returns any write error.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    /// Close the write half so the connection observes end of stream.
    ///
    /// # Errors
    ///
    /// Returns any shutdown error.
    pub async fn shutdown(&mut self) -> io::Result<()> { self.stream.shutdown().await }
}
