//! Readiness-multiplexed socket loop owned by each connection.
//!
//! The loop always waits for readability and adds write interest only when
//! the outbound queue holds messages at the start of an iteration. Every wait
//! is bounded by the readiness timeout and raced against the shutdown token
//! and the outbound wake-up, so an idle loop still re-evaluates its interest
//! and a close request is observed immediately.
//!
//! The loop never propagates errors to its caller. It records how it ended in
//! the shared connection state and returns.

use std::{io, net::SocketAddr, ops::ControlFlow, time::Duration};

use bytes::BytesMut;
use tokio::{
    io::{AsyncWriteExt, Interest},
    net::TcpStream,
    time::timeout,
};
use tokio_util::{codec::Encoder, sync::CancellationToken};
use tracing::{debug, info, trace, warn};

use crate::{
    codec::{CodecError, DecimalEncoder, DecimalFrameCodec, IncrementalDecoder},
    error::{FailureReason, TransportError},
    frame::Frame,
    metrics::{self, ActiveConnection, Direction},
    queue::LoopQueues,
    state::{ConnectionState, SharedState},
};

/// Settings the loop needs from the connection configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LoopSettings {
    pub(crate) codec: DecimalFrameCodec,
    pub(crate) readiness_timeout: Duration,
    pub(crate) read_chunk_size: usize,
}

pub(crate) struct IoLoop {
    stream: TcpStream,
    peer: Option<SocketAddr>,
    decoder: IncrementalDecoder,
    encoder: DecimalEncoder,
    queues: LoopQueues,
    state: SharedState,
    shutdown: CancellationToken,
    readiness_timeout: Duration,
    read_buf: Vec<u8>,
    write_buf: BytesMut,
    decoded: Vec<Frame>,
}

impl IoLoop {
    pub(crate) fn new(
        stream: TcpStream,
        queues: LoopQueues,
        state: SharedState,
        shutdown: CancellationToken,
        settings: LoopSettings,
    ) -> Self {
        let peer = stream.peer_addr().ok();
        Self {
            stream,
            peer,
            decoder: settings.codec.incremental_decoder(),
            encoder: settings.codec.encoder(),
            queues,
            state,
            shutdown,
            readiness_timeout: settings.readiness_timeout,
            read_buf: vec![0; settings.read_chunk_size],
            write_buf: BytesMut::new(),
            decoded: Vec::new(),
        }
    }

    /// Drive the socket until shutdown, peer close, or failure.
    ///
    /// The socket is dropped when this returns.
    pub(crate) async fn run(mut self) {
        let _active = ActiveConnection::new();
        debug!(peer = ?self.peer, "I/O loop started");
        match self.drive().await {
            Ok(()) => {
                self.state.transition(ConnectionState::Closed);
                info!(peer = ?self.peer, "connection closed locally");
            }
            Err(TransportError::PeerClosed) => {
                self.state.transition(ConnectionState::Closed);
                info!(peer = ?self.peer, "connection closed by peer");
            }
            Err(err) => {
                let kind = match &err {
                    TransportError::Codec(codec) => codec.error_type(),
                    TransportError::Io(_) | TransportError::PeerClosed => "io",
                };
                metrics::inc_errors(kind);
                warn!(peer = ?self.peer, error = %err, "connection failed");
                self.state.fail(FailureReason::from(&err));
            }
        }
    }

    /// Returns `Ok(())` once shutdown is requested or the consumer is gone.
    async fn drive(&mut self) -> Result<(), TransportError> {
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            let want_write = self.queues.has_outbound();
            let interest = if want_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };

            let ready = tokio::select! {
                biased;

                () = self.shutdown.cancelled() => return Ok(()),
                res = timeout(self.readiness_timeout, self.stream.ready(interest)) => match res {
                    Ok(ready) => ready?,
                    Err(_elapsed) => {
                        trace!(want_write, "readiness wait timed out");
                        continue;
                    }
                },
                () = self.queues.outbound_queued(), if !want_write => continue,
            };

            let readable = ready.is_readable() || ready.is_read_closed();
            if readable && self.read_chunk()?.is_break() {
                return Ok(());
            }
            if want_write && ready.is_writable() && self.flush_outbound().await?.is_break() {
                return Ok(());
            }
        }
    }

    /// Read one chunk and deliver every frame it completes.
    ///
    /// A zero-byte read ends the loop with [`TransportError::PeerClosed`] when
    /// the decoder reports a clean close, or with the EOF codec error when the
    /// stream stopped inside a frame.
    fn read_chunk(&mut self) -> Result<ControlFlow<()>, TransportError> {
        let read = match self.stream.try_read(&mut self.read_buf) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(ControlFlow::Continue(()));
            }
            Err(e) => return Err(e.into()),
        };
        if read == 0 {
            let eof = self.decoder.finish();
            if eof.is_clean_close() {
                return Err(TransportError::PeerClosed);
            }
            return Err(eof.into());
        }
        trace!(bytes = read, "read chunk");

        let decoded = self
            .decoder
            .decode_into(&self.read_buf[..read], &mut self.decoded);
        let delivered = self.deliver_decoded();
        decoded?;
        delivered
    }

    /// Move decoded frames onto the inbound queue in arrival order.
    fn deliver_decoded(&mut self) -> Result<ControlFlow<()>, TransportError> {
        if self.decoded.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        let count = self.decoded.len();
        for frame in self.decoded.drain(..) {
            let message = frame.into_message().map_err(CodecError::from)?;
            if self.queues.push_inbound(message).is_err() {
                debug!("inbound consumer dropped; stopping loop");
                return Ok(ControlFlow::Break(()));
            }
        }
        metrics::inc_frames(Direction::Inbound, count);
        debug!(count, "frames received");
        Ok(ControlFlow::Continue(()))
    }

    /// Frame and write the messages queued when the drain starts.
    async fn flush_outbound(&mut self) -> Result<ControlFlow<()>, TransportError> {
        let messages = self.queues.drain_outbound();
        if messages.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        self.write_buf.clear();
        for message in &messages {
            self.encoder.encode(message.as_bytes(), &mut self.write_buf)?;
        }

        tokio::select! {
            biased;

            () = self.shutdown.cancelled() => return Ok(ControlFlow::Break(())),
            res = self.stream.write_all(&self.write_buf) => res?,
        }
        metrics::inc_frames(Direction::Outbound, messages.len());
        debug!(
            count = messages.len(),
            bytes = self.write_buf.len(),
            "frames sent"
        );
        Ok(ControlFlow::Continue(()))
    }
}
