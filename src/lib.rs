#![doc(html_root_url = "https://docs.rs/tickwire/latest")]
//! Public API for the `tickwire` library.
//!
//! This crate provides a length-framed messaging transport over a persistent
//! TCP connection. A background I/O loop reassembles `<length>\r<payload>`
//! frames from the socket while a tick-driven consumer exchanges messages
//! through non-blocking queues.

pub mod codec;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod handler;
mod io_loop;
pub mod metrics;
pub mod queue;
pub mod state;

pub use codec::{CodecError, DecimalFrameCodec, EofError, FramingError};
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use envelope::{Envelope, Registration};
pub use error::{ConnectError, FailureReason, SendError, TransportError};
pub use frame::Frame;
pub use handler::MessageHandler;
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_TOTAL};
pub use state::ConnectionState;
