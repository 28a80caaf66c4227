//! Utilities for exercising [`tickwire`] connections in tests.
//!
//! [`TestPeer`] binds a loopback listener that a [`tickwire::Connection`] can
//! dial, and [`PeerStream`] speaks the framed protocol from the far side so
//! tests can script exactly what the connection sees.
//!
//! ```rust,no_run
//! use tickwire::Connection;
//! use tickwire_testing::TestPeer;
//!
//! # async fn example() -> std::io::Result<()> {
//! let peer = TestPeer::bind().await?;
//! let conn = Connection::connect("127.0.0.1", peer.port(), "probe").await;
//! let mut stream = peer.accept().await?;
//! let registration = stream.read_message().await?;
//! assert!(registration.contains("probe"));
//! # drop(conn);
//! # Ok(())
//! # }
//! ```

pub mod frames;
pub mod logging;
pub mod peer;

pub use frames::{frame, frames, registration};
pub use logging::{LoggerHandle, logger};
pub use peer::{PeerStream, TestPeer};
