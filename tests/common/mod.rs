//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{error::Error, future::Future, time::Duration};

use tickwire::{Connection, ConnectionConfig};
use tickwire_testing::{PeerStream, TestPeer};
use tokio::time::{sleep, timeout};

/// Result type used by fallible tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error + Send + Sync>>;

/// Bound on every wait in integration tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Configuration that keeps idle loops responsive in tests.
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::default().readiness_timeout(Duration::from_millis(50))
}

/// Connect `identifier` to a fresh peer and accept the far end.
pub async fn connected_pair(identifier: &str) -> TestResult<(Connection, PeerStream)> {
    let peer = TestPeer::bind().await?;
    let (conn, stream) = tokio::join!(
        Connection::connect_with_config("127.0.0.1", peer.port(), identifier, test_config()),
        peer.accept(),
    );
    Ok((conn?, stream?))
}

/// Poll `check` until it returns `true` or [`WAIT`] elapses.
pub async fn eventually<F>(mut check: F) -> TestResult
where
    F: FnMut() -> bool,
{
    timeout(WAIT, async {
        while !check() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

/// Poll `conn` until `count` messages have arrived, returning them in order.
pub async fn poll_until(conn: &mut Connection, count: usize) -> TestResult<Vec<String>> {
    let mut received = Vec::new();
    timeout(WAIT, async {
        while received.len() < count {
            received.extend(conn.poll());
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(received)
}

/// Run `fut` with the shared test timeout.
pub async fn bounded<F: Future>(fut: F) -> TestResult<F::Output> { Ok(timeout(WAIT, fut).await?) }
