//! Checks that connection lifecycle events are logged.
//!
//! The logger handle is a mutex guard, so each test drives its connection on a
//! current-thread runtime instead of holding the guard across `.await`.

use std::future::Future;

use log::Level;
use rstest::rstest;
use serial_test::serial;
use tickwire::ConnectionState;
use tickwire_testing::{LoggerHandle, logger};

mod common;
use common::{TestResult, connected_pair, eventually};

fn block_on<F: Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(fut)
}

#[rstest]
#[serial]
fn peer_close_is_logged_at_info(mut logger: LoggerHandle) -> TestResult {
    block_on(async {
        let (conn, mut peer) = connected_pair("quiet").await?;
        peer.shutdown().await?;
        eventually(|| conn.state() == ConnectionState::Closed).await
    })?;

    let messages = logger.take_messages(Level::Info);
    assert!(
        messages.iter().any(|m| m.contains("connection established")),
        "{messages:?}"
    );
    assert!(
        messages.iter().any(|m| m.contains("connection closed by peer")),
        "{messages:?}"
    );
    Ok(())
}

#[rstest]
#[serial]
fn framing_failure_is_logged_as_warning(mut logger: LoggerHandle) -> TestResult {
    block_on(async {
        let (mut conn, mut peer) = connected_pair("noisy").await?;
        peer.write_raw(b"-1\r").await?;
        eventually(|| conn.state() == ConnectionState::Failed).await?;
        conn.close().await;
        TestResult::Ok(())
    })?;

    let warnings = logger.take_messages(Level::Warn);
    assert!(
        warnings
            .iter()
            .any(|m| m.contains("connection failed") && m.contains("malformed frame")),
        "{warnings:?}"
    );
    Ok(())
}
