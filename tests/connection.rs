//! End-to-end tests for [`tickwire::Connection`] against a scripted peer.

use std::net::{Ipv4Addr, TcpListener as StdTcpListener};

use rstest::rstest;
use tickwire::{
    ConnectError,
    Connection,
    ConnectionConfig,
    ConnectionState,
    FailureReason,
    SendError,
};
use tickwire_testing::{frames, registration};
use tokio::{io::AsyncReadExt, net::TcpListener};

mod common;
use common::{TestResult, bounded, connected_pair, eventually, poll_until, test_config};

#[tokio::test]
async fn registration_is_the_first_frame() -> TestResult {
    let (mut conn, mut peer) = connected_pair("unity-01").await?;
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(conn.identifier(), "unity-01");
    assert_eq!(
        peer.read_message().await?,
        r#"{"type":"registration","value":"unity-01"}"#
    );
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn registration_escapes_the_identifier() -> TestResult {
    let (mut conn, mut peer) = connected_pair("say \"hi\"\n").await?;
    let text = peer.read_message().await?;
    assert_eq!(text, registration("say \"hi\"\n"));
    assert!(text.contains(r#"say \"hi\"\n"#));
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn sends_reach_the_wire_framed_and_in_order() -> TestResult {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let port = listener.local_addr()?.port();
    let (conn, accepted) = tokio::join!(
        Connection::connect_with_config("127.0.0.1", port, "probe", test_config()),
        listener.accept(),
    );
    let mut conn = conn?;
    let (mut stream, _) = accepted?;

    conn.send("x")?;
    conn.send("y")?;

    let reg = registration("probe");
    let expected = frames(&[&reg, "x", "y"]);
    let mut wire = vec![0; expected.len()];
    bounded(stream.read_exact(&mut wire)).await??;
    assert_eq!(wire, expected);
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn poll_returns_messages_oldest_first_then_nothing() -> TestResult {
    let (mut conn, mut peer) = connected_pair("consumer").await?;
    assert!(conn.poll().is_empty());

    peer.write_raw(b"3\rabc5\rhello").await?;
    peer.send_message("{\"n\":3}").await?;
    let received = poll_until(&mut conn, 3).await?;
    assert_eq!(received, ["abc", "hello", "{\"n\":3}"]);
    assert!(conn.poll().is_empty());
    assert!(conn.poll().is_empty());
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn large_messages_arrive_intact() -> TestResult {
    let (mut conn, mut peer) = connected_pair("bulk").await?;
    let big = "é".repeat(50_000);
    peer.send_message(&big).await?;
    let received = poll_until(&mut conn, 1).await?;
    assert_eq!(received, [big.clone()]);

    conn.send(big.clone())?;
    let echoed = peer.read_messages(2).await?;
    assert_eq!(echoed[1], big);
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn undelimited_digits_fail_the_connection() -> TestResult {
    let (mut conn, mut peer) = connected_pair("victim").await?;
    peer.send_message("before").await?;
    peer.write_raw(b"99999999999999999999999").await?;

    eventually(|| conn.state() == ConnectionState::Failed).await?;
    assert!(matches!(
        conn.failure(),
        Some(FailureReason::MalformedFrame(_))
    ));
    assert_eq!(conn.poll(), ["before"]);
    assert_eq!(conn.send("ignored"), Err(SendError::Failed));
    conn.close().await;
    assert_eq!(conn.state(), ConnectionState::Failed);
    Ok(())
}

#[tokio::test]
async fn peer_close_moves_to_closed_and_keeps_messages() -> TestResult {
    let (mut conn, mut peer) = connected_pair("listener").await?;
    peer.send_message("last words").await?;
    peer.shutdown().await?;

    eventually(|| conn.state() == ConnectionState::Closed).await?;
    assert_eq!(conn.failure(), None);
    assert_eq!(conn.poll(), ["last words"]);
    assert_eq!(conn.send("too late"), Err(SendError::Closed));
    Ok(())
}

#[tokio::test]
async fn close_is_idempotent_and_send_never_panics() -> TestResult {
    let (mut conn, mut peer) = connected_pair("closer").await?;
    peer.read_message().await?;
    peer.send_message("pending").await?;
    eventually(|| conn.pending() == 1).await?;

    conn.close().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.send("after close"), Err(SendError::Closed));

    conn.close().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
    peer.expect_closed().await?;

    assert_eq!(conn.poll(), ["pending"]);
    assert!(conn.poll().is_empty());
    Ok(())
}

#[tokio::test]
async fn dispatch_sends_handler_replies() -> TestResult {
    let (mut conn, mut peer) = connected_pair("echo").await?;
    peer.read_message().await?;
    peer.send_message("ping").await?;
    peer.send_message("quiet").await?;

    let mut seen = Vec::new();
    let mut handler = |payload: &str| {
        seen.push(payload.to_owned());
        (payload == "ping").then(|| "pong".to_owned())
    };
    let mut handled = 0;
    bounded(async {
        while handled < 2 {
            handled += conn.dispatch(&mut handler)?;
            tokio::task::yield_now().await;
        }
        Ok::<_, SendError>(())
    })
    .await??;

    assert_eq!(seen, ["ping", "quiet"]);
    assert_eq!(peer.read_message().await?, "pong");
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn sender_handles_share_the_outbound_queue() -> TestResult {
    let (mut conn, mut peer) = connected_pair("multi").await?;
    let sender = conn.sender();
    let task = tokio::spawn(async move { sender.enqueue("from task".to_owned()) });
    task.await??;
    conn.send("from owner")?;

    let mut messages = peer.read_messages(3).await?;
    messages.remove(0);
    messages.sort();
    assert_eq!(messages, ["from owner", "from task"]);
    conn.close().await;
    Ok(())
}

#[rstest]
#[case(64, 64, true)]
#[case(64, 65, false)]
#[case(usize::MAX, 16 * 1024 * 1024 + 1, true)]
#[tokio::test]
async fn send_enforces_the_frame_limit(
    #[case] max: usize,
    #[case] size: usize,
    #[case] accepted: bool,
) -> TestResult {
    let peer = tickwire_testing::TestPeer::bind().await?;
    let config = test_config().max_frame_length(max);
    let (conn, stream) = tokio::join!(
        Connection::connect_with_config("127.0.0.1", peer.port(), "limited", config),
        peer.accept(),
    );
    let mut conn = conn?;
    let _stream = stream?;

    let result = conn.send("a".repeat(size));
    if accepted {
        assert_eq!(result, Ok(()));
    } else {
        assert_eq!(result, Err(SendError::Oversized { size, max }));
    }
    conn.close().await;
    Ok(())
}

#[tokio::test]
async fn refused_connection_reports_connect_error() -> TestResult {
    let port = {
        let listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        listener.local_addr()?.port()
    };
    let config = ConnectionConfig::default();
    let err = Connection::connect_with_config("127.0.0.1", port, "nobody", config)
        .await
        .err()
        .ok_or("connection to a closed port succeeded")?;
    assert!(matches!(err, ConnectError::Connect { .. }), "{err:?}");
    Ok(())
}
