//! End-to-end session test against a loopback server.
//!
//! Exercises the real driver: TCP connect, registration handshake,
//! auto-PONG, event delivery, flood-scheduled writes and receipts.

#![cfg(feature = "tokio")]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::{timeout, Instant};

use slirc_client::{Event, Session, SessionConfig};

async fn next_semantic(events: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Event {
    loop {
        let event = timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed");
        if !matches!(event, Event::Raw(_)) {
            return event;
        }
    }
}

#[tokio::test]
async fn session_registers_ponges_and_paces_writes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        // Registration: NICK then USER, no PASS configured.
        let first = lines.next_line().await.unwrap().unwrap();
        assert_eq!(first, "NICK alice");
        let second = lines.next_line().await.unwrap().unwrap();
        assert!(second.starts_with("USER "), "unexpected line: {second}");

        write
            .write_all(b":test.server 001 alice :Welcome\r\n")
            .await
            .unwrap();
        write
            .write_all(b":test.server PING :keepalive\r\n")
            .await
            .unwrap();

        // The engine answers PING through the flood-scheduled path.
        let pong = loop {
            let line = lines.next_line().await.unwrap().unwrap();
            if line.starts_with("PONG") {
                break line;
            }
        };
        assert_eq!(pong, "PONG :keepalive");

        write
            .write_all(b":bob!b@h PRIVMSG alice :hi there\r\n")
            .await
            .unwrap();

        // Collect three pastes and measure their pacing.
        let mut received = Vec::new();
        let mut first_at = None;
        while received.len() < 3 {
            let line = lines.next_line().await.unwrap().unwrap();
            if line.starts_with("PRIVMSG") {
                first_at.get_or_insert_with(Instant::now);
                received.push(line);
            }
        }
        let spacing = first_at.expect("saw a PRIVMSG").elapsed();
        (received, spacing)
    });

    let config = SessionConfig {
        server: "127.0.0.1".to_string(),
        port: addr.port(),
        nickname: "alice".to_string(),
        flood_interval: Duration::from_millis(50),
        reconnect_delay: Duration::ZERO,
        ..SessionConfig::default()
    };
    let (session, mut events) = Session::connect(config);

    assert!(matches!(next_semantic(&mut events).await, Event::Connected));
    assert!(matches!(
        next_semantic(&mut events).await,
        Event::Registered
    ));
    assert!(session.is_registered());
    assert_eq!(session.my_nick(), "alice");

    match next_semantic(&mut events).await {
        Event::Pm { sender, text } => {
            assert_eq!(sender.nick, "bob");
            assert_eq!(text, "hi there");
        }
        other => panic!("expected Pm event, got {other:?}"),
    }

    // Three back-to-back submissions: written in order, spaced by the
    // flood interval, each receipt resolving only after the actual write.
    let first = session.privmsg("#c", "one");
    let second = session.privmsg("#c", "two");
    let third = session.privmsg("#c", "three");
    assert!(first.delivered().await);
    assert!(second.delivered().await);
    assert!(third.delivered().await);

    let (received, spacing) = server.await.unwrap();
    assert_eq!(
        received,
        vec![
            "PRIVMSG #c :one".to_string(),
            "PRIVMSG #c :two".to_string(),
            "PRIVMSG #c :three".to_string(),
        ]
    );
    // Two intervals between first and third write, minus loopback jitter.
    assert!(
        spacing >= Duration::from_millis(80),
        "writes not flood-spaced: {spacing:?}"
    );

    session.quit(Some("done"));
}

#[tokio::test]
async fn disconnect_event_fires_when_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        loop {
            let line = lines.next_line().await.unwrap().unwrap();
            if line.starts_with("USER") {
                break;
            }
        }
        write
            .write_all(b":test.server 001 alice :Welcome\r\n")
            .await
            .unwrap();
        // Close without warning.
    });

    let config = SessionConfig {
        server: "127.0.0.1".to_string(),
        port: addr.port(),
        nickname: "alice".to_string(),
        reconnect_delay: Duration::ZERO,
        ..SessionConfig::default()
    };
    let (session, mut events) = Session::connect(config);

    assert!(matches!(next_semantic(&mut events).await, Event::Connected));
    assert!(matches!(
        next_semantic(&mut events).await,
        Event::Registered
    ));
    server.await.unwrap();

    loop {
        match next_semantic(&mut events).await {
            Event::Disconnected { .. } => break,
            _ => continue,
        }
    }
    assert!(!session.is_registered());
}
