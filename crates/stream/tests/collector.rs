//! Collector lifecycle tests against an in-process stream server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use skywatch_stream::{Collector, CollectorConfig, ReconnectPolicy, StreamError, SupervisorState};

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/subscribe", listener.local_addr().unwrap());
    (listener, url)
}

fn commit_frame(seq: u64) -> Message {
    Message::Text(
        json!({
            "kind": "commit",
            "did": "did:plc:testrepo",
            "seq": seq,
            "rev": format!("rev{seq}"),
            "ops": [{
                "action": "create",
                "path": "app.bsky.feed.post/3ktest",
                "record": {"text": format!("post {seq}")}
            }]
        })
        .to_string(),
    )
}

fn fast_config(url: &str) -> CollectorConfig {
    CollectorConfig::new(url)
        .connect_timeout(Duration::from_secs(5))
        .policy(ReconnectPolicy {
            base: Duration::from_millis(100),
            multiplier: 2.0,
            cap: Duration::from_millis(500),
            max_attempts: 5,
        })
}

#[tokio::test]
async fn collects_events_in_arrival_order_and_drops_garbage() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(commit_frame(1)).await.unwrap();
        ws.send(Message::Text("definitely not an event".into())).await.unwrap();
        ws.send(commit_frame(2)).await.unwrap();
        ws.send(commit_frame(3)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let collector = Collector::new(fast_config(&url));
    collector.start().await.unwrap();

    assert!(
        collector
            .buffer()
            .wait_for(Duration::from_secs(2), |e| e.seq() == 3)
            .await,
        "expected all frames to arrive"
    );

    let seqs: Vec<u64> = collector.buffer().snapshot().iter().map(|e| e.seq()).collect();
    assert_eq!(seqs, vec![1, 2, 3], "arrival order must be preserved");
    assert_eq!(collector.buffer().len(), 3, "unparseable frame must be dropped");

    collector.stop().await;
}

#[tokio::test]
async fn reconnects_once_and_keeps_appending_to_same_buffer() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        // first connection: two events, then an unsolicited close
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(commit_frame(1)).await.unwrap();
        ws.send(commit_frame(2)).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // the retried connect lands here
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(commit_frame(3)).await.unwrap();
        ws.send(commit_frame(4)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let collector = Collector::new(fast_config(&url));
    let observed = Arc::new(AtomicU32::new(0));
    let observed_in_cb = observed.clone();
    collector.on_reconnect(move |_attempt| {
        observed_in_cb.fetch_add(1, Ordering::Relaxed);
    });
    collector.start().await.unwrap();

    assert!(
        collector
            .buffer()
            .wait_for(Duration::from_secs(5), |e| e.seq() == 4)
            .await,
        "expected events from the second connection"
    );

    let seqs: Vec<u64> = collector.buffer().snapshot().iter().map(|e| e.seq()).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4], "relative order across the reconnect must hold");
    assert_eq!(collector.reconnects(), 1);
    assert_eq!(observed.load(Ordering::Relaxed), 1, "observer fires once per retry");
    assert_eq!(collector.state(), SupervisorState::Connected);
    assert!(collector.ensure_live().is_ok());

    collector.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent_and_nothing_appends_afterwards() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(commit_frame(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        // delivered after the collector stopped; must never be recorded
        let _ = ws.send(commit_frame(2)).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let collector = Collector::new(fast_config(&url));
    collector.start().await.unwrap();
    assert!(
        collector
            .buffer()
            .wait_for(Duration::from_secs(2), |e| e.seq() == 1)
            .await
    );

    collector.stop().await;
    collector.stop().await; // idempotent

    let len_after_stop = collector.buffer().len();
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(collector.buffer().len(), len_after_stop);
    assert_eq!(collector.state(), SupervisorState::Idle);
    assert_eq!(collector.reconnects(), 0, "stop must not trigger reconnection");
}

#[tokio::test]
async fn exhausts_after_max_attempts_without_scheduling_more() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        // listener drops here, so every retry is refused
    });

    let collector = Collector::new(CollectorConfig::new(url.as_str()).connect_timeout(Duration::from_secs(2)).policy(
        ReconnectPolicy {
            base: Duration::from_millis(50),
            multiplier: 2.0,
            cap: Duration::from_millis(200),
            max_attempts: 1,
        },
    ));
    let observed = Arc::new(AtomicU32::new(0));
    let observed_in_cb = observed.clone();
    collector.on_reconnect(move |_| {
        observed_in_cb.fetch_add(1, Ordering::Relaxed);
    });
    collector.start().await.unwrap();
    server.await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while collector.state() != SupervisorState::Exhausted {
        assert!(tokio::time::Instant::now() < deadline, "supervisor never exhausted");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert_eq!(collector.reconnects(), 1);
    assert_eq!(observed.load(Ordering::Relaxed), 1);
    assert!(matches!(
        collector.ensure_live(),
        Err(StreamError::ReconnectExhausted { attempts: 1 })
    ));

    // no further attempt is scheduled once terminal
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(collector.reconnects(), 1);

    collector.stop().await;
}

#[tokio::test]
async fn initial_connect_times_out_when_no_open_arrives() {
    // accept at the TCP level but never answer the handshake
    let (listener, url) = bind().await;
    let _keep = listener;

    let collector =
        Collector::new(CollectorConfig::new(url.as_str()).connect_timeout(Duration::from_millis(300)));
    match collector.start().await {
        Err(StreamError::ConnectTimeout { .. }) => {}
        other => panic!("expected connect timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn initial_connect_surfaces_transport_errors() {
    // grab a free port, then close the listener so connects are refused
    let (listener, url) = bind().await;
    drop(listener);

    let collector =
        Collector::new(CollectorConfig::new(url.as_str()).connect_timeout(Duration::from_secs(2)));
    match collector.start().await {
        Err(StreamError::Transport(_)) => {}
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let _ws = accept_async(stream).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let collector = Collector::new(fast_config(&url));
    collector.start().await.unwrap();
    assert!(matches!(collector.start().await, Err(StreamError::AlreadyStarted)));
    collector.stop().await;
}
