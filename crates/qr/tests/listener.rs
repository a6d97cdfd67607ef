//! Listener integration tests against a local WebSocket endpoint.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use autosign_qr::{run_with_endpoint, QR_CACHE_TTL};
use autosign_store::{keys, MemoryStore, TtlStore};

/// Bind a throwaway local WebSocket endpoint, returning its URL and the
/// listener socket.
async fn local_endpoint() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (url, listener)
}

// ---------------------------------------------------------------------------
// Handshake exhaustion: a silent server must starve the listener out within
// the 6 second deadline, and no subscribe envelope may ever be sent.
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn silent_handshake_terminates_without_subscribing() {
    let (url, listener) = local_endpoint().await;

    // Server: accept one connection, record everything the client sends,
    // never respond.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                received.push(text);
            }
        }
        received
    });

    let store = Arc::new(MemoryStore::new());
    let started = tokio::time::Instant::now();
    run_with_endpoint(store, &url, 1, 2).await;

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(6),
        "listener gave up too early: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(9),
        "listener overstayed the handshake deadline: {elapsed:?}"
    );

    let received = server.await.unwrap();
    assert_eq!(received.len(), 1, "expected only the handshake envelope");
    assert!(received[0].contains("/meta/handshake"));
    assert!(received.iter().all(|text| !text.contains("/meta/subscribe")));
}

// ---------------------------------------------------------------------------
// Streaming: QR URLs from both frame shapes land in the cache, last write
// wins, and every write resets the 15 minute TTL.
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn qr_urls_are_cached_last_write_wins() {
    let (url, listener) = local_endpoint().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Handshake request -> successful ack.
        let first = ws.next().await.unwrap().unwrap();
        assert!(first.to_text().unwrap().contains("/meta/handshake"));
        ws.send(Message::Text(
            r#"[{"channel":"/meta/handshake","successful":true,"clientId":"abc"}]"#.into(),
        ))
        .await
        .unwrap();

        // Subscribe lands next; the listener does not wait for an ack.
        let second = ws.next().await.unwrap().unwrap();
        assert!(second.to_text().unwrap().contains("/attendance/1449049/3854920/qr"));

        // Two broadcasts, one per frame shape.
        ws.send(Message::Text(
            r#"[{"channel":"/attendance/1449049/3854920/qr","data":{"qrUrl":"https://qr/first"}}]"#
                .into(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        ws.send(Message::Text(
            r#"{"channel":"/attendance/1449049/3854920/qr","data":{"qrUrl":"https://qr/second"}}"#
                .into(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        ws.send(Message::Close(None)).await.unwrap();
        // Drain until the client goes away.
        while ws.next().await.is_some() {}
    });

    let store = Arc::new(MemoryStore::new());
    run_with_endpoint(Arc::clone(&store) as Arc<dyn TtlStore>, &url, 1449049, 3854920).await;
    server.await.unwrap();

    let cached = store.get(&keys::qr_url(3854920)).await.unwrap();
    assert_eq!(cached.as_deref(), Some("https://qr/second"));

    let remaining = store.remaining_ttl(&keys::qr_url(3854920)).await.unwrap();
    assert!(
        remaining > QR_CACHE_TTL - Duration::from_secs(5),
        "TTL was not reset on the final write: {remaining:?}"
    );
}

// ---------------------------------------------------------------------------
// A handshake ack with an unsuccessful flag must not unblock the listener.
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn failed_handshake_ack_is_ignored() {
    let (url, listener) = local_endpoint().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = ws.next().await;
        ws.send(Message::Text(
            r#"[{"channel":"/meta/handshake","successful":false,"clientId":"abc"}]"#.into(),
        ))
        .await
        .unwrap();

        let mut received = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                received.push(text);
            }
        }
        received
    });

    let store = Arc::new(MemoryStore::new());
    run_with_endpoint(store, &url, 1, 2).await;

    let received = server.await.unwrap();
    assert!(received.iter().all(|text| !text.contains("/meta/subscribe")));
}
