//! One push-protocol listener session.
//!
//! Lifecycle: connect, handshake (bounded wait), subscribe, then stream.
//! Streaming runs two duties concurrently on the split socket: the receive
//! half extracts QR URLs and republishes them to the store, the write half
//! sends a connect keep-alive every second. Whichever duty fails first ends
//! the session; there is no retry and no reconnection.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use autosign_store::{keys, StoreError, TtlStore};

use crate::envelope;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Fixed upstream push endpoint.
const PUSH_ENDPOINT: &str = "wss://www.teachermate.com.cn/faye";

/// Per-read timeout while waiting for the handshake response.
const HANDSHAKE_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Total time allowed for the handshake to succeed.
const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(6);

/// Interval between connect keep-alive envelopes.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Lifetime of a cached QR URL; reset on every observed broadcast so the
/// cache outlives users who open the page late.
pub const QR_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Errors that end a listener session.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// WebSocket transport failure (connect, read, or write).
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection closed before the handshake completed.
    #[error("connection closed during handshake")]
    ClosedDuringHandshake,

    /// No acceptable handshake response arrived within the deadline.
    #[error("no successful handshake response within {0:?}")]
    HandshakeTimeout(Duration),

    /// Writing an observed QR URL to the store failed.
    #[error("failed to persist QR URL: {0}")]
    Store(#[from] StoreError),
}

/// Spawn a detached listener session for one sign-in.
///
/// Fire-and-forget: the caller gets no handle and no completion signal.
/// Spawning twice for the same sign simply produces two sessions racing
/// benignly on the same cache key.
pub fn spawn(store: Arc<dyn TtlStore>, course_id: i64, sign_id: i64) {
    tokio::spawn(async move {
        run(store, course_id, sign_id).await;
    });
}

/// Run one listener session against the production endpoint.
pub async fn run(store: Arc<dyn TtlStore>, course_id: i64, sign_id: i64) {
    run_with_endpoint(store, PUSH_ENDPOINT, course_id, sign_id).await;
}

/// Run one listener session against an explicit endpoint.
pub async fn run_with_endpoint(
    store: Arc<dyn TtlStore>,
    endpoint: &str,
    course_id: i64,
    sign_id: i64,
) {
    if let Err(e) = session(store.as_ref(), endpoint, course_id, sign_id).await {
        tracing::warn!(course_id, sign_id, error = %e, "QR listener session ended");
    }
}

/// Full session lifecycle. Any error aborts the session for good.
async fn session(
    store: &dyn TtlStore,
    endpoint: &str,
    course_id: i64,
    sign_id: i64,
) -> Result<(), ListenerError> {
    tracing::info!(course_id, sign_id, "QR listener connecting");
    let (mut ws, _response) = connect_async(endpoint).await?;

    ws.send(Message::Text(envelope::handshake())).await?;
    let client_id = await_handshake(&mut ws).await?;
    tracing::info!(course_id, sign_id, client_id = %client_id, "QR listener handshake ok");

    // The subscribe ack can be delayed or absent; do not wait for it.
    ws.send(Message::Text(envelope::subscribe(&client_id, course_id, sign_id)))
        .await?;
    tracing::info!(course_id, sign_id, "QR listener subscribed");

    let (mut write, mut read) = ws.split();
    tokio::select! {
        result = receive_loop(&mut read, store, sign_id) => result,
        result = keepalive_loop(&mut write, &client_id) => result,
    }
}

/// Wait for a successful handshake response.
///
/// Reads with a short per-read timeout and retries until the overall
/// deadline; a hard transport close aborts immediately. On deadline
/// exhaustion the session ends without ever subscribing.
async fn await_handshake(ws: &mut WsStream) -> Result<String, ListenerError> {
    let deadline = Instant::now() + HANDSHAKE_DEADLINE;
    while Instant::now() < deadline {
        match tokio::time::timeout(HANDSHAKE_READ_TIMEOUT, ws.next()).await {
            // Per-read timeout: keep waiting until the deadline.
            Err(_) => continue,
            Ok(None) => return Err(ListenerError::ClosedDuringHandshake),
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Some(client_id) = envelope::handshake_client_id(&text) {
                    return Ok(client_id);
                }
            }
            Ok(Some(Ok(_))) => {}
        }
    }
    Err(ListenerError::HandshakeTimeout(HANDSHAKE_DEADLINE))
}

/// Receive duty: republish every observed QR URL to the store.
async fn receive_loop(
    read: &mut SplitStream<WsStream>,
    store: &dyn TtlStore,
    sign_id: i64,
) -> Result<(), ListenerError> {
    let mut logged_first = false;
    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                let Some(url) = envelope::extract_qr_url(&text) else {
                    continue;
                };
                if !logged_first {
                    tracing::info!(sign_id, url = %url, "QR url received");
                    logged_first = true;
                }
                store
                    .set(&keys::qr_url(sign_id), &url, Some(QR_CACHE_TTL))
                    .await?;
            }
            Message::Close(frame) => {
                tracing::info!(sign_id, ?frame, "QR push connection closed");
                return Ok(());
            }
            _ => {}
        }
    }
    Ok(())
}

/// Keep-alive duty: a connect envelope every second, ids continuing the
/// sequence begun by the handshake and subscribe envelopes.
async fn keepalive_loop(
    write: &mut SplitSink<WsStream, Message>,
    client_id: &str,
) -> Result<(), ListenerError> {
    let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
    // The first tick of a tokio interval fires immediately; consume it so
    // the first connect envelope goes out one interval after subscribing.
    ticker.tick().await;

    let mut counter: u64 = 3;
    loop {
        ticker.tick().await;
        counter += 1;
        write
            .send(Message::Text(envelope::connect(client_id, counter)))
            .await?;
    }
}
