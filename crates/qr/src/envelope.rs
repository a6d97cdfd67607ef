//! Push-protocol envelope encoding and decoding.
//!
//! Outgoing envelopes are always array-shaped, with string ids: `"1"` for
//! the handshake, `"2"` for the subscribe, and a counter continuing from
//! there for connect keep-alives. Inbound traffic is less disciplined --
//! the server sends both array-of-envelope and bare single-envelope frames,
//! so decoding tries the array shape first and falls back to a single
//! object. Unknown fields are ignored.

use serde::Deserialize;
use serde_json::json;

/// Meta channel used for the initial handshake.
pub const HANDSHAKE_CHANNEL: &str = "/meta/handshake";

/// Build the handshake envelope.
pub fn handshake() -> String {
    json!([{
        "channel": HANDSHAKE_CHANNEL,
        "version": "1.0",
        "supportedConnectionTypes": ["websocket"],
        "id": "1",
    }])
    .to_string()
}

/// Build the subscribe envelope for one sign-in's QR topic.
pub fn subscribe(client_id: &str, course_id: i64, sign_id: i64) -> String {
    json!([{
        "channel": "/meta/subscribe",
        "clientId": client_id,
        "subscription": format!("/attendance/{course_id}/{sign_id}/qr"),
        "id": "2",
    }])
    .to_string()
}

/// Build a connect keep-alive envelope.
pub fn connect(client_id: &str, id: u64) -> String {
    json!([{
        "channel": "/meta/connect",
        "clientId": client_id,
        "connectionType": "websocket",
        "id": id.to_string(),
    }])
    .to_string()
}

/// One inbound envelope. Fields we never read are simply not modeled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub channel: String,
    pub successful: bool,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub data: serde_json::Value,
}

impl Envelope {
    /// The QR URL payload, trimmed, or `None` when absent or empty.
    pub fn qr_url(&self) -> Option<&str> {
        self.data
            .get("qrUrl")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Decode one text frame into its envelopes.
///
/// Array-of-envelope decoding is attempted first, then a single bare
/// envelope; a frame matching neither shape decodes to nothing.
pub fn decode_frames(text: &str) -> Vec<Envelope> {
    if let Ok(batch) = serde_json::from_str::<Vec<Envelope>>(text) {
        return batch;
    }
    serde_json::from_str::<Envelope>(text)
        .map(|envelope| vec![envelope])
        .unwrap_or_default()
}

/// Extract the session id from a handshake response frame.
///
/// Accepts the first envelope on the handshake channel whose success flag
/// is set and whose client id is non-empty.
pub fn handshake_client_id(text: &str) -> Option<String> {
    decode_frames(text)
        .into_iter()
        .find(|envelope| {
            envelope.channel == HANDSHAKE_CHANNEL
                && envelope.successful
                && !envelope.client_id.trim().is_empty()
        })
        .map(|envelope| envelope.client_id.trim().to_string())
}

/// Extract the first non-empty QR URL from a text frame, if any.
pub fn extract_qr_url(text: &str) -> Option<String> {
    decode_frames(text)
        .iter()
        .find_map(Envelope::qr_url)
        .map(str::to_string)
}
