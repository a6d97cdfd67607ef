//! QR-code broadcast listener for the attendance platform's push channel.
//!
//! The upstream publishes rotating QR-code URLs over a Bayeux-style
//! publish/subscribe protocol carried on a WebSocket: handshake, subscribe,
//! then a connect envelope every second to keep the session alive. One
//! listener session watches one sign-in and republishes every QR URL it
//! sees into the shared store, where the web layer picks it up.
//!
//! Sessions are fire-and-forget: they never reconnect, never report back to
//! their spawner, and more than one session may watch the same sign.

pub mod envelope;
mod listener;

pub use listener::{run, run_with_endpoint, spawn, ListenerError, QR_CACHE_TTL};
