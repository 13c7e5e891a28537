#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Bridge a realtime LLM session to locally executed tools.
//!
//! The remote model lists and calls tools over a websocket using small JSON
//! envelopes. [`ToolRegistry`] holds the tools, [`Dispatcher`] answers
//! envelopes, and [`RealtimeSession`] owns the connection and its receive loop.

pub mod auth;
pub mod bridge;
pub mod builtin;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

pub use auth::{ApiKeyAuth, AuthProvider, EphemeralTokenAuth};
pub use bridge::{
    Bridge, BridgeBuilder, Connector, Dispatcher, LoopExit, RealtimeSession, RetryPolicy,
    SessionState, ToolBridge, ToolDescriptor, ToolFuture, ToolRegistry, ToolSpec, Transport,
    WsConnector,
};
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{
    Envelope, InboundMessage, OutboundEnvelope, OutboundMessage, ParamSpec, ParamType,
    ParameterSchema, ToolDescriptorDict, ToolResult,
};

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use transport::ws::{Handshake, WsStream};

const TRACE_LOG_MAX_BYTES: usize = 1024;
const TRACE_TRUNCATE_SUFFIX: &str = "... (truncated)";

/// A text-frame client for the realtime endpoint.
///
/// Thread safety: `RealtimeClient` is `Send` but not `Sync` because the underlying
/// WebSocket stream is not `Sync`.
#[must_use]
pub struct RealtimeClient {
    stream: WsStream,
}

impl RealtimeClient {
    /// Connect to the realtime endpoint.
    ///
    /// # Errors
    /// Returns an error if the connection fails or if the URL is invalid.
    pub async fn connect(handshake: Handshake<'_>) -> Result<Self> {
        let stream = transport::ws::connect(handshake).await?;
        Ok(Self { stream })
    }

    /// Send one already-serialized text frame.
    ///
    /// # Errors
    /// Returns an error if the WebSocket send fails.
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        tracing::trace!("Sending frame: {}", safe_truncate(&text, TRACE_LOG_MAX_BYTES));
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Receive the next text frame, answering pings along the way.
    ///
    /// Returns `Ok(None)` once the server closes the connection.
    ///
    /// # Errors
    /// Returns an error if the WebSocket fails.
    pub async fn next_text(&mut self) -> Result<Option<String>> {
        while let Some(msg) = self.stream.next().await {
            match msg? {
                Message::Text(text) => {
                    tracing::trace!("Received frame: {}", safe_truncate(&text, TRACE_LOG_MAX_BYTES));
                    return Ok(Some(text.as_str().to_owned()));
                }
                Message::Close(_) => {
                    tracing::info!("WebSocket connection closed by server");
                    return Ok(None);
                }
                Message::Ping(payload) => {
                    tracing::debug!("Received Ping, sending Pong");
                    self.stream.send(Message::Pong(payload)).await?;
                }
                Message::Binary(bytes) => {
                    tracing::warn!(len = bytes.len(), "Skipping binary frame");
                }
                _ => (),
            }
        }
        Ok(None)
    }

    /// Close the connection with a normal close frame.
    ///
    /// # Errors
    /// Returns an error if the close handshake fails.
    pub async fn close(&mut self) -> Result<()> {
        self.stream.close().await?;
        Ok(())
    }
}

pub(crate) fn safe_truncate(s: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if s.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(s);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(format!(
        "{} {} {} bytes",
        &s[..end],
        TRACE_TRUNCATE_SUFFIX,
        s.len() - end
    ))
}
