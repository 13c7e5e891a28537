use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP protocol error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse or serialize JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Header error: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Session is not connected")]
    NotConnected,

    #[error("The connection was closed unexpectedly")]
    ConnectionClosed,

    #[error("Malformed frame: {0}")]
    Decode(String),

    #[error("{0}")]
    Tool(String),
}

impl Error {
    /// Whether the error ends the current connection but leaves the process
    /// free to reconnect.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::WebSocket(_) | Self::Io(_) | Self::NotConnected | Self::ConnectionClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
