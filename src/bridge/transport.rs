use crate::auth::AuthProvider;
use crate::transport::ws::Handshake;
use crate::{Error, RealtimeClient, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::Url;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One established bidirectional text-frame connection.
pub trait Transport: Send {
    fn send_text(&mut self, frame: String) -> BoxFuture<'_, Result<()>>;
    /// `Ok(None)` means the remote side closed the connection.
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<String>>>;
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Performs one handshake attempt.
pub trait Connector: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>>;
}

struct WsTransport {
    client: RealtimeClient,
}

impl Transport for WsTransport {
    fn send_text(&mut self, frame: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.client.send_text(frame).await })
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Result<Option<String>>> {
        Box::pin(async move { self.client.next_text().await })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.client.close().await })
    }
}

/// Connects to the realtime endpoint over websocket, fetching a fresh bearer
/// credential from the [`AuthProvider`] on every attempt.
pub struct WsConnector {
    endpoint: Url,
    model: String,
    app_token: Option<String>,
    auth: Arc<dyn AuthProvider>,
}

impl WsConnector {
    #[must_use]
    pub fn new(endpoint: Url, model: impl Into<String>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            endpoint,
            model: model.into(),
            app_token: None,
            auth,
        }
    }

    #[must_use]
    pub fn app_token(mut self, token: impl Into<String>) -> Self {
        self.app_token = Some(token.into());
        self
    }

    async fn open(&self) -> Result<Box<dyn Transport>> {
        let bearer = self
            .auth
            .bearer_token()
            .await
            .map_err(|e| Error::Handshake(format!("credential unavailable: {e}")))?;
        let handshake = Handshake {
            endpoint: &self.endpoint,
            model: &self.model,
            bearer: &bearer,
            app_token: self.app_token.as_deref(),
        };
        let client = RealtimeClient::connect(handshake)
            .await
            .map_err(|e| Error::Handshake(e.to_string()))?;
        Ok(Box::new(WsTransport { client }))
    }
}

impl Connector for WsConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Transport>>> {
        Box::pin(self.open())
    }
}
