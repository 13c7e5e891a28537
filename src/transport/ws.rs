use crate::error::Result;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

pub const APP_TOKEN_HEADER: &str = "x-app-token";

#[derive(Debug)]
pub struct WsStream(WebSocketStream<MaybeTlsStream<TcpStream>>);

impl WsStream {
    pub(crate) const fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self(stream)
    }
}

impl futures::Stream for WsStream {
    type Item = std::result::Result<
        tokio_tungstenite::tungstenite::Message,
        tokio_tungstenite::tungstenite::Error,
    >;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.0).poll_next(cx)
    }
}

impl futures::Sink<tokio_tungstenite::tungstenite::Message> for WsStream {
    type Error = tokio_tungstenite::tungstenite::Error;

    fn poll_ready(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_ready(cx)
    }

    fn start_send(
        mut self: std::pin::Pin<&mut Self>,
        item: tokio_tungstenite::tungstenite::Message,
    ) -> std::result::Result<(), Self::Error> {
        std::pin::Pin::new(&mut self.0).start_send(item)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_close(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_close(cx)
    }
}

/// Handshake parameters for one connection attempt.
#[derive(Debug, Clone, Copy)]
pub struct Handshake<'a> {
    pub endpoint: &'a Url,
    pub model: &'a str,
    pub bearer: &'a str,
    pub app_token: Option<&'a str>,
}

/// Build the websocket URL for a handshake: the endpoint with `model` set.
#[must_use]
pub fn handshake_url(endpoint: &Url, model: &str) -> Url {
    let mut url = endpoint.clone();
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "model")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (k, v) in &retained {
            query.append_pair(k, v);
        }
        query.append_pair("model", model);
    }
    url
}

/// Establish a WebSocket connection to the realtime endpoint.
///
/// # Errors
/// Returns an error if the credentials are not valid header values or the
/// handshake fails.
pub async fn connect(handshake: Handshake<'_>) -> Result<WsStream> {
    let url = handshake_url(handshake.endpoint, handshake.model);
    let auth_header = HeaderValue::from_str(&format!("Bearer {}", handshake.bearer))?;

    let mut req = tokio_tungstenite::tungstenite::client::IntoClientRequest::into_client_request(
        url.as_str(),
    )?;
    let h = req.headers_mut();
    h.insert(AUTHORIZATION, auth_header);
    if let Some(token) = handshake.app_token {
        h.insert(HeaderName::from_static(APP_TOKEN_HEADER), HeaderValue::from_str(token)?);
    }
    let (ws_stream, _) = connect_async(req).await?;

    tracing::info!(endpoint = %handshake.endpoint, model = handshake.model, "Connected to realtime endpoint");

    Ok(WsStream::new(ws_stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_url_sets_model() {
        let endpoint = Url::parse("wss://api.openai.com/v1/realtime").unwrap();
        let url = handshake_url(&endpoint, "gpt-realtime");
        assert_eq!(url.as_str(), "wss://api.openai.com/v1/realtime?model=gpt-realtime");
    }

    #[test]
    fn handshake_url_replaces_existing_model_and_keeps_other_pairs() {
        let endpoint = Url::parse("wss://example.com/rt?model=old&region=eu").unwrap();
        let url = handshake_url(&endpoint, "new");
        assert_eq!(url.as_str(), "wss://example.com/rt?region=eu&model=new");
    }
}
