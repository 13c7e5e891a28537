//! Bearer credentials for the realtime handshake.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Supplies the bearer credential attached to every handshake attempt.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

/// Uses the API key itself as the bearer credential.
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }
}

#[async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.api_key.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ClientSecretRequest<'a> {
    session: ClientSecretSession<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct ClientSecretSession<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    model: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub value: String,
    pub expires_at: u64,
}

/// Mints a short-lived client secret over REST before each handshake, so the
/// long-lived API key never travels over the websocket.
#[derive(Clone, Debug)]
pub struct EphemeralTokenAuth {
    client: Client,
    auth_header: HeaderValue,
    secrets_url: Url,
    model: String,
}

impl EphemeralTokenAuth {
    /// # Errors
    /// Returns an error if the API key is not a valid header value, the
    /// endpoint cannot be mapped to a REST URL, or the HTTP client fails to
    /// build.
    #[allow(clippy::result_large_err)]
    pub fn new(api_key: &str, endpoint: &Url, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
            .build()?;
        let auth_header = HeaderValue::from_str(&format!("Bearer {api_key}"))?;
        let secrets_url = rest_url(endpoint, "client_secrets")?;

        Ok(Self {
            client,
            auth_header,
            secrets_url,
            model: model.into(),
        })
    }

    /// # Errors
    /// Returns an error if the HTTP request fails or returns a non-success status.
    pub async fn create_client_secret(&self) -> Result<ClientSecret> {
        let body = ClientSecretRequest {
            session: ClientSecretSession { kind: "realtime", model: &self.model },
        };
        let res = self
            .client
            .post(self.secrets_url.clone())
            .header(AUTHORIZATION, &self.auth_header)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

#[async_trait]
impl AuthProvider for EphemeralTokenAuth {
    async fn bearer_token(&self) -> Result<String> {
        let secret = self.create_client_secret().await?;
        tracing::debug!(expires_at = secret.expires_at, "Minted ephemeral client secret");
        Ok(secret.value)
    }
}

/// Map a realtime websocket endpoint onto its REST sibling, e.g.
/// `wss://host/v1/realtime` + `client_secrets` -> `https://host/v1/realtime/client_secrets`.
///
/// # Errors
/// Returns [`Error::Config`] if the endpoint is not a `ws`/`wss` URL.
#[allow(clippy::result_large_err)]
pub fn rest_url(endpoint: &Url, path: &str) -> Result<Url> {
    let scheme = match endpoint.scheme() {
        "wss" => "https",
        "ws" => "http",
        other => return Err(Error::Config(format!("endpoint must use ws or wss, got {other}"))),
    };
    let mut url = endpoint.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::Config(format!("cannot derive REST URL from {endpoint}")))?;
    url.set_query(None);
    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base}/{path}"));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_url_switches_scheme_and_appends_path() {
        let endpoint = Url::parse("wss://api.openai.com/v1/realtime?model=x").unwrap();
        let url = rest_url(&endpoint, "client_secrets").unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/realtime/client_secrets");
    }

    #[test]
    fn rest_url_handles_plain_ws_and_trailing_slash() {
        let endpoint = Url::parse("ws://localhost:8080/rt/").unwrap();
        let url = rest_url(&endpoint, "client_secrets").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/rt/client_secrets");
    }

    #[test]
    fn rest_url_rejects_other_schemes() {
        let endpoint = Url::parse("https://api.openai.com/v1/realtime").unwrap();
        assert!(matches!(rest_url(&endpoint, "x"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn api_key_auth_returns_key() {
        let auth = ApiKeyAuth::new("sk-test");
        assert_eq!(auth.bearer_token().await.unwrap(), "sk-test");
    }
}
