use crate::{Error, Result};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MODEL: &str = "gpt-realtime";
pub const DEFAULT_ENDPOINT: &str = "wss://api.openai.com/v1/realtime";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// Process configuration, validated before the session starts.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub app_token: String,
    pub model: String,
    pub endpoint: Url,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub retry_backoff: Duration,
    pub reconnect: bool,
    pub ephemeral_auth: bool,
}

impl Config {
    /// Build a configuration with defaults for everything but the secrets.
    ///
    /// # Errors
    /// Returns an error if either secret is empty.
    #[allow(clippy::result_large_err)]
    pub fn new(api_key: impl Into<String>, app_token: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let app_token = app_token.into();
        let config = Self {
            api_key,
            app_token,
            model: DEFAULT_MODEL.to_string(),
            endpoint: Url::parse(DEFAULT_ENDPOINT)?,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            reconnect: true,
            ephemeral_auth: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a required variable is missing or a value
    /// does not parse.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a required key is missing or a value does
    /// not parse.
    #[allow(clippy::result_large_err)]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| Error::Config("OPENAI_API_KEY environment variable is required".to_string()))?;
        let app_token = get("MCP_APP_TOKEN")
            .ok_or_else(|| Error::Config("MCP_APP_TOKEN environment variable is required".to_string()))?;

        let endpoint = match get("OPENAI_WS_URL") {
            Some(raw) => Url::parse(&raw)
                .map_err(|e| Error::Config(format!("OPENAI_WS_URL is not a valid URL: {e}")))?,
            None => Url::parse(DEFAULT_ENDPOINT)?,
        };

        let config = Self {
            api_key,
            app_token,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint,
            max_retries: parse_or("MAX_RETRIES", get("MAX_RETRIES"), DEFAULT_MAX_RETRIES)?,
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT",
                get("REQUEST_TIMEOUT"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            retry_backoff: Duration::from_millis(parse_or(
                "RETRY_BACKOFF_MS",
                get("RETRY_BACKOFF_MS"),
                DEFAULT_RETRY_BACKOFF_MS,
            )?),
            reconnect: parse_bool("RECONNECT", get("RECONNECT"), true)?,
            ephemeral_auth: parse_bool("USE_EPHEMERAL_TOKEN", get("USE_EPHEMERAL_TOKEN"), false)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`Error::Config`] describing the first invalid field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("OPENAI_API_KEY environment variable is required".to_string()));
        }
        if self.app_token.trim().is_empty() {
            return Err(Error::Config("MCP_APP_TOKEN environment variable is required".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }
        if !matches!(self.endpoint.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "endpoint must use ws or wss, got {}",
                self.endpoint.scheme()
            )));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("MAX_RETRIES must be at least 1".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("REQUEST_TIMEOUT must be at least 1 second".to_string()));
        }
        Ok(())
    }
}

#[allow(clippy::result_large_err)]
fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.map_or(Ok(default), |value| {
        value
            .parse()
            .map_err(|e| Error::Config(format!("{key}={value:?} is invalid: {e}")))
    })
}

#[allow(clippy::result_large_err)]
fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key}={value:?} is not a boolean"))),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("app_token", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .field("retry_backoff", &self.retry_backoff)
            .field("reconnect", &self.reconnect)
            .field("ephemeral_auth", &self.ephemeral_auth)
            .finish()
    }
}
