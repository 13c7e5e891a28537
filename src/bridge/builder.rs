use crate::auth::{ApiKeyAuth, AuthProvider, EphemeralTokenAuth};
use crate::config::Config;
use crate::{Error, Result};
use std::sync::Arc;

use super::dispatcher::Dispatcher;
use super::service::ToolBridge;
use super::session::{RealtimeSession, RetryPolicy};
use super::tools::ToolRegistry;
use super::transport::{Connector, WsConnector};

pub struct Bridge;

impl Bridge {
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }
}

pub struct BridgeBuilder {
    config: Option<Config>,
    registry: Option<Arc<ToolRegistry>>,
    connector: Option<Box<dyn Connector>>,
    auth: Option<Arc<dyn AuthProvider>>,
    policy: Option<RetryPolicy>,
    reconnect: Option<bool>,
}

impl BridgeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            registry: None,
            connector: None,
            auth: None,
            policy: None,
            reconnect: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a custom connector instead of the websocket one built from config.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub const fn reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = Some(reconnect);
        self
    }

    /// # Errors
    /// Returns [`Error::Config`] if no connector is given and no valid
    /// configuration is available to build one.
    #[allow(clippy::result_large_err)]
    pub fn build(self) -> Result<ToolBridge> {
        if let Some(config) = &self.config {
            config.validate()?;
        }

        let policy = self
            .policy
            .or_else(|| self.config.as_ref().map(RetryPolicy::from_config))
            .unwrap_or_default();
        let reconnect = self
            .reconnect
            .or_else(|| self.config.as_ref().map(|c| c.reconnect))
            .unwrap_or(true);

        let connector = match self.connector {
            Some(connector) => connector,
            None => {
                let config = self.config.as_ref().ok_or_else(|| {
                    Error::Config("a config is required to build the websocket connector".to_string())
                })?;
                let auth = match self.auth {
                    Some(auth) => auth,
                    None => default_auth(config)?,
                };
                Box::new(
                    WsConnector::new(config.endpoint.clone(), config.model.clone(), auth)
                        .app_token(config.app_token.clone()),
                )
            }
        };

        let registry = self.registry.unwrap_or_default();
        let session = RealtimeSession::new(connector, policy);
        Ok(ToolBridge::new(session, Dispatcher::new(registry), reconnect))
    }
}

#[allow(clippy::result_large_err)]
fn default_auth(config: &Config) -> Result<Arc<dyn AuthProvider>> {
    if config.ephemeral_auth {
        let auth = EphemeralTokenAuth::new(
            &config.api_key,
            &config.endpoint,
            config.model.clone(),
            config.request_timeout,
        )?;
        Ok(Arc::new(auth))
    } else {
        Ok(Arc::new(ApiKeyAuth::new(config.api_key.clone())))
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
