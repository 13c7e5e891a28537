use super::dispatcher::Dispatcher;
use super::transport::{Connector, Transport};
use crate::config::Config;
use crate::protocol::{Envelope, OutboundEnvelope};
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;

pub(crate) const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Connecting again after a connection was lost.
    Reconnecting,
    Connected,
    Closing,
    Closed,
}

/// Why [`RealtimeSession::receive_loop`] returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The shutdown future completed.
    Stopped,
    /// The remote side closed the connection.
    RemoteClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            request_timeout: config.request_timeout,
            backoff: config.retry_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
            backoff: Duration::from_secs(1),
        }
    }
}

/// Owns the connection to the realtime endpoint and its lifecycle.
///
/// `Disconnected -> Connecting -> Connected -> Closing -> Closed`. A lost
/// connection drops back to `Disconnected`; calling [`connect`](Self::connect)
/// again passes through `Reconnecting`.
pub struct RealtimeSession {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    state: SessionState,
    policy: RetryPolicy,
    lost: bool,
    answered: u64,
}

impl RealtimeSession {
    #[must_use]
    pub fn new(connector: Box<dyn Connector>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            transport: None,
            state: SessionState::Disconnected,
            policy,
            lost: false,
            answered: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Replies sent by [`receive_loop`](Self::receive_loop) over the lifetime
    /// of the session.
    #[must_use]
    pub const fn answered(&self) -> u64 {
        self.answered
    }

    /// Perform the handshake, retrying up to the policy's budget.
    ///
    /// Returns `false` once every attempt has failed; the caller decides
    /// whether to try again.
    pub async fn connect(&mut self) -> bool {
        match self.state {
            SessionState::Connected => return true,
            SessionState::Closing | SessionState::Closed => {
                tracing::warn!("connect() called on a closed session");
                return false;
            }
            _ => {}
        }

        self.state = if self.lost {
            SessionState::Reconnecting
        } else {
            SessionState::Connecting
        };

        let attempts = self.policy.max_retries.max(1);
        let mut backoff = self.policy.backoff;
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.policy.request_timeout, self.connector.connect()).await {
                Ok(Ok(transport)) => {
                    self.transport = Some(transport);
                    self.state = SessionState::Connected;
                    self.lost = false;
                    tracing::info!(attempt, "Session connected");
                    return true;
                }
                Ok(Err(err)) => {
                    tracing::warn!(attempt, attempts, error = %err, "Handshake failed");
                }
                Err(_) => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        timeout_secs = self.policy.request_timeout.as_secs(),
                        "Handshake timed out"
                    );
                }
            }
            if attempt < attempts && !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2).min(MAX_BACKOFF);
            }
        }

        self.state = SessionState::Disconnected;
        tracing::error!(attempts, "Could not connect to realtime endpoint");
        false
    }

    /// Serialize and write one envelope.
    ///
    /// # Errors
    /// Returns [`Error::NotConnected`] unless the session is connected, or the
    /// transport error if the write fails.
    pub async fn send(&mut self, envelope: &OutboundEnvelope) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        let frame = envelope.encode()?;
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        transport.send_text(frame).await
    }

    /// Send the `tools_announcement` envelope for the dispatcher's registry.
    ///
    /// # Errors
    /// Returns an error if the session is not connected or the write fails.
    pub async fn announce_tools(&mut self, dispatcher: &Dispatcher) -> Result<()> {
        let announcement = dispatcher.announcement();
        let result = self.send(&announcement).await;
        if let Err(err) = &result {
            if err.is_transport() {
                self.connection_lost();
            }
        }
        result
    }

    /// Read frames until the connection ends or `shutdown` completes,
    /// answering each envelope before reading the next one.
    ///
    /// A frame that has been read is always dispatched and answered; shutdown
    /// is only observed while waiting for the next frame.
    ///
    /// # Errors
    /// Returns the transport error that ended the connection. The session is
    /// then `Disconnected` and may be connected again.
    pub async fn receive_loop<S>(&mut self, dispatcher: &Dispatcher, shutdown: &mut S) -> Result<LoopExit>
    where
        S: Future<Output = ()> + Unpin,
    {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }

        loop {
            let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
            let frame = tokio::select! {
                () = &mut *shutdown => {
                    tracing::info!("Receive loop stopping on shutdown");
                    return Ok(LoopExit::Stopped);
                }
                frame = transport.next_frame() => frame,
            };

            let text = match frame {
                Ok(Some(text)) => text,
                Ok(None) => {
                    tracing::info!("Connection closed by remote");
                    self.connection_lost();
                    return Ok(LoopExit::RemoteClosed);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Transport failed while reading");
                    self.connection_lost();
                    return Err(err);
                }
            };

            let envelope = match Envelope::decode(&text) {
                Ok(envelope) => envelope,
                Err(err) => {
                    tracing::warn!(error = %err, "Dropping malformed frame");
                    continue;
                }
            };

            let reply = dispatcher.process(envelope).await;
            match self.send(&reply).await {
                Ok(()) => self.answered += 1,
                Err(err) if err.is_transport() => {
                    tracing::warn!(error = %err, "Failed to send reply");
                    self.connection_lost();
                    return Err(err);
                }
                Err(err) => tracing::error!(error = %err, "Dropping reply that could not be sent"),
            }
        }
    }

    /// Release the transport. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close().await {
                tracing::debug!(error = %err, "Error while closing transport");
            }
        }
        self.state = SessionState::Closed;
        tracing::info!("Session closed");
    }

    fn connection_lost(&mut self) {
        self.transport = None;
        self.state = SessionState::Disconnected;
        self.lost = true;
    }
}
