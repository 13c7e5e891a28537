use super::dispatcher::Dispatcher;
use super::session::{LoopExit, MAX_BACKOFF, RealtimeSession, SessionState};
use super::tools::ToolRegistry;
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Connects a [`RealtimeSession`] to a [`Dispatcher`] and keeps it serving
/// until shutdown.
pub struct ToolBridge {
    session: RealtimeSession,
    dispatcher: Dispatcher,
    reconnect: bool,
}

impl ToolBridge {
    #[must_use]
    pub const fn new(session: RealtimeSession, dispatcher: Dispatcher, reconnect: bool) -> Self {
        Self { session, dispatcher, reconnect }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Serve until `shutdown` completes or the connection cannot be
    /// (re)established. The session is always closed before returning.
    ///
    /// # Errors
    /// Returns [`Error::Handshake`] if connecting exhausts its retries, or the
    /// transport error that ended the session when reconnecting is disabled.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let result = self.serve(&mut shutdown).await;
        self.session.close().await;
        result
    }

    async fn serve<S>(&mut self, shutdown: &mut S) -> Result<()>
    where
        S: Future<Output = ()> + Unpin,
    {
        let base = self.session.policy().backoff;
        let mut delay: Option<Duration> = None;
        loop {
            if let Some(wait) = delay {
                tracing::info!(delay = ?wait, "Waiting before reconnecting");
                if wait.is_zero() {
                    tokio::task::yield_now().await;
                }
                tokio::select! {
                    biased;
                    () = &mut *shutdown => return Ok(()),
                    () = tokio::time::sleep(wait) => {}
                }
            }

            let connected = tokio::select! {
                () = &mut *shutdown => return Ok(()),
                connected = self.session.connect() => connected,
            };
            if !connected {
                return Err(Error::Handshake(
                    "could not connect to the realtime endpoint".to_string(),
                ));
            }

            if let Err(err) = self.session.announce_tools(&self.dispatcher).await {
                if err.is_transport() && self.reconnect {
                    tracing::warn!(error = %err, "Announcement failed, reconnecting");
                    delay = Some(next_delay(delay, base));
                    continue;
                }
                return Err(err);
            }
            tracing::info!(tools = self.dispatcher.registry().len(), "Tools announced");

            let answered = self.session.answered();
            match self.session.receive_loop(&self.dispatcher, shutdown).await {
                Ok(LoopExit::Stopped) => return Ok(()),
                Ok(LoopExit::RemoteClosed) if self.reconnect => {
                    tracing::info!("Remote closed the session, reconnecting");
                }
                Ok(LoopExit::RemoteClosed) => return Ok(()),
                Err(err) if err.is_transport() && self.reconnect => {
                    tracing::warn!(error = %err, "Transport failed, reconnecting");
                }
                Err(err) => return Err(err),
            }

            // A connection that served traffic starts the backoff over.
            delay = if self.session.answered() > answered {
                Some(base)
            } else {
                Some(next_delay(delay, base))
            };
        }
    }
}

/// Doubling reconnect delay, capped at [`MAX_BACKOFF`].
fn next_delay(previous: Option<Duration>, base: Duration) -> Duration {
    previous.map_or(base, |d| d.saturating_mul(2).min(MAX_BACKOFF))
}
