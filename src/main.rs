use std::sync::Arc;

use anyhow::Context;
use rt_tool_bridge::builtin::register_builtins;
use rt_tool_bridge::{Bridge, Config, ToolRegistry};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err).context("failed to load .env");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rt_tool_bridge=info,info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(?config, "Starting tool bridge");

    let registry = Arc::new(ToolRegistry::new());
    register_builtins(&registry);

    let bridge = Bridge::builder().config(config).registry(registry).build()?;
    bridge.run(shutdown_signal()).await?;

    tracing::info!("Tool bridge stopped");
    Ok(())
}
