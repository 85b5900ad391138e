//! Event relay.
//!
//! Accepts events over HTTP and either forwards each one to the configured
//! outbound target or, without a target, echoes it back as the reply.
//!
//! ```text
//!   HTTP client ──▶ InboundServer ──▶ Protocol::receive ──▶ relay loop
//!                                                              │
//!              ◀── 200 / reply / 500 ◀── finish ◀──────────────┤
//!                                                              ▼
//!                                                   Protocol::send ──▶ target
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use event_http_protocol::config::{load_config, TransportConfig};
use event_http_protocol::observability::{logging, metrics};
use event_http_protocol::{Context, HttpMessage, InboundServer, Message, Protocol, ProtocolBuilder, ProtocolError};

#[derive(Parser, Debug)]
#[command(name = "event-relay", version, about = "Relay events received over HTTP")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TransportConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("event-relay v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = ?config.outbound.target,
        shutdown_timeout_secs = config.shutdown.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let protocol = Arc::new(ProtocolBuilder::from_config(&config).build()?);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = CancellationToken::new();
    let server = InboundServer::new(Arc::clone(&protocol));
    let server_task = tokio::spawn(server.run(listener, shutdown.clone()));

    let mut ctx = Context::new().with_cancellation(shutdown.clone());
    if let Some(secs) = config.outbound.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    let relay_task = tokio::spawn(relay(Arc::clone(&protocol), ctx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    server_task.await??;
    relay_task.await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Consume inbound messages until the protocol is closed.
async fn relay(protocol: Arc<Protocol>, ctx: Context) {
    let forward = protocol.target().is_some();

    loop {
        let mut message = match protocol.receive().await {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Inbound notification");
                continue;
            }
        };

        tracing::info!(
            id = message.attribute("id").unwrap_or("-"),
            event_type = message.attribute("type").unwrap_or("-"),
            encoding = %message.read_encoding(),
            "Event received"
        );

        if forward {
            let protocol = Arc::clone(&protocol);
            let ctx = ctx.clone();
            // Finishing happens inside send; an upstream failure becomes the inbound 500
            tokio::spawn(async move {
                if let Err(e) = protocol.send(&ctx, Box::new(message)).await {
                    tracing::warn!(error = %e, "Forwarding failed");
                }
            });
            continue;
        }

        let echoed = echo(&mut message).await;
        let outcome = echoed.as_ref().err().cloned();
        if let Ok(reply) = echoed {
            message.respond(Box::new(reply));
        }
        if let Err(e) = Box::new(message).finish(outcome.as_ref()) {
            tracing::warn!(error = %e, "Failed to finish message");
        }
    }

    tracing::info!("Relay loop stopped");
}

/// Copy of `message` used as its own reply.
async fn echo(message: &mut HttpMessage) -> Result<HttpMessage, ProtocolError> {
    let headers = message.headers().clone();
    let body = message.read_body().await?;
    Ok(HttpMessage::new(headers, body.into()))
}
