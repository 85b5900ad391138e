//! Inbound HTTP server.
//!
//! # Responsibilities
//! - Bind the protocol's router to a listener
//! - Wire up tracing middleware
//! - Stop gracefully on a cancellation token, bounded by the shutdown timeout
//! - Close the protocol so consumers observe end-of-stream

use std::future::IntoFuture;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::protocol::Protocol;

/// Serves a [`Protocol`] as an HTTP endpoint.
pub struct InboundServer {
    protocol: Arc<Protocol>,
    router: Router,
}

impl InboundServer {
    pub fn new(protocol: Arc<Protocol>) -> Self {
        let router = protocol.router().layer(TraceLayer::new_for_http());
        Self { protocol, router }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Handlers still waiting for their message to be finished get the
    /// protocol's shutdown timeout; after that the server is dropped.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Inbound server starting");

        let grace = self.protocol.shutdown_timeout();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future();
        tokio::pin!(serve);

        let drain_deadline = async {
            shutdown.cancelled().await;
            tracing::info!(grace_secs = grace.as_secs(), "Shutdown signal received, draining");
            tokio::time::sleep(grace).await;
        };

        let result = tokio::select! {
            result = &mut serve => result,
            _ = drain_deadline => {
                tracing::warn!("Shutdown timeout elapsed with requests still in flight");
                Ok(())
            }
        };

        self.protocol.close();
        tracing::info!("Inbound server stopped");
        result
    }
}

impl std::fmt::Debug for InboundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundServer")
            .field("protocol", &self.protocol)
            .finish()
    }
}
