//! Per-call context for outbound operations.
//!
//! # Responsibilities
//! - Carry a call-site target URL that overrides configured targets
//! - Carry cancellation (token) and a deadline for the HTTP call
//!
//! # Design Decisions
//! - Only the outbound path reads the context; inbound rendezvous waits are
//!   not cancellable
//! - Cancellation wins over completion when both are ready

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ProtocolError;

/// Call-scoped values consulted by `Protocol::send` and `Protocol::request`.
#[derive(Debug, Clone, Default)]
pub struct Context {
    target: Option<Url>,
    cancellation: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send to `target` instead of the configured URL.
    pub fn with_target(mut self, target: Url) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Target override, if any.
    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Drive `fut` under this context's deadline and cancellation.
    pub(crate) async fn run<F>(&self, fut: F) -> Result<F::Output, ProtocolError>
    where
        F: Future,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| ProtocolError::Timeout(limit)),
                None => Ok(fut.await),
            }
        };

        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ProtocolError::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }
}
