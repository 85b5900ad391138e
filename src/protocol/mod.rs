//! The duplex protocol object.
//!
//! # Data Flow
//! ```text
//! Outbound (caller's task):
//!     request(ctx, message)
//!         → compose (template → target → context)
//!         → write_request (transformer chain)
//!         → HttpClient → status check
//!         → HttpMessage (response), input message finished
//!
//! Inbound (one task per HTTP request):
//!     serve_http(request)
//!         → HttpMessage::from_request
//!         → install completion hook
//!         → Rendezvous::send  ── blocks until ──▶  receive() (consumer task)
//!         → await completion  ◀── finish(err) ──  consumer / downstream send
//!         → 500 on error, otherwise reply or 200
//! ```
//!
//! # Design Decisions
//! - Nothing is mutated after construction except the rendezvous state, so a
//!   `Protocol` is shared as `Arc<Protocol>` without locks
//! - The HTTP client is injected or taken from a process-wide default that is
//!   built once and never changed
//! - The response to an inbound request is produced strictly after `finish`

mod inbound;
mod options;
mod outbound;
pub mod rendezvous;

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::binding::TransformerFactories;
use crate::error::ProtocolError;
use crate::http::compose::RequestTemplate;
use crate::http::HttpMessage;

pub use inbound::CANNOT_FORWARD;
pub use options::{ProtocolBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use rendezvous::Rendezvous;

/// Client used for outbound requests.
pub type HttpClient = Client<HttpConnector, Body>;

/// Item moved from an HTTP handler to `receive`.
type Incoming = Result<HttpMessage, ProtocolError>;

/// Process-wide client shared by every protocol built without one.
pub fn default_client() -> HttpClient {
    static DEFAULT_CLIENT: OnceLock<HttpClient> = OnceLock::new();
    DEFAULT_CLIENT
        .get_or_init(|| Client::builder(TokioExecutor::new()).build(HttpConnector::new()))
        .clone()
}

/// HTTP client and HTTP handler in one object.
pub struct Protocol {
    target: Option<Url>,
    template: Option<RequestTemplate>,
    transformers: TransformerFactories,
    client: HttpClient,
    incoming: Rendezvous<Incoming>,
    shutdown_timeout: Duration,
}

impl Protocol {
    /// Start configuring a protocol.
    pub fn builder() -> ProtocolBuilder {
        ProtocolBuilder::new()
    }

    /// Static target URL, if configured.
    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    pub fn request_template(&self) -> Option<&RequestTemplate> {
        self.template.as_ref()
    }

    pub fn transformers(&self) -> &TransformerFactories {
        &self.transformers
    }

    /// Grace period given to in-flight inbound requests on shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("target", &self.target.as_ref().map(Url::as_str))
            .field("template", &self.template)
            .field("transformers", &self.transformers.len())
            .field("incoming", &self.incoming)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}
