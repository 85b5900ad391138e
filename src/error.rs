//! Error types shared by the outbound and inbound paths.
//!
//! # Design Decisions
//! - One enum for every failure the protocol can report, so a message can be
//!   finished with the same value that is returned to the caller
//! - `Clone` because a single failure is both returned and forwarded to the
//!   message's completion hook; non-clonable sources are held in `Arc`
//! - End-of-stream is not an error: `Protocol::receive` returns `Ok(None)`

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the protocol.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// The protocol has no usable client or destination URL.
    #[error("not initialized: {0}")]
    Uninitialized(String),

    /// A construction option was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A target URL could not be turned into a request URI.
    #[error("invalid target '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    /// A message could not be written to, or read from, the wire.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The HTTP client failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[source] Arc<hyper_util::client::legacy::Error>),

    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// The caller's deadline elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream answered outside the 2xx class.
    #[error("{code} {reason}")]
    UpstreamStatus { code: u16, reason: String },

    /// The message is neither binary nor structured.
    #[error("unknown message encoding")]
    UnknownEncoding,

    /// The inbound queue no longer accepts messages.
    #[error("receiver closed")]
    Closed,

    /// An inbound message was released without being finished.
    #[error("message dropped before finish")]
    Dropped,

    /// A consumer finished a message with its own failure.
    #[error("{0}")]
    Consumer(String),
}

impl ProtocolError {
    /// Build a consumer-side failure used to reject an inbound message.
    pub fn consumer(reason: impl Into<String>) -> Self {
        Self::Consumer(reason.into())
    }

    pub(crate) fn upstream_status(status: hyper::StatusCode) -> Self {
        Self::UpstreamStatus {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uninitialized(_) => "uninitialized",
            Self::Config(_) => "config",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::Serialization(_) => "serialization",
            Self::Transport(_) => "transport",
            Self::Cancelled => "cancelled",
            Self::Timeout(_) => "timeout",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::UnknownEncoding => "unknown_encoding",
            Self::Closed => "closed",
            Self::Dropped => "dropped",
            Self::Consumer(_) => "consumer",
        }
    }
}

impl From<hyper_util::client::legacy::Error> for ProtocolError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
