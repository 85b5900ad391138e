//! HTTP adaptation of messages.
//!
//! # Data Flow
//! ```text
//! Outbound:
//!     compose.rs (template → target → context)
//!     → write.rs (message headers, transformers, body)
//!     → HTTP client
//!
//! Inbound:
//!     server.rs (axum, graceful shutdown)
//!     → message.rs (HttpMessage::from_request)
//!     → protocol rendezvous
//! ```

pub mod compose;
pub mod headers;
pub mod message;
pub mod server;
pub mod write;

pub use compose::{OutboundRequest, RequestTemplate};
pub use message::{HttpMessage, OnFinish};
pub use server::InboundServer;
