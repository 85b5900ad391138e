//! Bidirectional HTTP transport for structured event messages.
//!
//! A [`Protocol`] is at once an HTTP client (`send`, `request`) and an HTTP
//! handler (`serve_http`, `receive`). Inbound requests are handed one at a
//! time to a pull-based consumer; the HTTP response is written once the
//! consumer finishes the message.

pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod observability;
pub mod protocol;

pub use binding::{Encoding, Message};
pub use config::TransportConfig;
pub use context::Context;
pub use error::{ProtocolError, ProtocolResult};
pub use http::{HttpMessage, InboundServer, RequestTemplate};
pub use protocol::{HttpClient, Protocol, ProtocolBuilder};
