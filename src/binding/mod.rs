//! Message abstraction shared by both directions of the protocol.
//!
//! # Data Flow
//! ```text
//! Outbound:
//!     caller's Message
//!         → write_request (headers + transformer chain + body)
//!         → HTTP request
//!
//! Inbound:
//!     HTTP request
//!         → HttpMessage::from_request (encoding detected here)
//!         → consumer
//!         → finish(err) → completion hook
//! ```
//!
//! # Design Decisions
//! - `finish` consumes the boxed message, so it can run at most once
//! - Transformers only rewrite metadata; payload bytes pass through untouched

pub mod encoding;
pub mod message;
pub mod transformer;

pub use encoding::Encoding;
pub use message::Message;
pub use transformer::{RemoveHeader, SetHeader, Transformer, TransformerFactories, TransformerFactory};
