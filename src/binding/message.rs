//! The message contract consumed by the protocol.

use axum::body::Body;
use axum::http::HeaderMap;

use crate::binding::Encoding;
use crate::error::ProtocolError;

/// A structured payload that can travel over HTTP.
///
/// Implementations own their body until it is taken for writing. Every
/// message handed to the protocol is finished exactly once: by the outbound
/// path after its HTTP call, or by whoever consumes an inbound message.
pub trait Message: Send + std::fmt::Debug {
    /// Wire encoding of this message.
    fn read_encoding(&self) -> Encoding;

    /// Metadata carried as HTTP headers.
    fn headers(&self) -> &HeaderMap;

    /// Take the payload. Returns `None` once the body has been taken.
    fn take_body(&mut self) -> Option<Body>;

    /// End the message's lifecycle.
    ///
    /// `err` is the outcome of processing; `None` means success. Resources
    /// held by the message are released when this returns.
    fn finish(self: Box<Self>, err: Option<&ProtocolError>) -> Result<(), ProtocolError>;
}
