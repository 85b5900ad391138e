//! HTTP message adapter.
//!
//! # Responsibilities
//! - Wrap headers + body as a `Message`, detecting the encoding once
//! - Carry an optional reply on the inbound side
//! - Run the completion hook when the message is finished

use axum::body::{self, Body, Bytes};
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Request, Response};

use crate::binding::encoding::SPEC_VERSION_HEADER;
use crate::binding::{Encoding, Message};
use crate::error::ProtocolError;
use crate::http::headers::strip_hop_by_hop;

/// Completion hook. Receives the finish error and the detached reply, if any.
pub type OnFinish =
    Box<dyn FnOnce(Option<&ProtocolError>, Option<Box<dyn Message>>) -> Result<(), ProtocolError> + Send>;

/// A message backed by HTTP headers and a body.
pub struct HttpMessage {
    headers: HeaderMap,
    body: Option<Body>,
    encoding: Encoding,
    response: Option<Box<dyn Message>>,
    on_finish: Option<OnFinish>,
}

impl HttpMessage {
    /// Adapt a header set and body, e.g. from an upstream response.
    pub fn new(headers: HeaderMap, body: Body) -> Self {
        let encoding = Encoding::detect(&headers);
        Self {
            headers,
            body: Some(body),
            encoding,
            response: None,
            on_finish: None,
        }
    }

    /// Adapt a received HTTP request. Connection-level headers are dropped.
    pub fn from_request(request: Request<Body>) -> Self {
        let (mut parts, body) = request.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Self::new(parts.headers, body)
    }

    /// Adapt an upstream response the same way.
    pub fn from_response(response: Response<Body>) -> Self {
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Self::new(parts.headers, body)
    }

    /// Build a binary-mode message from attributes and data.
    ///
    /// Each attribute becomes a `ce-<name>` header; `specversion` defaults
    /// to `1.0`.
    pub fn binary<'a>(
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Result<Self, ProtocolError> {
        let mut headers = HeaderMap::new();
        for (name, value) in attributes {
            let name = format!("ce-{}", name.to_ascii_lowercase());
            let header = HeaderName::try_from(name.as_str())
                .map_err(|e| ProtocolError::Serialization(format!("attribute '{}': {}", name, e)))?;
            let value = HeaderValue::try_from(value)
                .map_err(|e| ProtocolError::Serialization(format!("attribute '{}': {}", name, e)))?;
            headers.insert(header, value);
        }
        if !headers.contains_key(SPEC_VERSION_HEADER) {
            headers.insert(
                SPEC_VERSION_HEADER,
                HeaderValue::from_static("1.0"),
            );
        }
        if let Some(content_type) = content_type {
            let value = HeaderValue::try_from(content_type)
                .map_err(|e| ProtocolError::Serialization(format!("content type: {}", e)))?;
            headers.insert(CONTENT_TYPE, value);
        }
        Ok(Self::new(headers, Body::from(data.into())))
    }

    /// Build a structured-mode message from an already serialized event.
    pub fn structured(event: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json"),
        );
        Self::new(headers, Body::from(event.into()))
    }

    /// Binary-mode attribute value (`ce-<name>` header).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.headers
            .get(format!("ce-{}", name.to_ascii_lowercase()))
            .and_then(|v| v.to_str().ok())
    }

    /// Buffer and take the whole body.
    pub async fn read_body(&mut self) -> Result<Bytes, ProtocolError> {
        let body = self
            .body
            .take()
            .ok_or_else(|| ProtocolError::Serialization("message body already consumed".to_string()))?;
        body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| ProtocolError::Serialization(format!("failed to read body: {}", e)))
    }

    /// Attach a reply; it is written when this message is finished.
    pub fn respond(&mut self, reply: Box<dyn Message>) {
        self.response = Some(reply);
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Install the completion hook, replacing any previous one.
    pub fn set_on_finish(&mut self, hook: OnFinish) {
        self.on_finish = Some(hook);
    }
}

impl Message for HttpMessage {
    fn read_encoding(&self) -> Encoding {
        self.encoding
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    fn finish(mut self: Box<Self>, err: Option<&ProtocolError>) -> Result<(), ProtocolError> {
        let response = self.response.take();
        match self.on_finish.take() {
            Some(hook) => hook(err, response),
            None => {
                if let Some(response) = response {
                    response.finish(err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for HttpMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessage")
            .field("encoding", &self.encoding)
            .field("headers", &self.headers)
            .field("body_taken", &self.body.is_none())
            .field("has_response", &self.response.is_some())
            .field("has_on_finish", &self.on_finish.is_some())
            .finish()
    }
}
