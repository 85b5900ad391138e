//! Outbound request composition.
//!
//! # Data Flow
//! ```text
//! empty request (fresh header set)
//!     → request template (method, url, host, close, headers appended)
//!     → static target (url only)
//!     → context target (url only, highest priority)
//!     → wire request (Request<Body>)
//! ```

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri};
use url::Url;

use crate::context::Context;
use crate::error::ProtocolError;
use crate::http::headers::copy_headers;

/// Defaults for every outbound request.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub url: Option<Url>,
    /// Overrides the `Host` header derived from the URL.
    pub host: Option<String>,
    /// Ask the server to close the connection after the exchange.
    pub close: bool,
    pub headers: HeaderMap,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self {
            method: Method::POST,
            url: None,
            host: None,
            close: false,
            headers: HeaderMap::new(),
        }
    }
}

/// A request resolved from template, target and context, before a body is attached.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Option<Url>,
    pub host: Option<String>,
    pub close: bool,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    /// Layer the three sources; later layers win.
    pub fn compose(template: Option<&RequestTemplate>, target: Option<&Url>, ctx: &Context) -> Self {
        let mut req = Self {
            method: Method::POST,
            url: None,
            host: None,
            close: false,
            headers: HeaderMap::new(),
        };

        if let Some(template) = template {
            req.method = template.method.clone();
            req.url = template.url.clone();
            req.host = template.host.clone();
            req.close = template.close;
            copy_headers(Some(&template.headers), &mut req.headers);
        }

        if let Some(target) = target {
            req.url = Some(target.clone());
        }

        // Call-site context beats both configured sources
        if let Some(target) = ctx.target() {
            req.url = Some(target.clone());
        }

        req
    }

    /// Build the wire request.
    pub fn into_http(self, body: Body) -> Result<Request<Body>, ProtocolError> {
        let url = self
            .url
            .ok_or_else(|| ProtocolError::Uninitialized("no target URL configured".to_string()))?;
        let uri = url_to_uri(&url)?;

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;

        if let Some(host) = self.host {
            let value = HeaderValue::try_from(host.as_str()).map_err(|e| ProtocolError::InvalidTarget {
                url: url.to_string(),
                reason: format!("invalid host '{}': {}", host, e),
            })?;
            request.headers_mut().insert(header::HOST, value);
        }
        if self.close {
            request
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }

        Ok(request)
    }
}

/// Convert a URL to a request URI, accepting only HTTP schemes.
pub fn url_to_uri(url: &Url) -> Result<Uri, ProtocolError> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProtocolError::InvalidTarget {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            })
        }
    }
    Uri::try_from(url.as_str()).map_err(|e| ProtocolError::InvalidTarget {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
