//! Construction options.
//!
//! # Design Decisions
//! - Each setter validates its value on the spot; the first rejection is
//!   remembered and returned by `build`, before any network activity
//! - `method` and `header` edit the request template, creating it on demand

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use url::Url;

use crate::binding::{TransformerFactories, TransformerFactory};
use crate::config::TransportConfig;
use crate::error::ProtocolError;
use crate::http::compose::{url_to_uri, RequestTemplate};
use crate::protocol::{default_client, HttpClient, Protocol, Rendezvous};

/// Time given to in-flight inbound requests when the server stops.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for [`Protocol`].
#[derive(Debug)]
pub struct ProtocolBuilder {
    target: Option<Url>,
    template: Option<RequestTemplate>,
    transformers: TransformerFactories,
    client: Option<HttpClient>,
    shutdown_timeout: Duration,
    error: Option<ProtocolError>,
}

impl Default for ProtocolBuilder {
    fn default() -> Self {
        Self {
            target: None,
            template: None,
            transformers: TransformerFactories::new(),
            client: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            error: None,
        }
    }
}

impl ProtocolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the outbound and shutdown sections of a loaded configuration.
    pub fn from_config(config: &TransportConfig) -> Self {
        let outbound = &config.outbound;
        let mut builder = Self::new()
            .shutdown_timeout(Duration::from_secs(config.shutdown.timeout_secs));

        if let Some(target) = &outbound.target {
            builder = builder.target(target);
        }
        match Method::from_str(&outbound.method.to_ascii_uppercase()) {
            Ok(method) => builder = builder.method(method),
            Err(e) => builder.fail(format!("invalid method '{}': {}", outbound.method, e)),
        }
        if let Some(host) = &outbound.host {
            builder.template_mut().host = Some(host.clone());
        }
        if outbound.close {
            builder.template_mut().close = true;
        }
        for (name, value) in &outbound.headers {
            builder = builder.header(name, value);
        }
        builder
    }

    /// Send to `target` unless the call context names another URL.
    pub fn target(mut self, target: &str) -> Self {
        match Url::parse(target) {
            Ok(url) => self = self.target_url(url),
            Err(e) => self.fail(format!("invalid target '{}': {}", target, e)),
        }
        self
    }

    pub fn target_url(mut self, target: Url) -> Self {
        match url_to_uri(&target) {
            Ok(_) => self.target = Some(target),
            Err(e) => self.fail(e.to_string()),
        }
        self
    }

    /// Use `template` for method, URL, host, close flag and headers.
    pub fn request_template(mut self, template: RequestTemplate) -> Self {
        if let Some(url) = &template.url {
            if let Err(e) = url_to_uri(url) {
                self.fail(e.to_string());
                return self;
            }
        }
        self.template = Some(template);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.template_mut().method = method;
        self
    }

    /// Append a header to every outbound request.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = match HeaderName::try_from(name) {
            Ok(name) => name,
            Err(e) => {
                self.fail(format!("invalid header name '{}': {}", name, e));
                return self;
            }
        };
        match HeaderValue::try_from(value) {
            Ok(value) => {
                self.template_mut().headers.append(name, value);
            }
            Err(e) => self.fail(format!("invalid value for header '{}': {}", name, e)),
        }
        self
    }

    /// Append a transformer to the write chain.
    pub fn transformer(mut self, factory: impl TransformerFactory + 'static) -> Self {
        self.transformers.push(Arc::new(factory));
        self
    }

    pub fn client(mut self, client: HttpClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            self.fail("shutdown timeout must be greater than zero".to_string());
        } else {
            self.shutdown_timeout = timeout;
        }
        self
    }

    pub fn build(self) -> Result<Protocol, ProtocolError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let protocol = Protocol {
            target: self.target,
            template: self.template,
            transformers: self.transformers,
            client: self.client.unwrap_or_else(default_client),
            incoming: Rendezvous::new(),
            shutdown_timeout: self.shutdown_timeout,
        };

        tracing::debug!(
            target_url = ?protocol.target().map(Url::as_str),
            transformers = protocol.transformers().len(),
            "Protocol constructed"
        );
        Ok(protocol)
    }

    fn template_mut(&mut self) -> &mut RequestTemplate {
        self.template.get_or_insert_with(RequestTemplate::default)
    }

    fn fail(&mut self, reason: String) {
        if self.error.is_none() {
            self.error = Some(ProtocolError::Config(reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SetHeader;

    #[test]
    fn test_defaults() {
        let protocol = ProtocolBuilder::new().build().unwrap();
        assert!(protocol.target().is_none());
        assert!(protocol.request_template().is_none());
        assert!(protocol.transformers().is_empty());
        assert_eq!(protocol.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn test_options_applied() {
        let protocol = Protocol::builder()
            .target("http://sink.local/events")
            .method(Method::PUT)
            .header("x-a", "1")
            .header("x-a", "2")
            .transformer(SetHeader::attribute("source", "/relay").unwrap())
            .shutdown_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(protocol.target().unwrap().as_str(), "http://sink.local/events");
        let template = protocol.request_template().unwrap();
        assert_eq!(template.method, Method::PUT);
        assert_eq!(template.headers.get_all("x-a").iter().count(), 2);
        assert_eq!(protocol.transformers().len(), 1);
        assert_eq!(protocol.shutdown_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_options_fail_build() {
        let cases = [
            Protocol::builder().target("not a url"),
            Protocol::builder().target("ftp://files.local/"),
            Protocol::builder().header("bad header", "x"),
            Protocol::builder().shutdown_timeout(Duration::ZERO),
        ];
        for builder in cases {
            assert!(matches!(builder.build(), Err(ProtocolError::Config(_))));
        }
    }

    #[test]
    fn test_first_error_wins() {
        let err = Protocol::builder()
            .target("nope")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid target"));
    }

    #[test]
    fn test_from_config() {
        let mut config = TransportConfig::default();
        config.outbound.target = Some("http://sink.local/".into());
        config.outbound.method = "patch".into();
        config.outbound.close = true;
        config.outbound.headers.insert("x-env".into(), "test".into());

        let protocol = ProtocolBuilder::from_config(&config).build().unwrap();
        let template = protocol.request_template().unwrap();
        assert_eq!(template.method, Method::PATCH);
        assert!(template.close);
        assert_eq!(template.headers.get("x-env").unwrap(), "test");
    }
}
