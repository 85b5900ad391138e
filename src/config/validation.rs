//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, methods, header names and values, ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransportConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::{HeaderName, HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::config::schema::TransportConfig;
use crate::http::compose::url_to_uri;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &TransportConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }

    let outbound = &config.outbound;
    if let Some(target) = &outbound.target {
        match Url::parse(target) {
            Ok(url) => {
                if let Err(e) = url_to_uri(&url) {
                    errors.push(ValidationError::new("outbound.target", e.to_string()));
                }
            }
            Err(e) => errors.push(ValidationError::new("outbound.target", e.to_string())),
        }
    }
    if Method::from_str(&outbound.method.to_ascii_uppercase()).is_err() {
        errors.push(ValidationError::new("outbound.method", "not an HTTP method"));
    }
    if let Some(host) = &outbound.host {
        if HeaderValue::try_from(host.as_str()).is_err() {
            errors.push(ValidationError::new("outbound.host", "not a valid header value"));
        }
    }
    for (name, value) in &outbound.headers {
        if HeaderName::try_from(name.as_str()).is_err() {
            errors.push(ValidationError::new(format!("outbound.headers.{}", name), "invalid header name"));
        }
        if HeaderValue::try_from(value.as_str()).is_err() {
            errors.push(ValidationError::new(format!("outbound.headers.{}", name), "invalid header value"));
        }
    }
    if outbound.timeout_secs == Some(0) {
        errors.push(ValidationError::new("outbound.timeout_secs", "must be greater than zero"));
    }

    if config.shutdown.timeout_secs == 0 {
        errors.push(ValidationError::new("shutdown.timeout_secs", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
