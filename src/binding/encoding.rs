//! Wire encoding detection.
//!
//! # Design Decisions
//! - Structured mode is recognised by media type, binary mode by the
//!   `ce-specversion` header; structured wins when both are present
//! - Batches are not supported and classify as unknown

use axum::http::{header::CONTENT_TYPE, HeaderMap};

/// Media type prefix of a structured-mode message.
pub const STRUCTURED_MEDIA_TYPE: &str = "application/cloudevents";

/// Media type prefix of a batched message.
pub const BATCH_MEDIA_TYPE: &str = "application/cloudevents-batch";

/// Header carrying the spec version of a binary-mode message.
pub const SPEC_VERSION_HEADER: &str = "ce-specversion";

/// How a message is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Attributes in `ce-*` headers, data in the body.
    Binary,
    /// The whole event serialized in the body.
    Structured,
    /// Not recognisable as an event.
    Unknown,
}

impl Encoding {
    /// Classify a set of HTTP headers.
    pub fn detect(headers: &HeaderMap) -> Self {
        let media_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase());

        if let Some(media_type) = media_type {
            if media_type.starts_with(BATCH_MEDIA_TYPE) {
                return Encoding::Unknown;
            }
            if media_type.starts_with(STRUCTURED_MEDIA_TYPE) {
                return Encoding::Structured;
            }
        }

        if headers.contains_key(SPEC_VERSION_HEADER) {
            Encoding::Binary
        } else {
            Encoding::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Binary => "binary",
            Encoding::Structured => "structured",
            Encoding::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_binary_detection() {
        let map = headers(&[("ce-specversion", "1.0"), ("content-type", "text/plain")]);
        assert_eq!(Encoding::detect(&map), Encoding::Binary);
    }

    #[test]
    fn test_structured_detection() {
        let map = headers(&[("content-type", "application/cloudevents+json; charset=utf-8")]);
        assert_eq!(Encoding::detect(&map), Encoding::Structured);

        // Media type wins over a stray binary header
        let map = headers(&[
            ("content-type", "Application/CloudEvents+json"),
            ("ce-specversion", "1.0"),
        ]);
        assert_eq!(Encoding::detect(&map), Encoding::Structured);
    }

    #[test]
    fn test_unknown_detection() {
        assert_eq!(Encoding::detect(&HeaderMap::new()), Encoding::Unknown);

        let map = headers(&[("content-type", "application/json")]);
        assert_eq!(Encoding::detect(&map), Encoding::Unknown);

        let map = headers(&[("content-type", "application/cloudevents-batch+json")]);
        assert_eq!(Encoding::detect(&map), Encoding::Unknown);
    }
}
