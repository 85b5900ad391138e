//! Header copy helpers.
//!
//! # Design Decisions
//! - Copying is additive (`append`): repeated values accumulate
//! - A missing or empty source is a no-op

use axum::http::{header, HeaderMap, HeaderName};

/// Headers that describe one connection or its framing. They never travel
/// with a message.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::HOST,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

/// Remove hop-by-hop and framing headers from a received header set.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append every value of `from` onto `to`.
pub fn copy_headers(from: Option<&HeaderMap>, to: &mut HeaderMap) {
    let Some(from) = from else { return };
    if from.is_empty() {
        return;
    }
    to.reserve(from.len());
    for (name, value) in from.iter() {
        to.append(name.clone(), value.clone());
    }
}

/// Replace the values of every header name present in `from`.
///
/// Used when a message's own metadata must win over template defaults.
pub fn overwrite_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        to.remove(name);
    }
    copy_headers(Some(from), to);
}
