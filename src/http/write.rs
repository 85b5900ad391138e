//! Serializing messages onto HTTP requests and responses.

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};

use crate::binding::{Encoding, Message, TransformerFactories};
use crate::error::ProtocolError;
use crate::http::compose::OutboundRequest;
use crate::http::headers::overwrite_headers;

/// Headers and body of a message after the transformer chain ran.
fn encode(
    message: &mut dyn Message,
    base: HeaderMap,
    transformers: &TransformerFactories,
) -> Result<(HeaderMap, Body), ProtocolError> {
    let encoding = message.read_encoding();
    if encoding == Encoding::Unknown {
        return Err(ProtocolError::UnknownEncoding);
    }

    let mut headers = base;
    overwrite_headers(message.headers(), &mut headers);
    transformers.apply(encoding, &mut headers)?;

    let body = message
        .take_body()
        .ok_or_else(|| ProtocolError::Serialization("message body already consumed".to_string()))?;
    Ok((headers, body))
}

/// Write `message` onto a composed request. Message headers replace template
/// values of the same name.
pub fn write_request(
    message: &mut dyn Message,
    mut request: OutboundRequest,
    transformers: &TransformerFactories,
) -> Result<axum::http::Request<Body>, ProtocolError> {
    let base = std::mem::take(&mut request.headers);
    let (headers, body) = encode(message, base, transformers)?;
    request.headers = headers;
    request.into_http(body)
}

/// Write `message` as a `200 OK` response.
pub fn write_response(
    message: &mut dyn Message,
    transformers: &TransformerFactories,
) -> Result<Response<Body>, ProtocolError> {
    let (headers, body) = encode(message, HeaderMap::new(), transformers)?;
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    Ok(response)
}
