//! Inbound path: the HTTP handler and `receive`.
//!
//! # Responsibilities
//! - Adapt each HTTP request into a message and hand it to a consumer
//! - Hold the HTTP exchange open until the consumer finishes the message
//! - Turn the completion into the HTTP response
//!
//! # Design Decisions
//! - A message of unknown encoding is announced with an error entry and then
//!   still delivered, so consumers observe two entries for it
//! - No timeout: an unfinished message keeps its HTTP request waiting; a
//!   message dropped without `finish` answers 500

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::sync::oneshot;

use crate::binding::{Encoding, Message};
use crate::error::ProtocolError;
use crate::http::write::write_response;
use crate::http::HttpMessage;
use crate::observability::metrics;
use crate::protocol::Protocol;

/// Prefix of the body written when an inbound message fails.
pub const CANNOT_FORWARD: &str = "cannot forward CloudEvent";

/// Outcome of an inbound message, sent from its completion hook.
struct Completion {
    error: Option<ProtocolError>,
    reply: Option<Result<Response, ProtocolError>>,
}

impl Protocol {
    /// Next inbound message.
    ///
    /// `Ok(None)` means the protocol was closed and no more input will
    /// arrive. `Err` carries a notification published by the handler. The
    /// caller must finish every message it receives.
    pub async fn receive(&self) -> Result<Option<HttpMessage>, ProtocolError> {
        self.incoming.recv().await.transpose()
    }

    /// Stop accepting inbound messages; `receive` reports end-of-stream once
    /// pending handoffs are drained.
    pub fn close(&self) {
        if !self.incoming.is_closed() {
            tracing::info!("Inbound queue closed");
        }
        self.incoming.close();
    }

    /// Handle one HTTP request. Resolves after the message has been finished.
    pub async fn serve_http(&self, request: Request<Body>) -> Response {
        let start_time = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut message = HttpMessage::from_request(request);
        let encoding = message.read_encoding();
        tracing::debug!(method = %method, path = %path, encoding = %encoding, "Inbound message");

        if encoding == Encoding::Unknown {
            tracing::warn!(method = %method, path = %path, "Inbound message has unknown encoding");
            if let Err(e) = self.incoming.send(Err(ProtocolError::UnknownEncoding)).await {
                return self.reject(&e, start_time);
            }
        }

        let (done_tx, done_rx) = oneshot::channel::<Completion>();
        let transformers = self.transformers.clone();
        message.set_on_finish(Box::new(move |err: Option<&ProtocolError>, reply: Option<Box<dyn Message>>| {
            let reply = match (err, reply) {
                (_, None) => None,
                // A failed message answers 500, so its reply never reaches the wire
                (Some(e), Some(reply)) => {
                    finish_reply(reply, Some(e));
                    None
                }
                (None, Some(mut reply)) => {
                    let written = write_response(&mut *reply, &transformers);
                    finish_reply(reply, written.as_ref().err());
                    Some(written)
                }
            };
            let completion = Completion {
                error: err.cloned(),
                reply,
            };
            if done_tx.send(completion).is_err() {
                tracing::debug!("HTTP exchange ended before the message was finished");
            }
            Ok(())
        }));

        let completion = {
            let _pending = metrics::InboundPending::enter();
            match self.incoming.send(Ok(message)).await {
                Ok(()) => done_rx.await.map_err(|_| ProtocolError::Dropped),
                Err(e) => Err(e),
            }
        };

        match completion {
            Ok(Completion { error: Some(e), .. }) => self.reject(&e, start_time),
            Ok(Completion { error: None, reply: Some(Err(e)) }) => self.reject(&e, start_time),
            Ok(Completion { error: None, reply: Some(Ok(response)) }) => {
                metrics::record_inbound("replied", start_time);
                response
            }
            Ok(Completion { error: None, reply: None }) => {
                metrics::record_inbound("accepted", start_time);
                StatusCode::OK.into_response()
            }
            Err(e) => self.reject(&e, start_time),
        }
    }

    /// Router serving every path and method with [`Protocol::serve_http`].
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/", any(serve_http_handler))
            .route("/{*path}", any(serve_http_handler))
            .with_state(Arc::clone(self))
    }

    fn reject(&self, err: &ProtocolError, start_time: Instant) -> Response {
        tracing::warn!(error = %err, "Inbound message failed");
        metrics::record_inbound(err.kind(), start_time);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}: {}", CANNOT_FORWARD, err),
        )
            .into_response()
    }
}

fn finish_reply(reply: Box<dyn Message>, err: Option<&ProtocolError>) {
    if let Err(e) = reply.finish(err) {
        tracing::warn!(error = %e, "Failed to finish reply message");
    }
}

async fn serve_http_handler(State(protocol): State<Arc<Protocol>>, request: Request<Body>) -> Response {
    protocol.serve_http(request).await
}
