//! Outbound path: `send` and `request`.

use std::time::Instant;

use axum::body::Body;
use axum::http::Request;

use crate::binding::Message;
use crate::context::Context;
use crate::error::ProtocolError;
use crate::http::compose::OutboundRequest;
use crate::http::write::write_request;
use crate::http::HttpMessage;
use crate::observability::metrics;
use crate::protocol::Protocol;

/// Finishes the input message exactly once, even if the request future is
/// dropped mid-flight.
struct FinishGuard {
    message: Option<Box<dyn Message>>,
}

impl FinishGuard {
    fn new(message: Box<dyn Message>) -> Self {
        Self { message: Some(message) }
    }

    fn finish(mut self, err: Option<&ProtocolError>) {
        if let Some(message) = self.message.take() {
            if let Err(e) = message.finish(err) {
                tracing::warn!(error = %e, "Failed to finish outbound message");
            }
        }
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if let Some(message) = self.message.take() {
            tracing::debug!("Outbound request abandoned, finishing message as cancelled");
            if let Err(e) = message.finish(Some(&ProtocolError::Cancelled)) {
                tracing::warn!(error = %e, "Failed to finish abandoned outbound message");
            }
        }
    }
}

impl Protocol {
    /// Send `message` and discard the reply.
    ///
    /// The reply body is read to the end so the connection can be reused.
    pub async fn send(&self, ctx: &Context, message: Box<dyn Message>) -> Result<(), ProtocolError> {
        let mut reply = self.request(ctx, message).await?;
        let drained = ctx.run(reply.read_body()).await.and_then(|body| body);
        if let Err(e) = &drained {
            tracing::debug!(error = %e, "Failed to drain reply body");
        }
        if let Err(e) = Box::new(reply).finish(drained.err().as_ref()) {
            tracing::warn!(error = %e, "Failed to finish reply message");
        }
        Ok(())
    }

    /// Send `message` and return the upstream reply as a message.
    ///
    /// The input message is finished with the outcome on every path. The
    /// returned message owns the live response body; the caller finishes it.
    pub async fn request(&self, ctx: &Context, mut message: Box<dyn Message>) -> Result<HttpMessage, ProtocolError> {
        let start_time = Instant::now();

        // Writing is synchronous, so the guard exists before the first await
        let prepared = self.prepare(ctx, &mut *message);
        let guard = FinishGuard::new(message);

        let result = match prepared {
            Ok(request) => self.exchange(ctx, request).await,
            Err(e) => Err(e),
        };
        guard.finish(result.as_ref().err());

        match &result {
            Ok(_) => metrics::record_outbound("success", start_time),
            Err(e) => metrics::record_outbound(e.kind(), start_time),
        }
        result
    }

    /// Resolve the request from template, static target and context.
    pub fn make_request(&self, ctx: &Context) -> OutboundRequest {
        OutboundRequest::compose(self.template.as_ref(), self.target.as_ref(), ctx)
    }

    fn prepare(&self, ctx: &Context, message: &mut dyn Message) -> Result<Request<Body>, ProtocolError> {
        let composed = self.make_request(ctx);
        if composed.url.is_none() {
            return Err(ProtocolError::Uninitialized(format!("no target URL: {:?}", self)));
        }
        write_request(message, composed, &self.transformers)
    }

    async fn exchange(&self, ctx: &Context, request: Request<Body>) -> Result<HttpMessage, ProtocolError> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        tracing::debug!(method = %method, uri = %uri, "Sending message");

        let response = ctx.run(self.client.request(request)).await??;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(method = %method, uri = %uri, status = %status, "Upstream rejected message");
            // Dropping the response discards the body
            return Err(ProtocolError::upstream_status(status));
        }

        tracing::debug!(uri = %uri, status = %status, "Upstream accepted message");
        Ok(HttpMessage::from_response(response.map(Body::new)))
    }
}
