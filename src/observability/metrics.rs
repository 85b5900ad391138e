//! Metrics collection and exposition.
//!
//! # Metrics
//! - `event_outbound_requests_total` (counter): outbound requests by outcome
//! - `event_outbound_duration_seconds` (histogram): outbound latency
//! - `event_inbound_messages_total` (counter): inbound messages by outcome
//! - `event_inbound_duration_seconds` (histogram): time from request to response
//! - `event_inbound_pending` (gauge): handlers waiting for pickup or finish

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one outbound request.
pub fn record_outbound(outcome: &'static str, start_time: Instant) {
    counter!("event_outbound_requests_total", "outcome" => outcome).increment(1);
    histogram!("event_outbound_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

/// Record one completed inbound HTTP exchange.
pub fn record_inbound(outcome: &'static str, start_time: Instant) {
    counter!("event_inbound_messages_total", "outcome" => outcome).increment(1);
    histogram!("event_inbound_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

/// Counts one handler blocked on the rendezvous or on completion for as long
/// as it is alive. Dropping the handler future releases it.
#[derive(Debug)]
pub struct InboundPending(());

impl InboundPending {
    pub fn enter() -> Self {
        gauge!("event_inbound_pending").increment(1.0);
        Self(())
    }
}

impl Drop for InboundPending {
    fn drop(&mut self) {
        gauge!("event_inbound_pending").decrement(1.0);
    }
}
