//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Protocol (outbound + inbound)
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric calls are no-ops until a recorder is installed, so library
//!   users and tests pay nothing by default
//! - Log level comes from `RUST_LOG` first, then configuration

pub mod logging;
pub mod metrics;
