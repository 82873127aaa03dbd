//! # chainpretty-observability
//!
//! Structured logging and OpenTelemetry counters for ChainPretty.
//!
//! ## Built-in metrics
//! - `chainpretty.events_decoded`    counter, tagged with chain
//! - `chainpretty.events_skipped`    counter, tagged with chain + reason
//! - `chainpretty.render_failures`   counter, tagged with chain
//! - `chainpretty.batches_sent`      counter, tagged with sink
//! - `chainpretty.delivery_failures` counter, tagged with sink

pub mod metrics;
pub mod tracing_setup;

pub use metrics::PrettyMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
