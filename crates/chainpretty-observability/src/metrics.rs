//! Pipeline counters.
//!
//! Exported through whatever meter provider the host installs; without one
//! the global no-op provider makes every call free.

use opentelemetry::{
    global,
    metrics::{Counter, Meter},
    KeyValue,
};

#[derive(Clone)]
pub struct PrettyMetrics {
    pub events_decoded: Counter<u64>,
    pub events_skipped: Counter<u64>,
    pub render_failures: Counter<u64>,
    pub batches_sent: Counter<u64>,
    pub delivery_failures: Counter<u64>,
}

impl PrettyMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            events_decoded: meter
                .u64_counter("chainpretty.events_decoded")
                .with_description("Logs decoded into events")
                .build(),
            events_skipped: meter
                .u64_counter("chainpretty.events_skipped")
                .with_description("Events or logs dropped before rendering")
                .build(),
            render_failures: meter
                .u64_counter("chainpretty.render_failures")
                .with_description("Events whose templates all failed to render")
                .build(),
            batches_sent: meter
                .u64_counter("chainpretty.batches_sent")
                .with_description("Messages handed to the delivery sink")
                .build(),
            delivery_failures: meter
                .u64_counter("chainpretty.delivery_failures")
                .with_description("Messages the sink did not accept")
                .build(),
        }
    }

    /// Metrics on the global meter provider.
    pub fn global() -> Self {
        Self::new(&global::meter("chainpretty"))
    }

    pub fn record_decoded(&self, chain: &str, count: u64) {
        self.events_decoded
            .add(count, &[KeyValue::new("chain", chain.to_string())]);
    }

    /// `reason`: "unknown_topic", "no_template", ...
    pub fn record_skipped(&self, chain: &str, reason: &'static str, count: u64) {
        self.events_skipped.add(
            count,
            &[
                KeyValue::new("chain", chain.to_string()),
                KeyValue::new("reason", reason),
            ],
        );
    }

    pub fn record_render_failures(&self, chain: &str, count: u64) {
        self.render_failures
            .add(count, &[KeyValue::new("chain", chain.to_string())]);
    }

    pub fn record_delivery(&self, sink: &'static str, sent: u64, failed: u64) {
        let attrs = [KeyValue::new("sink", sink)];
        self.batches_sent.add(sent, &attrs);
        self.delivery_failures.add(failed, &attrs);
    }
}
