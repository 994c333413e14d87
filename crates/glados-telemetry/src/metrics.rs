//! Metric names and the synthesis instruments

use std::time::Instant;

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    let duration = start.elapsed().as_secs_f64();
    histogram.record(duration, attributes);
}

pub const SYNTHESIS_COUNT: &str = "tts.synthesis.count";
pub const SYNTHESIS_DURATION: &str = "tts.synthesis.duration";

/// Attribute telling cache hits from fresh synthesis
pub const CACHE_ATTRIBUTE: &str = "cache";

/// Instruments for completed synthesis requests
///
/// Backed by the global meter provider; without an exporter the
/// measurements are dropped.
#[derive(Clone)]
pub struct SynthesisMetrics {
    count: Counter<u64>,
    duration: Histogram<f64>,
}

impl SynthesisMetrics {
    pub fn new() -> Self {
        let meter = global::meter("glados");

        Self {
            count: meter
                .u64_counter(SYNTHESIS_COUNT)
                .with_description("Completed synthesis requests")
                .build(),
            duration: meter
                .f64_histogram(SYNTHESIS_DURATION)
                .with_description("Synthesis request duration")
                .with_unit("s")
                .build(),
        }
    }

    pub fn record(&self, from_cache: bool, start: Instant) {
        let attributes = [KeyValue::new(CACHE_ATTRIBUTE, if from_cache { "hit" } else { "miss" })];

        self.count.add(1, &attributes);
        record_duration(&self.duration, start, &attributes);
    }
}

impl Default for SynthesisMetrics {
    fn default() -> Self {
        Self::new()
    }
}
