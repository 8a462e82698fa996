//! Metrics helper for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    EVENTS_ABORTED_TOTAL, EVENTS_RECEIVED_TOTAL, NOTIFICATIONS_FAILED_TOTAL,
    NOTIFICATIONS_MATCHED_TOTAL, NOTIFICATIONS_SENT_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording alert pipeline metrics
pub struct AlertMetrics;

impl AlertMetrics {
    pub fn record_received() {
        EVENTS_RECEIVED_TOTAL.inc();
    }

    /// Record an event dropped as a whole (`decode`, `directory`)
    pub fn record_aborted(reason: &str) {
        EVENTS_ABORTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn record_matched() {
        NOTIFICATIONS_MATCHED_TOTAL.inc();
    }

    pub fn record_sent() {
        NOTIFICATIONS_SENT_TOTAL.inc();
    }

    /// Record a lost notification (`render`, `dispatch`)
    pub fn record_failed(stage: &str) {
        NOTIFICATIONS_FAILED_TOTAL.with_label_values(&[stage]).inc();
    }
}
