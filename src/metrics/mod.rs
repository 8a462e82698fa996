//! Prometheus metrics for the alerter.
//!
//! - Event metrics (received, aborted by reason)
//! - Notification metrics (sent, failed by stage)
//! - Latency of the directory fetch and of each mail send

mod helpers;

pub use helpers::{encode_metrics, AlertMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "alerter";

lazy_static! {
    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Messages received from the bus
    pub static ref EVENTS_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_received_total", METRIC_PREFIX),
        "Total timetable events received from the bus"
    ).unwrap();

    /// Messages dropped before any subscriber was considered
    pub static ref EVENTS_ABORTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_aborted_total", METRIC_PREFIX),
        "Total events dropped as a whole",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // Notification Metrics
    // ============================================================================

    /// Subscriptions that matched an event
    pub static ref NOTIFICATIONS_MATCHED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_matched_total", METRIC_PREFIX),
        "Total subscriptions matched by an event"
    ).unwrap();

    /// Mails accepted by the mail API
    pub static ref NOTIFICATIONS_SENT_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_sent_total", METRIC_PREFIX),
        "Total alert mails accepted by the mail API"
    ).unwrap();

    /// Notifications lost, by the stage that failed
    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_failed_total", METRIC_PREFIX),
        "Total alert notifications that failed",
        &["stage"]
    ).unwrap();

    // ============================================================================
    // Latency Metrics
    // ============================================================================

    pub static ref DIRECTORY_FETCH_LATENCY: Histogram = register_histogram!(
        format!("{}_directory_fetch_latency_seconds", METRIC_PREFIX),
        "Alert directory fetch latency in seconds",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    pub static ref MAIL_SEND_LATENCY: Histogram = register_histogram!(
        format!("{}_mail_send_latency_seconds", METRIC_PREFIX),
        "Mail API request latency in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();
}
