// crates/server-jobs/src/metrics.rs
//! Job and connection metrics.
//!
//! These only record; the server installs the Prometheus recorder. Without a
//! recorder every call is a no-op, which is what unit tests see.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::bridge::JobOutcome;

/// Describe all job metrics for Prometheus.
pub fn describe_metrics() {
    describe_counter!("jobs_submitted_total", "Jobs accepted by the submission endpoint");
    describe_counter!("jobs_started_total", "Jobs taken from the registry and started");
    describe_counter!(
        "jobs_finished_total",
        "Jobs that reached a terminal event, by outcome"
    );
    describe_gauge!("jobs_running", "Jobs currently executing");
    describe_histogram!("job_duration_seconds", "Wall time from start to terminal event");
    describe_gauge!("ws_connections", "Open streaming connections");
    describe_counter!(
        "ws_messages_rejected_total",
        "Inbound control messages answered with an error notice, by reason"
    );
}

pub fn record_job_submitted() {
    counter!("jobs_submitted_total").increment(1);
}

pub fn record_job_started() {
    counter!("jobs_started_total").increment(1);
    gauge!("jobs_running").increment(1.0);
}

pub fn record_job_finished(outcome: &JobOutcome, duration: Duration) {
    counter!("jobs_finished_total", "outcome" => outcome.label()).increment(1);
    gauge!("jobs_running").decrement(1.0);
    histogram!("job_duration_seconds", "outcome" => outcome.label()).record(duration.as_secs_f64());
}

pub fn record_message_rejected(reason: &'static str) {
    counter!("ws_messages_rejected_total", "reason" => reason).increment(1);
}

pub fn record_connection_opened() {
    gauge!("ws_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("ws_connections").decrement(1.0);
}
