// SPDX-FileCopyrightText: 2026 policyd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op.

use std::time::Duration;

use metrics::{describe_counter, describe_histogram, Unit};

/// Register all policyd metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "policyd_token_requests_total",
        "Token requests by outcome status"
    );
    describe_histogram!(
        "policyd_token_request_duration_ms",
        Unit::Milliseconds,
        "Token request handling time"
    );
    describe_counter!(
        "policyd_policy_updates_total",
        "Policy update requests by outcome status"
    );
    describe_histogram!(
        "policyd_policy_update_duration_ms",
        Unit::Milliseconds,
        "Policy update handling time"
    );
    describe_counter!(
        "policyd_auth_attempts_total",
        "Authentication attempts by outcome status"
    );
    describe_histogram!(
        "policyd_auth_duration_ms",
        Unit::Milliseconds,
        "Credential verification time"
    );
    describe_counter!(
        "policyd_verification_cache_hits_total",
        "Verifications answered from the cache, by scheme"
    );
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Record a finished token request.
pub fn record_token_request(status: &'static str, elapsed: Duration) {
    metrics::counter!("policyd_token_requests_total", "status" => status).increment(1);
    metrics::histogram!("policyd_token_request_duration_ms").record(millis(elapsed));
}

/// Record a finished policy update request.
pub fn record_policy_update(status: &'static str, elapsed: Duration) {
    metrics::counter!("policyd_policy_updates_total", "status" => status).increment(1);
    metrics::histogram!("policyd_policy_update_duration_ms").record(millis(elapsed));
}

/// Record one pass through the authentication gate.
pub fn record_auth_attempt(status: &'static str, elapsed: Duration) {
    metrics::counter!("policyd_auth_attempts_total", "status" => status).increment(1);
    metrics::histogram!("policyd_auth_duration_ms").record(millis(elapsed));
}

/// Record a verification served from the cache.
pub fn record_cache_hit(scheme: &str) {
    metrics::counter!("policyd_verification_cache_hits_total", "scheme" => scheme.to_string())
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn recorded_metrics_render_with_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_token_request("ok", Duration::from_millis(3));
            record_policy_update("store_update_error", Duration::from_millis(12));
            record_auth_attempt("jwt_error", Duration::from_millis(1));
            record_cache_hit("bearer");
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"policyd_token_requests_total{status="ok"} 1"#));
        assert!(
            rendered.contains(r#"policyd_policy_updates_total{status="store_update_error"} 1"#)
        );
        assert!(rendered.contains(r#"policyd_auth_attempts_total{status="jwt_error"} 1"#));
        assert!(rendered.contains(r#"policyd_verification_cache_hits_total{scheme="bearer"} 1"#));
        assert!(rendered.contains("policyd_policy_update_duration_ms"));
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_token_request("user_error", Duration::ZERO);
        record_cache_hit("basic");
    }

    #[test]
    fn millis_converts_durations() {
        assert!((millis(Duration::from_micros(1500)) - 1.5).abs() < f64::EPSILON);
    }
}
