//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; they are dropped unless the host
//! process installs a recorder.

use metrics::{counter, histogram};
use stillclip_models::{AssetKind, StageKind};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "stillclip_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "stillclip_request_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "stillclip_stage_duration_seconds";
    pub const DEGRADED_ENCODES_TOTAL: &str = "stillclip_degraded_encodes_total";
    pub const CLEANUP_FAILURES_TOTAL: &str = "stillclip_cleanup_failures_total";
}

/// Record a finished request. `outcome` is "delivered" or an error kind.
pub fn record_request(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one stage execution.
pub fn record_stage(stage: StageKind, success: bool, duration_secs: f64) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a loudness fallback.
pub fn record_degraded() {
    counter!(names::DEGRADED_ENCODES_TOTAL).increment(1);
}

/// Record an artifact that could not be deleted.
pub fn record_cleanup_failure(kind: AssetKind) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!(names::CLEANUP_FAILURES_TOTAL, &labels).increment(1);
}
