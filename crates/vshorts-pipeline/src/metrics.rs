//! Pipeline metrics collection.
//!
//! Everything is recorded through the `metrics` facade. The bundled binaries
//! install no recorder, so counters stay invisible there and `record_run`
//! also logs a one-line run summary. A program embedding [`crate::Pipeline`]
//! can export the counters by installing a recorder before the first run,
//! e.g. `metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()`.

use std::time::Duration;

use metrics::{counter, histogram};
use tracing::info;

// =============================================================================
// Metric Names
// =============================================================================

pub mod names {
    /// Completed runs by terminal outcome.
    pub const RUNS_TOTAL: &str = "vshorts_runs_total";

    /// Wall-clock duration of one run.
    pub const RUN_DURATION_SECONDS: &str = "vshorts_run_duration_seconds";

    /// Generation attempts by model and outcome.
    pub const MODEL_ATTEMPTS_TOTAL: &str = "vshorts_model_attempts_total";

    /// Render tier attempts by tier and outcome.
    pub const RENDER_ATTEMPTS_TOTAL: &str = "vshorts_render_attempts_total";

    /// Credential resolutions by source and outcome.
    pub const CREDENTIAL_RESOLUTIONS_TOTAL: &str = "vshorts_credential_resolutions_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

pub fn record_run(run_id: &str, outcome: &str, elapsed: Duration) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, "outcome" => outcome.to_string())
        .record(elapsed.as_secs_f64());

    info!(
        run_id,
        outcome,
        elapsed_secs = elapsed.as_secs(),
        "Run summary"
    );
}

pub fn record_model_attempt(model: &str, outcome: &str) {
    counter!(
        names::MODEL_ATTEMPTS_TOTAL,
        "model" => model.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_render_attempt(tier: &str, outcome: &str) {
    counter!(
        names::RENDER_ATTEMPTS_TOTAL,
        "tier" => tier.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_credential_resolution(source: &str, outcome: &str) {
    counter!(
        names::CREDENTIAL_RESOLUTIONS_TOTAL,
        "source" => source.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::RUNS_TOTAL.starts_with("vshorts_"));
        assert!(names::MODEL_ATTEMPTS_TOTAL.contains("model"));
        assert!(names::RENDER_ATTEMPTS_TOTAL.contains("render"));
        assert!(names::RUN_DURATION_SECONDS.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        record_run("run-1", "published", Duration::from_secs(42));
        record_model_attempt("gemini-2.5-flash", "rate_limited");
        record_render_attempt("rich", "failed");
        record_credential_resolution("env", "found");
    }
}
