//! Run-scoped logging.
//!
//! Every line a run emits about its own progress carries the run ID and the
//! stage it belongs to, so one run can be followed through select, analyze,
//! render and publish in both text and JSON output.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vshorts_models::RunId;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "vshorts_pipeline=info,vshorts_clients=info";

/// Stage-aware logger handed down through one run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    stage: &'static str,
}

impl RunLogger {
    pub fn new(run_id: &RunId, stage: &'static str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage,
        }
    }

    /// Same run, next stage.
    pub fn for_stage(&self, stage: &'static str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            stage,
        }
    }

    pub fn entered(&self, detail: &str) {
        info!(run_id = %self.run_id, stage = self.stage, detail, "Entering stage");
    }

    pub fn note(&self, detail: &str) {
        info!(run_id = %self.run_id, stage = self.stage, detail, "Run note");
    }

    /// The stage produced nothing and the run stops here.
    pub fn came_up_empty(&self, reason: &str) {
        warn!(run_id = %self.run_id, stage = self.stage, reason, "Stage produced nothing, run ends");
    }

    /// The last stage failed after its inputs were ready.
    pub fn fell_through(&self, reason: &str) {
        error!(run_id = %self.run_id, stage = self.stage, reason, "Stage failed, run ends");
    }

    pub fn produced(&self, result: &str) {
        info!(run_id = %self.run_id, stage = self.stage, result, "Stage done");
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage(&self) -> &str {
        self.stage
    }

    pub fn span(&self) -> Span {
        tracing::info_span!("vshorts_stage", run_id = %self.run_id, stage = self.stage)
    }
}

/// ANSI text by default, JSON lines when `LOG_FORMAT=json`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_stage_keeps_run_id() {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id, "run");
        let render = logger.for_stage("render");

        assert_eq!(logger.run_id(), run_id.to_string());
        assert_eq!(render.run_id(), logger.run_id());
        assert_eq!(render.stage(), "render");
    }

    #[test]
    fn test_default_directives_name_emitting_crates() {
        for directive in DEFAULT_DIRECTIVES.split(',') {
            let target = directive.split('=').next().unwrap_or_default();
            assert!(
                matches!(target, "vshorts_pipeline" | "vshorts_clients"),
                "unexpected target {}",
                target
            );
        }
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }
}
