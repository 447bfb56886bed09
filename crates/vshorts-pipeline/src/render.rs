//! Tiered cloud rendering.
//!
//! A rich job (video plus auto captions) is tried first; if it is rejected,
//! fails or times out, the same video layer is rendered without captions.
//! Both tiers share one submit-and-poll routine with a tier-local deadline.

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use vshorts_clients::RenderService;
use vshorts_models::{ClipRecommendation, RenderJobSpec, RenderResult, RenderState, RenderTier, VideoId};

use crate::config::{RenderConfig, MIN_POLL_INTERVAL};
use crate::metrics::record_render_attempt;
use crate::retry::PollFailureLog;

/// Consecutive status-poll failures logged before suppression kicks in.
const MAX_LOGGED_POLL_FAILURES: u32 = 3;

pub struct RenderCoordinator {
    renderer: Arc<dyn RenderService>,
    config: RenderConfig,
}

impl RenderCoordinator {
    pub fn new(renderer: Arc<dyn RenderService>, config: RenderConfig) -> Self {
        Self { renderer, config }
    }

    /// Render the recommended clip, returning the artifact URL of the first
    /// tier that succeeds.
    pub async fn render(&self, video_id: &VideoId, clip: &ClipRecommendation) -> Option<String> {
        let window = match clip.render_window(self.config.max_clip_secs) {
            Ok(window) => window,
            Err(e) => {
                warn!(
                    video_id = %video_id,
                    start = clip.start_time,
                    end = clip.end_time,
                    error = %e,
                    "Rejecting clip before render"
                );
                return None;
            }
        };

        if window.duration < clip.raw_duration() {
            info!(
                requested = clip.raw_duration(),
                clamped = window.duration,
                "Clip duration clamped to platform maximum"
            );
        }

        let source_url = video_id.watch_url();

        for tier in RenderTier::ALL {
            let spec = RenderJobSpec::for_tier(
                tier,
                &source_url,
                window,
                self.config.width,
                self.config.height,
            );

            match self.run_tier(&spec).await {
                RenderResult::Succeeded { artifact_url } => {
                    record_render_attempt(tier.as_str(), "succeeded");
                    info!(tier = %tier, url = %artifact_url, "Render succeeded");
                    return Some(artifact_url);
                }
                RenderResult::Failed { reason } => {
                    record_render_attempt(tier.as_str(), "failed");
                    warn!(tier = %tier, reason = %reason, "Render tier abandoned");
                }
            }
        }

        warn!(video_id = %video_id, "All render tiers failed");
        None
    }

    /// Submit one job and poll it until success, failure or the tier deadline.
    pub(crate) async fn run_tier(&self, spec: &RenderJobSpec) -> RenderResult {
        let deadline = Instant::now() + self.config.tier_timeout;

        let job_id = match self.renderer.submit(spec).await {
            Ok(id) => id,
            Err(e) => {
                return RenderResult::Failed {
                    reason: format!("submission rejected: {}", e),
                }
            }
        };
        info!(
            job_id = %job_id,
            tier = %spec.tier,
            captions = spec.has_captions(),
            duration = spec.video.trim_duration,
            "Render job submitted"
        );

        let mut poll_failures = PollFailureLog::new(MAX_LOGGED_POLL_FAILURES);

        loop {
            let now = Instant::now();
            if now >= deadline {
                return RenderResult::Failed {
                    reason: format!("timed out after {:?}", self.config.tier_timeout),
                };
            }
            let pause = self.config.poll_interval.max(MIN_POLL_INTERVAL);
            sleep(pause.min(deadline - now)).await;

            match self.renderer.status(&job_id).await {
                Ok(status) => {
                    poll_failures.recovered();
                    match status.state {
                        RenderState::Succeeded => match status.url {
                            Some(url) => return RenderResult::Succeeded { artifact_url: url },
                            None => {
                                return RenderResult::Failed {
                                    reason: "succeeded without an artifact URL".to_string(),
                                }
                            }
                        },
                        RenderState::Failed => {
                            return RenderResult::Failed {
                                reason: status
                                    .error_message
                                    .unwrap_or_else(|| "render failed".to_string()),
                            }
                        }
                        RenderState::InProgress => {
                            debug!(job_id = %job_id, "Render in progress");
                        }
                    }
                }
                Err(e) => {
                    if poll_failures.failed() {
                        warn!(job_id = %job_id, error = %e, "Render status check failed");
                    }
                }
            }
        }
    }
}
