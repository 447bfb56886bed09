//! Candidate video selection.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info, warn};
use vshorts_clients::{CatalogService, SearchHit, SearchRequest};
use vshorts_models::SourceVideo;

use crate::config::{SelectionConfig, SelectionStrategy};

/// Picks one recent long-form video from the watched channels.
///
/// Every failure (empty channel list, search error, empty page) yields
/// `None`; the selector never errors.
pub struct CandidateSelector {
    catalog: Arc<dyn CatalogService>,
    config: SelectionConfig,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl CandidateSelector {
    pub fn new(catalog: Arc<dyn CatalogService>, config: SelectionConfig) -> Self {
        Self::with_rng(catalog, config, Box::new(StdRng::from_os_rng()))
    }

    /// Inject the randomness source (seeded in tests).
    pub fn with_rng(
        catalog: Arc<dyn CatalogService>,
        config: SelectionConfig,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            catalog,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub async fn select_candidate(&self, channels: &[String]) -> Option<SourceVideo> {
        let query = build_query(channels)?;
        let request = SearchRequest {
            query,
            order: self.config.order,
            published_after: Utc::now() - self.config.recency_window,
            page_size: self.config.page_size,
            language: self.config.language.clone(),
            long_form_only: self.config.long_form_only,
        };

        debug!(query = %request.query, order = request.order.as_str(), "Searching for candidates");

        let hits = match self.catalog.search(&request).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Candidate search failed");
                return None;
            }
        };

        if hits.is_empty() {
            warn!(query = %request.query, "No recent videos found for watched channels");
            return None;
        }

        let hit = self.pick(hits);
        info!(
            video_id = %hit.id,
            title = %hit.title,
            channel = %hit.channel,
            "Selected candidate video"
        );

        Some(SourceVideo::new(hit.id, hit.title, hit.channel))
    }

    fn pick(&self, mut hits: Vec<SearchHit>) -> SearchHit {
        let index = match self.config.strategy {
            SelectionStrategy::First => 0,
            SelectionStrategy::Random => {
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                rng.random_range(0..hits.len())
            }
        };
        hits.swap_remove(index)
    }
}

/// OR-combine channel names into one search query.
fn build_query(channels: &[String]) -> Option<String> {
    let names: Vec<&str> = channels
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    if names.is_empty() {
        warn!("No channels configured, skipping candidate search");
        return None;
    }

    Some(names.join("|"))
}
