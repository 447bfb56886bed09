//! Short-form publishing.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use vshorts_clients::{ArtifactFetcher, ClientError, PublishingService, UploadMetadata};

use crate::config::PublishConfig;
use crate::credentials::CredentialResolver;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::Backoff;

/// Longest title the publishing platform accepts.
pub const MAX_TITLE_CHARS: usize = 100;

const ARTIFACT_FILE_NAME: &str = "final_short.mp4";

/// Public URL of a published short.
pub fn short_url(published_id: &str) -> String {
    format!("https://youtube.com/shorts/{}", published_id)
}

pub struct Publisher {
    resolver: CredentialResolver,
    publishing: Arc<dyn PublishingService>,
    fetcher: Arc<dyn ArtifactFetcher>,
    config: PublishConfig,
    work_dir: PathBuf,
    download_backoff: Backoff,
}

impl Publisher {
    pub fn new(
        resolver: CredentialResolver,
        publishing: Arc<dyn PublishingService>,
        fetcher: Arc<dyn ArtifactFetcher>,
        config: PublishConfig,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            publishing,
            fetcher,
            config,
            work_dir: work_dir.into(),
            download_backoff: Backoff::transfer("artifact_download"),
        }
    }

    pub fn with_download_backoff(mut self, backoff: Backoff) -> Self {
        self.download_backoff = backoff;
        self
    }

    /// Upload the rendered artifact. Every failure is logged and yields `None`.
    pub async fn publish(&self, artifact_url: &str, title: &str, description: &str) -> Option<String> {
        match self.try_publish(artifact_url, title, description).await {
            Ok(id) => {
                info!(published_id = %id, url = %short_url(&id), "Short published");
                Some(id)
            }
            Err(e) if e.is_definitive() => {
                error!(error = %e, "Publishing aborted");
                None
            }
            Err(e) => {
                warn!(error = %e, "Publishing failed");
                None
            }
        }
    }

    async fn try_publish(&self, artifact_url: &str, title: &str, description: &str) -> PipelineResult<String> {
        let credentials = self.resolver.resolve()?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("vshorts-publish-")
            .tempdir_in(&self.work_dir)?;
        let local = scratch.path().join(ARTIFACT_FILE_NAME);

        let bytes = self
            .download_backoff
            .run(ClientError::is_retryable, || self.fetcher.fetch(artifact_url, &local))
            .await
            .map_err(|exhausted| {
                warn!(attempts = exhausted.attempts, "Artifact download gave up");
                exhausted.error
            })?;

        if bytes == 0 {
            return Err(PipelineError::Client(ClientError::invalid_response(
                "downloaded artifact is empty",
            )));
        }
        info!(bytes, path = %local.display(), "Artifact downloaded");

        let metadata = self.metadata(title, description);
        let id = self.publishing.upload(&local, &metadata, &credentials).await?;

        if id.trim().is_empty() {
            return Err(PipelineError::Client(ClientError::invalid_response(
                "upload returned an empty video ID",
            )));
        }
        Ok(id)
    }

    fn metadata(&self, title: &str, description: &str) -> UploadMetadata {
        UploadMetadata {
            title: title.trim().chars().take(MAX_TITLE_CHARS).collect(),
            description: description.to_string(),
            category_id: self.config.category_id.clone(),
            tags: self.config.tags.clone(),
            privacy: self.config.privacy,
            made_for_kids: self.config.made_for_kids,
        }
    }
}
