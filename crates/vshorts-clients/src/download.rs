//! Out-of-band downloads: source audio via yt-dlp, rendered artifacts via HTTP.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::traits::{ArtifactFetcher, AudioFetcher};

/// Audio fetcher shelling out to `yt-dlp` with mp3 extraction.
#[derive(Debug, Clone)]
pub struct YtDlpAudioFetcher {
    binary: PathBuf,
    file_stem: String,
}

impl YtDlpAudioFetcher {
    /// Locate `yt-dlp` on `PATH`.
    pub fn new() -> ClientResult<Self> {
        let binary = which::which("yt-dlp")
            .map_err(|e| ClientError::config_error(format!("yt-dlp not available: {}", e)))?;
        Ok(Self::with_binary(binary))
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            file_stem: "temp_audio".to_string(),
        }
    }
}

#[async_trait]
impl AudioFetcher for YtDlpAudioFetcher {
    async fn fetch_audio(&self, video_url: &str, dest_dir: &Path) -> ClientResult<PathBuf> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let template = dest_dir.join(format!("{}.%(ext)s", self.file_stem));
        info!(video_url, "Downloading source audio with yt-dlp");

        let output = tokio::process::Command::new(&self.binary)
            .arg("--format")
            .arg("bestaudio/best")
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg("--output")
            .arg(&template)
            .arg(video_url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ClientError::process_failed(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::process_failed(format!(
                "yt-dlp failed to download audio: {}",
                stderr.trim()
            )));
        }

        let audio = dest_dir.join(format!("{}.mp3", self.file_stem));
        if !tokio::fs::try_exists(&audio).await.unwrap_or(false) {
            return Err(ClientError::process_failed(format!(
                "yt-dlp finished but {} is missing",
                audio.display()
            )));
        }

        Ok(audio)
    }
}

/// Streams a rendered artifact to disk over HTTP.
#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    http: Client,
}

impl HttpArtifactFetcher {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vshorts-clients/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> ClientResult<u64> {
        let mut response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(bytes = written, path = %dest.display(), "Artifact downloaded");
        Ok(written)
    }
}
