//! YouTube resumable upload client.
//!
//! Provides:
//! - Refresh-token exchange for a short-lived access token
//! - Token caching with refresh margin
//! - Resumable upload session (metadata first, then bytes)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vshorts_models::{AccessToken, Credentials};

use crate::error::{ClientError, ClientResult};
use crate::traits::{PrivacyStatus, PublishingService, UploadMetadata};

/// Refresh the access token this long before it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Assumed token lifetime when the token endpoint omits `expires_in`.
const TOKEN_DEFAULT_TTL_SECS: i64 = 50 * 60;

/// Configuration for the upload client.
#[derive(Debug, Clone)]
pub struct YouTubeUploadConfig {
    /// Base URL of the upload endpoint
    pub upload_base_url: String,
    pub timeout: Duration,
}

impl Default for YouTubeUploadConfig {
    fn default() -> Self {
        Self {
            upload_base_url: "https://www.googleapis.com".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Publishing client for YouTube Shorts.
pub struct YouTubeUploadClient {
    http: Client,
    config: YouTubeUploadConfig,
    /// Cached token keyed by the refresh token it was derived from.
    token_cache: Mutex<Option<(String, AccessToken)>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource<'a> {
    snippet: VideoSnippet<'a>,
    status: VideoStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
    category_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    privacy_status: PrivacyStatus,
    self_declared_made_for_kids: bool,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

impl YouTubeUploadClient {
    pub fn new(config: YouTubeUploadConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vshorts-clients/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config,
            token_cache: Mutex::new(None),
        })
    }

    /// Get a valid access token, exchanging the refresh token if necessary.
    pub async fn access_token(&self, credentials: &Credentials) -> ClientResult<String> {
        let mut cache = self.token_cache.lock().await;

        if let Some((refresh_token, token)) = cache.as_ref() {
            if *refresh_token == credentials.refresh_token
                && token.is_fresh(chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS))
            {
                return Ok(token.token.clone());
            }
        }

        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::AuthError(format!(
                "Token exchange returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access = AccessToken::new(
            token.access_token,
            token.expires_in.unwrap_or(TOKEN_DEFAULT_TTL_SECS),
        );
        let value = access.token.clone();
        *cache = Some((credentials.refresh_token.clone(), access));

        debug!("Refreshed publishing access token");
        Ok(value)
    }

    async fn start_session(
        &self,
        token: &str,
        metadata: &UploadMetadata,
        content_length: usize,
    ) -> ClientResult<String> {
        let resource = VideoResource {
            snippet: VideoSnippet {
                title: &metadata.title,
                description: &metadata.description,
                tags: &metadata.tags,
                category_id: &metadata.category_id,
            },
            status: VideoStatus {
                privacy_status: metadata.privacy,
                self_declared_made_for_kids: metadata.made_for_kids,
            },
        };

        let response = self
            .http
            .post(format!("{}/upload/youtube/v3/videos", self.config.upload_base_url))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", content_length.to_string())
            .json(&resource)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ClientError::invalid_response("Upload session has no Location header"))
    }
}

#[async_trait]
impl PublishingService for YouTubeUploadClient {
    async fn upload(
        &self,
        file: &Path,
        metadata: &UploadMetadata,
        credentials: &Credentials,
    ) -> ClientResult<String> {
        let token = self.access_token(credentials).await?;
        let bytes = tokio::fs::read(file).await?;

        let session_url = self.start_session(&token, metadata, bytes.len()).await?;
        info!(size = bytes.len(), "Uploading video bytes");

        let response = self
            .http
            .put(&session_url)
            .bearer_auth(&token)
            .header("Content-Type", "video/mp4")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = ClientError::from_response(response).await;
            warn!(error = %err, "Resumable upload rejected");
            return Err(err);
        }

        let inserted: InsertResponse = response.json().await?;
        Ok(inserted.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn metadata() -> UploadMetadata {
        UploadMetadata {
            title: "Clip".to_string(),
            description: "desc".to_string(),
            category_id: "24".to_string(),
            tags: vec!["shorts".to_string()],
            privacy: PrivacyStatus::Public,
            made_for_kids: false,
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token", "expires_in": 3599
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_access_token_cached() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        let client = YouTubeUploadClient::new(YouTubeUploadConfig::default()).unwrap();
        let creds = Credentials::new("id", "secret", "refresh").with_token_uri(format!("{}/token", server.uri()));

        assert_eq!(client.access_token(&creds).await.unwrap(), "ya29.token");
        assert_eq!(client.access_token(&creds).await.unwrap(), "ya29.token");
    }

    #[tokio::test]
    async fn test_token_exchange_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#))
            .mount(&server)
            .await;

        let client = YouTubeUploadClient::new(YouTubeUploadConfig::default()).unwrap();
        let creds = Credentials::new("id", "secret", "refresh").with_token_uri(format!("{}/token", server.uri()));

        assert!(matches!(
            client.access_token(&creds).await,
            Err(ClientError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_resumable_upload_returns_video_id() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_string_contains("\"selfDeclaredMadeForKids\":false"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/session/1", server.uri()).as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "yt-123"})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("final_short.mp4");
        tokio::fs::write(&file, b"fake-mp4").await.unwrap();

        let client = YouTubeUploadClient::new(YouTubeUploadConfig {
            upload_base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let creds = Credentials::new("id", "secret", "refresh").with_token_uri(format!("{}/token", server.uri()));

        let id = client.upload(&file, &metadata(), &creds).await.unwrap();
        assert_eq!(id, "yt-123");
    }
}
