//! YouTube Data API v3 catalog client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::gemini::API_KEY_HEADER;
use crate::traits::{CaptionTrack, CatalogService, SearchHit, SearchRequest, VideoDetails};

/// Configuration for the catalog client.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: String,
    /// Base URL of the Data API
    pub base_url: String,
    pub timeout: Duration,
}

impl YouTubeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Catalog client backed by the YouTube Data API.
pub struct YouTubeCatalogClient {
    http: Client,
    config: YouTubeConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

/// Counts are serialized as decimal strings by the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, Deserialize)]
struct CaptionsResponse {
    #[serde(default)]
    items: Vec<CaptionItem>,
}

#[derive(Debug, Deserialize)]
struct CaptionItem {
    snippet: CaptionSnippet,
}

#[derive(Debug, Deserialize)]
struct CaptionSnippet {
    #[serde(default)]
    language: String,
}

impl YouTubeCatalogClient {
    pub fn new(config: YouTubeConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vshorts-clients/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let url = format!("{}/{}", self.config.base_url, resource);
        debug!(resource, "Calling YouTube Data API");

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogService for YouTubeCatalogClient {
    async fn search(&self, request: &SearchRequest) -> ClientResult<Vec<SearchHit>> {
        let mut query = vec![
            ("part", "snippet".to_string()),
            ("q", request.query.clone()),
            ("type", "video".to_string()),
            ("order", request.order.as_str().to_string()),
            (
                "publishedAfter",
                request
                    .published_after
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("maxResults", request.page_size.to_string()),
        ];
        if let Some(language) = &request.language {
            query.push(("relevanceLanguage", language.clone()));
        }
        if request.long_form_only {
            query.push(("videoDuration", "long".to_string()));
        }

        let response: SearchResponse = self.get_json("search", &query).await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                item.id.video_id.map(|id| SearchHit {
                    id,
                    title: item.snippet.title,
                    channel: item.snippet.channel_title,
                })
            })
            .collect())
    }

    async fn video_details(&self, video_id: &str) -> ClientResult<VideoDetails> {
        let query = [
            ("part", "snippet,statistics,contentDetails".to_string()),
            ("id", video_id.to_string()),
        ];
        let response: VideosResponse = self.get_json("videos", &query).await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("video {}", video_id)))?;

        let parse_count =
            |v: Option<String>| v.and_then(|s| s.parse::<u64>().ok()).unwrap_or_default();

        Ok(VideoDetails {
            title: item.snippet.title,
            description: item.snippet.description,
            duration: item.content_details.duration,
            view_count: parse_count(item.statistics.view_count),
            like_count: parse_count(item.statistics.like_count),
        })
    }

    async fn caption_tracks(&self, video_id: &str) -> ClientResult<Vec<CaptionTrack>> {
        let query = [
            ("part", "snippet".to_string()),
            ("videoId", video_id.to_string()),
        ];
        let response: CaptionsResponse = self.get_json("captions", &query).await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| CaptionTrack {
                language: item.snippet.language,
            })
            .collect())
    }
}
