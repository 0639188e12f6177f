//! Video directory lookups against the YouTube Data API v3.
//!
//! Listings come from the `search` endpoint and are joined with a `videos`
//! details call, since search items carry no duration.

use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::config::Video;
use crate::foundation::error::{StoryError, StoryResult};

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "STORYFRAME_YT_API_KEY";

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const SEARCH_MAX_RESULTS: u32 = 10;
const CHANNEL_MAX_RESULTS: u32 = 50;

/// External catalog of [`Video`] records.
pub trait VideoDirectory {
    /// Full-text search.
    fn search_videos(&self, query: &str) -> StoryResult<Vec<Video>>;
    /// Uploads of one channel, newest first.
    fn channel_videos(&self, channel_id: &str) -> StoryResult<Vec<Video>>;
}

pub struct YouTubeDirectory {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl YouTubeDirectory {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> StoryResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Key from [`API_KEY_ENV`].
    pub fn from_env(timeout: Duration) -> StoryResult<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| StoryError::validation(format!("{API_KEY_ENV} is not set")))?;
        Self::new(key, timeout)
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let url = format!("{BASE_URL}/{endpoint}");
        let body = self
            .client
            .get(&url)
            .query(params)
            .send()
            .with_context(|| format!("youtube {endpoint} request"))?
            .error_for_status()
            .with_context(|| format!("youtube {endpoint} response"))?
            .text()
            .with_context(|| format!("read youtube {endpoint} body"))?;
        serde_json::from_str(&body).with_context(|| format!("decode youtube {endpoint} body"))
    }

    fn search_ids(&self, params: &[(&str, &str)]) -> anyhow::Result<Vec<String>> {
        let resp: SearchResponse = self.get_json("search", params)?;
        Ok(resp
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect())
    }

    fn details(&self, ids: &[String]) -> anyhow::Result<Vec<Video>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let resp: VideosResponse = self.get_json(
            "videos",
            &[
                ("part", "contentDetails,snippet"),
                ("id", joined.as_str()),
                ("key", self.api_key.as_str()),
            ],
        )?;
        Ok(resp.items.into_iter().map(video_from_item).collect())
    }
}

impl VideoDirectory for YouTubeDirectory {
    #[tracing::instrument(skip(self))]
    fn search_videos(&self, query: &str) -> StoryResult<Vec<Video>> {
        let max = SEARCH_MAX_RESULTS.to_string();
        let ids = self.search_ids(&[
            ("part", "snippet"),
            ("maxResults", max.as_str()),
            ("q", query),
            ("type", "video"),
            ("key", self.api_key.as_str()),
        ])?;
        let videos = self.details(&ids)?;
        tracing::debug!(count = videos.len(), "search results");
        Ok(videos)
    }

    #[tracing::instrument(skip(self))]
    fn channel_videos(&self, channel_id: &str) -> StoryResult<Vec<Video>> {
        let max = CHANNEL_MAX_RESULTS.to_string();
        let ids = self.search_ids(&[
            ("part", "snippet"),
            ("channelId", channel_id),
            ("maxResults", max.as_str()),
            ("order", "date"),
            ("type", "video"),
            ("key", self.api_key.as_str()),
        ])?;
        let videos = self.details(&ids)?;
        tracing::debug!(count = videos.len(), "channel uploads");
        Ok(videos)
    }
}

fn video_from_item(item: VideoItem) -> Video {
    let thumbnail = item
        .snippet
        .thumbnails
        .medium
        .or(item.snippet.thumbnails.default)
        .map(|t| t.url)
        .unwrap_or_default();
    Video {
        id: item.id,
        title: item.snippet.title,
        thumbnail,
        duration: item.content_details.duration,
        channel_title: item.snippet.channel_title,
        description: item.snippet.description,
        published_at: item.snippet.published_at,
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Snippet,
    content_details: ContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_title: String,
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    duration: String,
}
