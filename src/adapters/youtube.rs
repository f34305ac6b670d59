//! YouTube Data API publisher.
//!
//! Uploads use the resumable protocol: one metadata request opens an
//! upload session, then the video is sent in fixed-size chunks until the
//! API answers with the created video resource.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{PublishError, Publisher};
use crate::config::{Config, PublishSettings};
use crate::domain::{Artifact, Idea, PublishedVideo};

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";

/// Upload chunk size (must be a multiple of 256 KiB)
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Platform limit on tags per video
pub const MAX_TAGS: usize = 15;

/// Consecutive chunks the server may refuse to store before giving up
const MAX_STALLED_CHUNKS: u32 = 3;

/// Keywords used for hashtags and tags
const MAX_KEYWORDS: usize = 5;

/// Tags added to every upload
const NICHE_TAGS: [&str; 6] = [
    "motivation",
    "success",
    "mindset",
    "shorts",
    "viral",
    "selfimprovement",
];

/// YouTube uploader
pub struct YouTubePublisher {
    access_token: String,
    settings: PublishSettings,
    upload_url: String,
    client: Client,
}

/// `videos.insert` request body
#[derive(Debug, Clone, Serialize)]
pub struct VideoMetadata {
    pub snippet: Snippet,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub privacy_status: String,
    pub made_for_kids: bool,
    pub self_declared_made_for_kids: bool,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: Option<String>,
}

impl YouTubePublisher {
    /// Create a publisher from resolved configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.youtube_access_token()?,
            config.publish.clone(),
            config.retry.timeout(),
        )?)
    }

    pub fn new(
        access_token: impl Into<String>,
        settings: PublishSettings,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            access_token: access_token.into(),
            settings,
            upload_url: UPLOAD_URL.to_string(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Override the upload endpoint
    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self
    }

    /// Open a resumable session and return its URI
    async fn start_session(
        &self,
        metadata: &VideoMetadata,
        content_type: &str,
        total: usize,
    ) -> Result<String, PublishError> {
        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", total.to_string())
            .json(metadata)
            .send()
            .await
            .map_err(|e| PublishError::Upstream(format!("Failed to start upload: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PublishError::Upstream(format!(
                "YouTube API error ({}): {}",
                status, text
            )));
        }

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                PublishError::Upstream("Upload session response had no Location header".to_string())
            })
    }

    /// Send the video bytes chunk by chunk
    async fn upload_chunks(
        &self,
        session_uri: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, PublishError> {
        let total = bytes.len();
        let mut offset = 0usize;
        let mut last_bucket = 0usize;
        let mut stalled = 0u32;

        while offset < total {
            let end = (offset + CHUNK_SIZE).min(total);
            let response = self
                .client
                .put(session_uri)
                .bearer_auth(&self.access_token)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_RANGE, content_range(offset, end, total))
                .body(bytes[offset..end].to_vec())
                .send()
                .await
                .map_err(|e| PublishError::Upstream(format!("Chunk upload failed: {}", e)))?;

            let status = response.status();

            // 308: more expected, resume after whatever the server stored
            if status == StatusCode::PERMANENT_REDIRECT {
                let stored = response
                    .headers()
                    .get(header::RANGE)
                    .and_then(|v| v.to_str().ok());
                let next = resume_offset(stored);
                if next <= offset {
                    stalled += 1;
                    if stalled >= MAX_STALLED_CHUNKS {
                        return Err(PublishError::Upstream(format!(
                            "Upload made no progress after {} chunks at offset {}",
                            stalled, offset
                        )));
                    }
                } else {
                    stalled = 0;
                }
                if next < end {
                    debug!(offset = next, sent_to = end, "Server kept a partial chunk, resending");
                }
                offset = next;

                let bucket = progress_bucket(offset, total);
                if bucket > last_bucket {
                    info!(progress = bucket * 20, "Upload progress");
                    last_bucket = bucket;
                }
                continue;
            }

            if status.is_success() {
                let resource: VideoResource = response.json().await.map_err(|e| {
                    PublishError::Upstream(format!("Failed to parse upload response: {}", e))
                })?;
                return resource.id.ok_or(PublishError::MissingVideoId);
            }

            let text = response.text().await.unwrap_or_default();
            return Err(PublishError::Upstream(format!(
                "YouTube API error ({}): {}",
                status, text
            )));
        }

        warn!("Upload loop ended without a final response");
        Err(PublishError::MissingVideoId)
    }
}

/// Build the upload metadata for an idea
pub fn build_metadata(idea: &Idea, settings: &PublishSettings) -> VideoMetadata {
    let keywords: Vec<String> = idea
        .keywords
        .iter()
        .take(MAX_KEYWORDS)
        .map(|kw| kw.replace(' ', ""))
        .filter(|kw| !kw.is_empty())
        .collect();

    let keyword_tags = keywords
        .iter()
        .map(|kw| format!("#{}", kw))
        .collect::<Vec<_>>()
        .join(" ");

    let niche_hashtags = NICHE_TAGS
        .iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ");

    let description = format!(
        "{}\n\n🔥 {}\n\n{}\n\n{}",
        idea.description, idea.hook, keyword_tags, niche_hashtags
    );

    let tags: Vec<String> = NICHE_TAGS
        .iter()
        .map(|tag| tag.to_string())
        .chain(keywords)
        .take(MAX_TAGS)
        .collect();

    VideoMetadata {
        snippet: Snippet {
            title: idea.publish_title(),
            description,
            tags,
            category_id: settings.category_id.clone(),
        },
        status: Status {
            privacy_status: settings.privacy_status.clone(),
            made_for_kids: false,
            self_declared_made_for_kids: false,
        },
    }
}

/// Public watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://youtube.com/watch?v={}", video_id)
}

/// `Content-Range` header for the chunk `[start, end)`
fn content_range(start: usize, end: usize, total: usize) -> String {
    format!("bytes {}-{}/{}", start, end.saturating_sub(1), total)
}

/// Parse `bytes=0-1048575` into the next offset to send
fn next_offset_from_range(range: &str) -> Option<usize> {
    let last = range.trim().strip_prefix("bytes=")?.split('-').nth(1)?;
    last.parse::<usize>().ok().map(|n| n + 1)
}

/// Offset to send next after a 308; no `Range` means nothing was stored
fn resume_offset(range: Option<&str>) -> usize {
    range.and_then(next_offset_from_range).unwrap_or(0)
}

/// Progress in 20% buckets (0..=5)
fn progress_bucket(sent: usize, total: usize) -> usize {
    if total == 0 {
        return 5;
    }
    (sent * 100 / total) / 20
}

#[async_trait]
impl Publisher for YouTubePublisher {
    async fn publish(
        &self,
        artifact: &Artifact,
        idea: &Idea,
    ) -> Result<PublishedVideo, PublishError> {
        let metadata = build_metadata(idea, &self.settings);
        info!(title = %metadata.snippet.title, "Uploading to YouTube");

        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|source| PublishError::Artifact {
                path: artifact.path.clone(),
                source,
            })?;

        let session_uri = self
            .start_session(&metadata, &artifact.content_type, bytes.len())
            .await?;
        let id = self
            .upload_chunks(&session_uri, &artifact.content_type, &bytes)
            .await?;

        let url = watch_url(&id);
        info!(video_id = %id, %url, "Published");

        Ok(PublishedVideo { id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea_with_keywords(keywords: &[&str]) -> Idea {
        Idea {
            title: "Discipline beats motivation".to_string(),
            description: "Why habits win".to_string(),
            hook: "Motivation is a liar".to_string(),
            target_audience: "Gym beginners".to_string(),
            virality_score: 8,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_metadata_tags_and_hashtags() {
        let idea = idea_with_keywords(&["morning routine", "habits", "gym", "focus", "grit", "extra"]);
        let metadata = build_metadata(&idea, &PublishSettings::default());

        // 6 niche tags + first 5 keywords, spaces removed
        assert_eq!(metadata.snippet.tags.len(), 11);
        assert_eq!(metadata.snippet.tags[6], "morningroutine");
        assert!(!metadata.snippet.tags.contains(&"extra".to_string()));

        assert!(metadata.snippet.description.starts_with("Why habits win\n\n🔥 Motivation is a liar"));
        assert!(metadata.snippet.description.contains("#morningroutine #habits"));
        assert!(metadata.snippet.description.ends_with("#selfimprovement"));
        assert_eq!(metadata.snippet.category_id, "22");
        assert_eq!(metadata.status.privacy_status, "public");
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = build_metadata(&idea_with_keywords(&[]), &PublishSettings::default());
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(value["snippet"]["categoryId"], "22");
        assert_eq!(value["status"]["madeForKids"], false);
        assert_eq!(value["status"]["selfDeclaredMadeForKids"], false);
    }

    #[test]
    fn test_title_is_truncated() {
        let mut idea = idea_with_keywords(&[]);
        idea.title = "a".repeat(140);
        let metadata = build_metadata(&idea, &PublishSettings::default());
        assert_eq!(metadata.snippet.title.len(), 100);
    }

    #[test]
    fn test_content_range() {
        assert_eq!(content_range(0, CHUNK_SIZE, 3_000_000), "bytes 0-1048575/3000000");
        assert_eq!(content_range(2_097_152, 3_000_000, 3_000_000), "bytes 2097152-2999999/3000000");
    }

    #[test]
    fn test_next_offset_from_range() {
        assert_eq!(next_offset_from_range("bytes=0-1048575"), Some(1_048_576));
        assert_eq!(next_offset_from_range("garbage"), None);
    }

    #[test]
    fn test_resume_offset_without_range_restarts() {
        assert_eq!(resume_offset(None), 0);
        assert_eq!(resume_offset(Some("bytes=0-524287")), 524_288);
    }

    #[test]
    fn test_progress_bucket() {
        assert_eq!(progress_bucket(0, 100), 0);
        assert_eq!(progress_bucket(39, 100), 1);
        assert_eq!(progress_bucket(40, 100), 2);
        assert_eq!(progress_bucket(100, 100), 5);
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc123"), "https://youtube.com/watch?v=abc123");
    }
}
