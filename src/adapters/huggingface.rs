//! Hugging Face inference client for text-to-video rendering.
//!
//! The hosted inference endpoint answers 503 while the model is loading,
//! 200 with the video bytes once it can serve, and anything else on error.
//! Each call maps onto exactly one [`JobOutcome`]; the retry loop lives in
//! the backoff engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::{JobOutcome, RemoteJobClient};
use crate::config::{Config, VideoSettings};
use crate::domain::artifact::VIDEO_MP4;
use crate::domain::{GenerationPrompt, RenderedMedia};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Error bodies are clipped to this many characters in outcomes
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Text-to-video inference client
pub struct HuggingFaceVideoClient {
    token: String,
    model_url: String,
    parameters: VideoParameters,
    client: Client,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: VideoParameters,
}

/// Render parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoParameters {
    pub num_frames: u32,
    pub height: u32,
    pub width: u32,
}

impl From<&VideoSettings> for VideoParameters {
    fn from(settings: &VideoSettings) -> Self {
        Self {
            num_frames: settings.num_frames(),
            height: settings.height,
            width: settings.width,
        }
    }
}

impl HuggingFaceVideoClient {
    /// Create a client from resolved configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.hf_token()?,
            &config.video.model,
            VideoParameters::from(&config.video),
            config.retry.timeout(),
        )?)
    }

    pub fn new(
        token: impl Into<String>,
        model: &str,
        parameters: VideoParameters,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            token: token.into(),
            model_url: format!("{}/models/{}", DEFAULT_BASE_URL, model),
            parameters,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Point the client at a different model URL
    pub fn with_model_url(mut self, model_url: impl Into<String>) -> Self {
        self.model_url = model_url.into();
        self
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }
}

/// Map an HTTP status and body onto a job outcome
pub fn classify_response(status: StatusCode, content_type: Option<&str>, body: Vec<u8>) -> JobOutcome {
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return JobOutcome::NotReady;
    }

    if status == StatusCode::OK {
        if body.is_empty() {
            return JobOutcome::Failed("API returned an empty body".to_string());
        }
        let content_type = content_type
            .filter(|ct| ct.starts_with("video/"))
            .unwrap_or(VIDEO_MP4);
        return JobOutcome::Ready(RenderedMedia::new(body, content_type));
    }

    let text: String = String::from_utf8_lossy(&body)
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    JobOutcome::Failed(format!("API Error {}: {}", status.as_u16(), text))
}

#[async_trait]
impl RemoteJobClient for HuggingFaceVideoClient {
    async fn submit_or_poll(&self, prompt: &GenerationPrompt) -> JobOutcome {
        let request = InferenceRequest {
            inputs: prompt.as_str(),
            parameters: self.parameters,
        };

        let response = match self
            .client
            .post(&self.model_url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return JobOutcome::Failed(format!("Request failed: {}", e)),
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return JobOutcome::Failed(format!("Failed to read response body: {}", e)),
        };

        debug!(status = status.as_u16(), bytes = body.len(), "Render endpoint responded");
        classify_response(status, content_type.as_deref(), body)
    }
}
