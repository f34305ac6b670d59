//! Anthropic Messages API client for idea generation and prompt derivation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{DerivationError, GenerationError, IdeaSource, PromptDeriver};
use crate::config::Config;
use crate::domain::{GenerationPrompt, Idea};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Sampling parameters for one kind of request
#[derive(Debug, Clone, Copy)]
struct Sampling {
    max_tokens: u32,
    temperature: f32,
}

const IDEA_SAMPLING: Sampling = Sampling {
    max_tokens: 2000,
    temperature: 0.7,
};

const PROMPT_SAMPLING: Sampling = Sampling {
    max_tokens: 400,
    temperature: 0.8,
};

/// Text model client
pub struct AnthropicClient {
    api_key: String,
    model: String,
    niche: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Top-level shape the idea prompt asks for
///
/// Entries stay untyped so one malformed idea can't sink the batch.
#[derive(Debug, Deserialize)]
struct IdeaBatch {
    ideas: Vec<Value>,
}

impl AnthropicClient {
    /// Create a client from resolved configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.retry.timeout())
            .build()?;

        Ok(Self {
            api_key: config.anthropic_api_key()?.to_string(),
            model: config.text_model.model.clone(),
            niche: config.content.niche.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Create a client against a custom endpoint
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        niche: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            niche: niche.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send one user message and return the first text block, trimmed
    async fn complete(&self, prompt: &str, sampling: Sampling) -> Result<String, String> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Anthropic API request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Anthropic API returned {}: {}", status, error_text));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Anthropic response: {}", e))?;

        Ok(body
            .content
            .first()
            .map(|block| block.text.trim().to_string())
            .unwrap_or_default())
    }

    fn ideas_prompt(&self, count: usize) -> String {
        let today = Local::now().format("%B %d, %Y");
        format!(
            r#"You are a viral content strategist. Generate {count} trending YouTube Shorts ideas for {today}.

NICHE: {niche}
FORMAT: 8-second vertical videos (YouTube Shorts)
GOAL: Maximum engagement and virality

Consider:
- Current viral trends on TikTok/YouTube/Instagram
- Seasonal relevance (current month, upcoming events)
- Psychological hooks that stop scrolling
- Emotional resonance with target audience
- Shareability factor

Return ONLY valid JSON (no markdown, no extra text):
{{
  "ideas": [
    {{
      "title": "Catchy title under 100 characters",
      "description": "Clear description of video content and message",
      "hook": "First line that grabs attention immediately",
      "target_audience": "Specific demographic",
      "virality_score": 7,
      "keywords": ["keyword1", "keyword2", "keyword3"]
    }}
  ]
}}"#,
            count = count,
            today = today,
            niche = self.niche,
        )
    }
}

/// Build the text-to-video request for one idea
pub fn video_prompt_request(idea: &Idea) -> String {
    format!(
        r#"Create a detailed text-to-video generation prompt for this YouTube Short idea:

TITLE: {title}
DESCRIPTION: {description}
HOOK: {hook}
TARGET: {target}

REQUIREMENTS:
- Duration: 8 seconds
- Format: Vertical (9:16 aspect ratio)
- Style: Motivational, inspiring, cinematic
- Quality: Professional look
- Mood: Powerful, energetic, engaging

IMPORTANT: Keep the prompt simple and clear. Text-to-video AI works best with:
- Clear subject/scene descriptions
- Specific camera movements
- Lighting and color mood
- One main focus (not too complex)

Return ONLY the video generation prompt (no extra text, no explanations):"#,
        title = idea.title,
        description = idea.description,
        hook = idea.hook,
        target = idea.target_audience,
    )
}

/// Strip a markdown code fence around a JSON payload, if present
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();

    let inner = if let Some(start) = text.find("```json") {
        &text[start + "```json".len()..]
    } else if let Some(start) = text.find("```") {
        &text[start + "```".len()..]
    } else {
        return text;
    };

    match inner.find("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

/// Parse the model's idea batch
///
/// Only the envelope has to be well formed. Bad fields inside an idea
/// are blanked so that idea fails validation on its own.
pub fn parse_ideas(text: &str) -> Result<Vec<Idea>, GenerationError> {
    let batch: IdeaBatch = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| GenerationError::Parse(e.to_string()))?;
    Ok(batch.ideas.iter().map(idea_from_value).collect())
}

fn idea_from_value(value: &Value) -> Idea {
    Idea {
        title: text_field(value, "title"),
        description: text_field(value, "description"),
        hook: text_field(value, "hook"),
        target_audience: text_field(value, "target_audience"),
        virality_score: score_field(value.get("virality_score")),
        keywords: keywords_field(value.get("keywords")),
    }
}

/// Strings pass through, scalars are stringified, anything else is empty
fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Round to the nearest integer, saturating at 0 and 255
fn score_field(value: Option<&Value>) -> u8 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score
        .map(|s| s.round().clamp(0.0, f64::from(u8::MAX)) as u8)
        .unwrap_or(0)
}

fn keywords_field(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|kw| !kw.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|kw| kw.trim().to_string())
            .filter(|kw| !kw.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl IdeaSource for AnthropicClient {
    async fn generate(&self, count: usize) -> Result<Vec<Idea>, GenerationError> {
        info!(count, niche = %self.niche, model = %self.model, "Generating video ideas");

        let text = self
            .complete(&self.ideas_prompt(count), IDEA_SAMPLING)
            .await
            .map_err(GenerationError::Upstream)?;

        let ideas = parse_ideas(&text)?;
        debug!(received = ideas.len(), "Parsed idea batch");
        Ok(ideas)
    }
}

#[async_trait]
impl PromptDeriver for AnthropicClient {
    async fn derive(&self, idea: &Idea) -> Result<GenerationPrompt, DerivationError> {
        let text = self
            .complete(&video_prompt_request(idea), PROMPT_SAMPLING)
            .await
            .map_err(DerivationError::Upstream)?;

        if text.is_empty() {
            return Err(DerivationError::Empty);
        }

        Ok(GenerationPrompt::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdeaValidationError;

    const IDEAS_JSON: &str = r#"{"ideas": [{"title": "Wake up at 5", "description": "d", "hook": "h", "target_audience": "t", "virality_score": 9, "keywords": ["a", "b"]}]}"#;

    #[test]
    fn test_strip_plain_json() {
        assert_eq!(strip_code_fence("  {\"ideas\": []} "), "{\"ideas\": []}");
    }

    #[test]
    fn test_strip_json_fence() {
        let wrapped = format!("Here you go:\n```json\n{}\n```\nEnjoy!", IDEAS_JSON);
        assert_eq!(strip_code_fence(&wrapped), IDEAS_JSON);
    }

    #[test]
    fn test_strip_bare_fence() {
        let wrapped = format!("```\n{}\n```", IDEAS_JSON);
        assert_eq!(strip_code_fence(&wrapped), IDEAS_JSON);
    }

    #[test]
    fn test_parse_ideas() {
        let ideas = parse_ideas(&format!("```json\n{}\n```", IDEAS_JSON)).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title, "Wake up at 5");
        assert_eq!(ideas[0].virality_score, 9);
        assert_eq!(ideas[0].keywords, vec!["a", "b"]);
    }

    #[test]
    fn test_null_field_blanks_only_that_idea() {
        let text = r#"{"ideas": [
            {"title": "Wake up at 5", "description": "d", "hook": "h", "target_audience": "t", "virality_score": 9, "keywords": ["a"]},
            {"title": "Cold showers", "description": "d", "hook": null, "target_audience": "t", "virality_score": 6, "keywords": null}
        ]}"#;

        let ideas = parse_ideas(text).unwrap();
        assert_eq!(ideas.len(), 2);
        assert!(ideas[0].validate().is_ok());

        assert_eq!(ideas[1].title, "Cold showers");
        assert_eq!(ideas[1].hook, "");
        assert!(ideas[1].keywords.is_empty());
        assert_eq!(
            ideas[1].validate(),
            Err(IdeaValidationError::MissingFields("hook".to_string()))
        );
    }

    #[test]
    fn test_non_integer_scores_are_rounded_and_clamped() {
        let text = r#"{"ideas": [
            {"title": "a", "virality_score": 8.5},
            {"title": "b", "virality_score": -3},
            {"title": "c", "virality_score": "7"},
            {"title": "d", "virality_score": 1000},
            {"title": "e"}
        ]}"#;

        let scores: Vec<u8> = parse_ideas(text)
            .unwrap()
            .iter()
            .map(|idea| idea.virality_score)
            .collect();
        assert_eq!(scores, vec![9, 0, 7, 255, 0]);
    }

    #[test]
    fn test_non_object_idea_fails_validation() {
        let ideas = parse_ideas(r#"{"ideas": ["just a title"]}"#).unwrap();
        assert_eq!(ideas.len(), 1);
        assert!(ideas[0].validate().is_err());
    }

    #[test]
    fn test_keywords_as_comma_string() {
        let ideas = parse_ideas(r#"{"ideas": [{"keywords": "grit, focus ,  "}]}"#).unwrap();
        assert_eq!(ideas[0].keywords, vec!["grit", "focus"]);
    }

    #[test]
    fn test_parse_ideas_rejects_garbage() {
        let err = parse_ideas("I can't help with that").unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn test_video_prompt_request_mentions_idea() {
        let idea = Idea {
            title: "Cold showers".to_string(),
            hook: "60 seconds of courage".to_string(),
            ..Default::default()
        };
        let request = video_prompt_request(&idea);
        assert!(request.contains("TITLE: Cold showers"));
        assert!(request.contains("HOOK: 60 seconds of courage"));
    }

    #[test]
    fn test_ideas_prompt_includes_count_and_niche() {
        let client = AnthropicClient::new(
            "key",
            "claude-3-5-haiku-20241022",
            "stoic philosophy",
            Duration::from_secs(5),
        )
        .unwrap();
        let prompt = client.ideas_prompt(4);
        assert!(prompt.contains("Generate 4 trending"));
        assert!(prompt.contains("NICHE: stoic philosophy"));
    }
}
