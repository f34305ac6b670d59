//! Content ideas and the prompts derived from them.
//!
//! Ideas come back from a text model, so deserialization is lenient: a
//! missing field becomes empty and is caught later by [`Idea::validate`]
//! instead of failing the whole batch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum title length accepted by the publishing platform
pub const MAX_TITLE_CHARS: usize = 100;

/// Highest virality score an idea may carry
pub const MAX_VIRALITY_SCORE: u8 = 10;

/// A single short-video idea
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    /// Catchy title (at most 100 characters once published)
    #[serde(default)]
    pub title: String,

    /// What the video shows and says
    #[serde(default)]
    pub description: String,

    /// Opening line that stops the scroll
    #[serde(default)]
    pub hook: String,

    /// Intended demographic
    #[serde(default)]
    pub target_audience: String,

    /// Self-reported virality estimate, 0 to 10
    #[serde(default)]
    pub virality_score: u8,

    /// Ordered keywords, used for hashtags and tags
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Idea {
    /// Check that every required field is present and in range
    pub fn validate(&self) -> Result<(), IdeaValidationError> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("hook", &self.hook),
            ("target_audience", &self.target_audience),
        ];

        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(IdeaValidationError::MissingFields(missing.join(", ")));
        }

        if self.virality_score > MAX_VIRALITY_SCORE {
            return Err(IdeaValidationError::ScoreOutOfRange(self.virality_score));
        }

        Ok(())
    }

    /// Title clipped to the platform limit, on a char boundary
    pub fn publish_title(&self) -> String {
        self.title.chars().take(MAX_TITLE_CHARS).collect()
    }

    /// Title for logs and ledger rows, falling back to "Unknown"
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Unknown"
        } else {
            &self.title
        }
    }

    /// Keywords joined the way ledger rows store them
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(", ")
    }
}

/// Why an idea cannot enter the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdeaValidationError {
    #[error("idea is missing required fields: {0}")]
    MissingFields(String),

    #[error("virality score {0} is outside 0-10")]
    ScoreOutOfRange(u8),
}

/// A text-to-video prompt derived from exactly one idea
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationPrompt(String);

impl GenerationPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self(prompt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `max_chars` characters, for log lines
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.0.chars().take(max_chars).collect();
        if self.0.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

impl fmt::Display for GenerationPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
