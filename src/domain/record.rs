//! Ledger records.
//!
//! Every per-idea outcome is written as an immutable record in an
//! append-only log. The three record kinds mirror the audit sheets the
//! pipeline keeps: ideas, published videos and errors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::idea::Idea;
use super::item::{FailureStage, PublishedVideo};

/// Error text is clipped to this many characters in the ledger
pub const MAX_ERROR_CHARS: usize = 500;

/// A single line in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// When the record was written (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this record belongs to
    pub run_id: Uuid,

    /// Kind-specific payload
    #[serde(flatten)]
    pub entry: LedgerEntry,
}

impl LedgerRecord {
    pub fn new(run_id: Uuid, entry: LedgerEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            entry,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.entry.kind()
    }

    /// Title the record refers to
    pub fn title(&self) -> &str {
        match &self.entry {
            LedgerEntry::Idea { title, .. }
            | LedgerEntry::Video { title, .. }
            | LedgerEntry::Error { title, .. } => title,
        }
    }
}

/// Payload of a ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    /// An idea entered the batch
    Idea {
        title: String,
        description: String,
        hook: String,
        target_audience: String,
        virality_score: u8,
        keywords: String,
        status: String,
    },

    /// A video was published
    Video {
        title: String,
        url: String,
        video_id: String,
        status: String,
        virality_score: u8,
        keywords: String,
    },

    /// An item failed
    Error {
        title: String,
        error: String,
        stage: FailureStage,
    },
}

impl LedgerEntry {
    pub fn idea(idea: &Idea) -> Self {
        Self::Idea {
            title: idea.title.clone(),
            description: idea.description.clone(),
            hook: idea.hook.clone(),
            target_audience: idea.target_audience.clone(),
            virality_score: idea.virality_score,
            keywords: idea.keywords_joined(),
            status: "pending".to_string(),
        }
    }

    pub fn video(idea: &Idea, video: &PublishedVideo) -> Self {
        Self::Video {
            title: idea.title.clone(),
            url: video.url.clone(),
            video_id: video.id.clone(),
            status: "published".to_string(),
            virality_score: idea.virality_score,
            keywords: idea.keywords_joined(),
        }
    }

    pub fn error(idea: &Idea, error: &str, stage: FailureStage) -> Self {
        Self::Error {
            title: idea.display_title().to_string(),
            error: error.chars().take(MAX_ERROR_CHARS).collect(),
            stage,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Idea { .. } => RecordKind::Idea,
            Self::Video { .. } => RecordKind::Video,
            Self::Error { .. } => RecordKind::Error,
        }
    }
}

/// Record kinds, for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Idea,
    Video,
    Error,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idea => "idea",
            Self::Video => "video",
            Self::Error => "error",
        };
        f.pad(name)
    }
}
