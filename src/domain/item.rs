//! Per-idea pipeline state.
//!
//! Each idea in a batch becomes one [`PipelineItem`] that moves through
//! `Pending -> PromptReady -> ArtifactReady -> Published`, or drops to
//! `Failed` from any non-terminal stage.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::idea::Idea;

/// Stage of a pipeline item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    /// Not yet started
    #[default]
    Pending,

    /// Prompt derived, waiting on the render job
    PromptReady,

    /// Media rendered and persisted, waiting on publish
    ArtifactReady,

    /// Published (terminal)
    Published,

    /// Failed at some stage (terminal)
    Failed,
}

impl ItemStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_advance_to(self, next: ItemStage) -> bool {
        use ItemStage::*;
        matches!(
            (self, next),
            (Pending, PromptReady)
                | (PromptReady, ArtifactReady)
                | (ArtifactReady, Published)
                | (Pending | PromptReady | ArtifactReady, Failed)
        )
    }
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::PromptReady => "prompt_ready",
            Self::ArtifactReady => "artifact_ready",
            Self::Published => "published",
            Self::Failed => "failed",
        };
        f.pad(name)
    }
}

/// Which step of the item's run produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validation,
    PromptDerivation,
    VideoGeneration,
    ArtifactStorage,
    Publishing,
    Cancelled,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::PromptDerivation => "prompt_derivation",
            Self::VideoGeneration => "video_generation",
            Self::ArtifactStorage => "artifact_storage",
            Self::Publishing => "publishing",
            Self::Cancelled => "cancelled",
        };
        f.pad(name)
    }
}

/// Result of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedVideo {
    /// Platform id of the video
    pub id: String,

    /// Public URL
    pub url: String,
}

/// Illegal stage change requested on an item
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid item transition: {from} → {to}")]
pub struct InvalidTransition {
    pub from: ItemStage,
    pub to: ItemStage,
}

/// Unit of batch work: one idea and where it got to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineItem {
    /// 1-based position in the batch
    pub index: usize,

    /// The idea being produced
    pub idea: Idea,

    /// Current stage
    pub stage: ItemStage,

    /// Step that failed, once the item is Failed
    pub failed_at: Option<FailureStage>,

    /// Human-readable failure reason, once the item is Failed
    pub failure_reason: Option<String>,

    /// Publish result, once the item is Published
    pub published: Option<PublishedVideo>,
}

impl PipelineItem {
    pub fn new(index: usize, idea: Idea) -> Self {
        Self {
            index,
            idea,
            stage: ItemStage::Pending,
            failed_at: None,
            failure_reason: None,
            published: None,
        }
    }

    /// Move to a non-terminal stage
    pub fn advance(&mut self, next: ItemStage) -> Result<(), InvalidTransition> {
        if !self.stage.can_advance_to(next) || next.is_terminal() {
            return Err(InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        Ok(())
    }

    /// Record a successful publish
    pub fn mark_published(&mut self, video: PublishedVideo) -> Result<(), InvalidTransition> {
        if !self.stage.can_advance_to(ItemStage::Published) {
            return Err(InvalidTransition {
                from: self.stage,
                to: ItemStage::Published,
            });
        }
        self.stage = ItemStage::Published;
        self.published = Some(video);
        Ok(())
    }

    /// Record a failure at `stage`
    pub fn mark_failed(
        &mut self,
        stage: FailureStage,
        reason: impl Into<String>,
    ) -> Result<(), InvalidTransition> {
        if !self.stage.can_advance_to(ItemStage::Failed) {
            return Err(InvalidTransition {
                from: self.stage,
                to: ItemStage::Failed,
            });
        }
        self.stage = ItemStage::Failed;
        self.failed_at = Some(stage);
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}
