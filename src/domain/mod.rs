//! Domain types for the reelforge pipeline.
//!
//! This module contains the core data structures:
//! - Idea / GenerationPrompt: what gets produced
//! - Artifact / RenderedMedia: what the render job returns
//! - PipelineItem: per-idea state machine
//! - RunStats / BatchReport: run results
//! - LedgerRecord: audit trail entries

pub mod artifact;
pub mod idea;
pub mod item;
pub mod record;
pub mod stats;

// Re-export commonly used types
pub use artifact::{Artifact, RenderedMedia};
pub use idea::{GenerationPrompt, Idea, IdeaValidationError};
pub use item::{FailureStage, InvalidTransition, ItemStage, PipelineItem, PublishedVideo};
pub use record::{LedgerEntry, LedgerRecord, RecordKind, MAX_ERROR_CHARS};
pub use stats::{BatchReport, RunStats};
