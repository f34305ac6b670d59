//! reelforge - Batch pipeline from ideas to published short videos
//!
//! Generates short-form video ideas with a text model, renders each one
//! on a hosted text-to-video model and uploads the result.
//!
//! # Architecture
//!
//! The pipeline is a single sequential batch:
//! - Each idea becomes one item that either publishes or fails on its own
//! - Rendering polls a cold-starting remote model with bounded backoff
//! - Every outcome is appended to a JSONL ledger stamped with the run id
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Anthropic, Hugging Face, YouTube)
//! - `core`: Orchestration logic (Backoff engine, Orchestrator, Ledger, ArtifactStore)
//! - `domain`: Data structures (Idea, PipelineItem, RunStats, LedgerRecord)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Generate and publish three videos
//! reelforge run -n 3
//!
//! # Show the last errors
//! reelforge ledger --kind error
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use core::{BackoffPolicy, Collaborators, Orchestrator, PollingBackoffEngine};
pub use domain::{BatchReport, Idea, PipelineItem, RunStats};
