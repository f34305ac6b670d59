//! Core pipeline logic.
//!
//! This module contains:
//! - Backoff: Polling engine for remote render jobs
//! - ArtifactStore: Filesystem storage for rendered media
//! - Ledger: Append-only JSONL audit trail
//! - Orchestrator: Batch execution engine

pub mod artifact_store;
pub mod backoff;
pub mod ledger;
pub mod orchestrator;

// Re-export commonly used types
pub use artifact_store::{hash_input, FsArtifactStore};
pub use backoff::{BackoffError, BackoffPolicy, PollingBackoffEngine, NOT_READY_EXHAUSTED};
pub use ledger::JsonlLedger;
pub use orchestrator::{Collaborators, Orchestrator, CANCELLED_REASON};
