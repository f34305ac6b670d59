//! Interfaces to the systems the pipeline drives.
//!
//! The orchestrator only ever sees these traits; the concrete clients
//! (Anthropic for ideas and prompts, Hugging Face for rendering, YouTube
//! for publishing) live in the submodules and tests swap in stubs.

pub mod anthropic;
pub mod huggingface;
pub mod youtube;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Artifact, GenerationPrompt, Idea, PublishedVideo, RenderedMedia};

// Re-export the concrete clients
pub use anthropic::AnthropicClient;
pub use huggingface::HuggingFaceVideoClient;
pub use youtube::YouTubePublisher;

/// One poll of a remote render job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job finished and returned media
    Ready(RenderedMedia),

    /// The job is still cold-starting
    NotReady,

    /// The call failed; may be retried
    Failed(String),
}

/// Idea generation failed; nothing can run without ideas
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text model request failed: {0}")]
    Upstream(String),

    #[error("could not parse idea batch: {0}")]
    Parse(String),
}

/// Prompt derivation failed for one idea
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("text model request failed: {0}")]
    Upstream(String),

    #[error("text model returned an empty prompt")]
    Empty,
}

/// Persisting or releasing an artifact failed
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("artifact I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to persist empty media")]
    EmptyMedia,
}

/// Publishing failed for one item
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("upload request failed: {0}")]
    Upstream(String),

    #[error("failed to read artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload finished without a video id")]
    MissingVideoId,
}

/// Writing to the ledger failed; never fatal
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Produces batches of structured ideas
#[async_trait]
pub trait IdeaSource: Send + Sync {
    async fn generate(&self, count: usize) -> Result<Vec<Idea>, GenerationError>;
}

/// Turns one idea into one generation prompt
#[async_trait]
pub trait PromptDeriver: Send + Sync {
    async fn derive(&self, idea: &Idea) -> Result<GenerationPrompt, DerivationError>;
}

/// Submits a prompt to the render backend or polls its job
///
/// Must be safe to call repeatedly with the same prompt. Transport
/// errors are reported as [`JobOutcome::Failed`].
#[async_trait]
pub trait RemoteJobClient: Send + Sync {
    async fn submit_or_poll(&self, prompt: &GenerationPrompt) -> JobOutcome;
}

/// Transient storage for rendered media
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist media for the item that rendered it
    async fn persist(
        &self,
        media: &RenderedMedia,
        prompt: &GenerationPrompt,
    ) -> Result<Artifact, StorageError>;

    /// Remove the artifact's backing storage
    async fn release(&self, artifact: &Artifact) -> Result<(), StorageError>;
}

/// Publishes an artifact for an idea
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, artifact: &Artifact, idea: &Idea)
        -> Result<PublishedVideo, PublishError>;
}

/// Append-only audit trail of per-idea outcomes
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn log_idea(&self, idea: &Idea) -> Result<(), LedgerError>;

    async fn log_video(&self, idea: &Idea, video: &PublishedVideo) -> Result<(), LedgerError>;

    async fn log_error(
        &self,
        idea: &Idea,
        reason: &str,
        stage: crate::domain::FailureStage,
    ) -> Result<(), LedgerError>;
}
