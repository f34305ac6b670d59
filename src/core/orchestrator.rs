//! Batch orchestrator for the idea-to-video pipeline.
//!
//! Drives each idea through prompt derivation, rendering, storage and
//! publishing, one item at a time. A failing item never stops the batch:
//! every stage error is caught in one place per item, written to the
//! ledger, and counted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    AnthropicClient, ArtifactStore, GenerationError, HuggingFaceVideoClient, IdeaSource, Ledger,
    PromptDeriver, Publisher, RemoteJobClient, YouTubePublisher,
};
use crate::config::Config;
use crate::domain::{
    Artifact, BatchReport, FailureStage, Idea, ItemStage, PipelineItem, PublishedVideo, RunStats,
};

use super::artifact_store::FsArtifactStore;
use super::backoff::{BackoffError, BackoffPolicy, PollingBackoffEngine};
use super::ledger::JsonlLedger;

/// Reason recorded on an item interrupted by cancellation
pub const CANCELLED_REASON: &str = "cancelled";

/// External systems the orchestrator drives
pub struct Collaborators {
    pub ideas: Arc<dyn IdeaSource>,
    pub prompts: Arc<dyn PromptDeriver>,
    pub renderer: Arc<dyn RemoteJobClient>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub publisher: Arc<dyn Publisher>,
    pub ledger: Arc<dyn Ledger>,
}

/// Why an item stopped short of publishing
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemFailure {
    stage: FailureStage,
    reason: String,
}

impl ItemFailure {
    fn new(stage: FailureStage, reason: impl ToString) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Main pipeline orchestrator
pub struct Orchestrator {
    ideas: Arc<dyn IdeaSource>,
    prompts: Arc<dyn PromptDeriver>,
    engine: PollingBackoffEngine,
    artifacts: Arc<dyn ArtifactStore>,
    publisher: Arc<dyn Publisher>,
    ledger: Arc<dyn Ledger>,
    run_id: Uuid,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(collaborators: Collaborators, policy: BackoffPolicy) -> Self {
        Self {
            ideas: collaborators.ideas,
            prompts: collaborators.prompts,
            engine: PollingBackoffEngine::new(collaborators.renderer, policy),
            artifacts: collaborators.artifacts,
            publisher: collaborators.publisher,
            ledger: collaborators.ledger,
            run_id: Uuid::new_v4(),
        }
    }

    /// Use a specific run id (matching the one the ledger stamps)
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wire up the production clients from resolved configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let run_id = Uuid::new_v4();

        let anthropic = Arc::new(
            AnthropicClient::from_config(config).context("Failed to create Anthropic client")?,
        );
        let renderer = HuggingFaceVideoClient::from_config(config)
            .context("Failed to create Hugging Face client")?;
        let publisher =
            YouTubePublisher::from_config(config).context("Failed to create YouTube publisher")?;
        let ledger = JsonlLedger::open(&config.ledger_path, run_id).await?;

        let collaborators = Collaborators {
            ideas: anthropic.clone(),
            prompts: anthropic,
            renderer: Arc::new(renderer),
            artifacts: Arc::new(FsArtifactStore::new(&config.artifacts_dir)),
            publisher: Arc::new(publisher),
            ledger: Arc::new(ledger),
        };

        Ok(Self::new(collaborators, BackoffPolicy::from(&config.retry)).with_run_id(run_id))
    }

    /// Generate `count` ideas and run them through the pipeline
    ///
    /// Idea generation failing aborts the run before any item starts.
    #[instrument(skip(self, cancel), fields(run_id = %self.run_id))]
    pub async fn run(
        &self,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, GenerationError> {
        if count == 0 {
            info!("Nothing to do, zero ideas requested");
            return Ok(self.empty_report());
        }

        info!(count, "Generating ideas");
        let ideas = self.ideas.generate(count).await.map_err(|e| {
            error!(error = %e, "Idea generation failed");
            e
        })?;

        if ideas.len() != count {
            warn!(requested = count, received = ideas.len(), "Idea count mismatch");
        }
        info!(count = ideas.len(), "Generated ideas");

        for idea in &ideas {
            if let Err(e) = self.ledger.log_idea(idea).await {
                warn!(title = %idea.display_title(), error = %e, "Failed to log idea");
            }
        }

        Ok(self.run_batch(ideas, cancel).await)
    }

    /// Process ideas strictly in order, isolating per-item failures
    #[instrument(skip(self, ideas, cancel), fields(run_id = %self.run_id, items = ideas.len()))]
    pub async fn run_batch(&self, ideas: Vec<Idea>, cancel: &CancellationToken) -> BatchReport {
        let total = ideas.len();
        let mut report = self.empty_report();

        for (offset, idea) in ideas.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(remaining = total - offset, "Cancelled, skipping remaining ideas");
                report.cancelled = true;
                break;
            }

            let mut item = PipelineItem::new(offset + 1, idea);
            info!(
                item = item.index,
                total,
                title = %item.idea.display_title(),
                "Processing idea"
            );

            let outcome = self.process_item(&mut item, cancel).await;
            let interrupted = matches!(
                &outcome,
                Err(failure) if failure.stage == FailureStage::Cancelled
            );

            self.settle(&mut item, outcome).await;
            report.stats.record(item.stage);
            report.items.push(item);

            if interrupted {
                report.cancelled = true;
                break;
            }
        }

        let stats = &report.stats;
        info!(
            total = stats.total,
            successful = stats.successful,
            failed = stats.failed,
            cancelled = report.cancelled,
            elapsed_secs = stats.elapsed().as_secs(),
            "Run complete"
        );

        report
    }

    /// Run one item up to publishing
    async fn process_item(
        &self,
        item: &mut PipelineItem,
        cancel: &CancellationToken,
    ) -> Result<PublishedVideo, ItemFailure> {
        item.idea
            .validate()
            .map_err(|e| ItemFailure::new(FailureStage::Validation, e))?;

        let prompt = self
            .prompts
            .derive(&item.idea)
            .await
            .map_err(|e| ItemFailure::new(FailureStage::PromptDerivation, e))?;
        debug!(prompt = %prompt.preview(100), "Derived video prompt");
        advance(item, ItemStage::PromptReady, FailureStage::PromptDerivation)?;

        let media = self
            .engine
            .await_media(&prompt, cancel)
            .await
            .map_err(|e| match e {
                BackoffError::Cancelled { .. } => {
                    ItemFailure::new(FailureStage::Cancelled, CANCELLED_REASON)
                }
                BackoffError::Exhausted { .. } => {
                    ItemFailure::new(FailureStage::VideoGeneration, e)
                }
            })?;

        let artifact = self
            .artifacts
            .persist(&media, &prompt)
            .await
            .map_err(|e| ItemFailure::new(FailureStage::ArtifactStorage, e))?;

        // From here on the artifact is released exactly once
        let published = match advance(item, ItemStage::ArtifactReady, FailureStage::ArtifactStorage)
        {
            Ok(()) => self
                .publisher
                .publish(&artifact, &item.idea)
                .await
                .map_err(|e| ItemFailure::new(FailureStage::Publishing, e)),
            Err(failure) => Err(failure),
        };
        self.release(&artifact).await;

        published
    }

    /// Record the item's terminal state and write it to the ledger
    async fn settle(&self, item: &mut PipelineItem, outcome: Result<PublishedVideo, ItemFailure>) {
        match outcome {
            Ok(video) => {
                info!(item = item.index, url = %video.url, "Published");
                if let Err(e) = self.ledger.log_video(&item.idea, &video).await {
                    warn!(item = item.index, error = %e, "Failed to log video");
                }
                if let Err(e) = item.mark_published(video) {
                    error!(item = item.index, error = %e, "Could not mark item published");
                }
            }
            Err(failure) => {
                error!(
                    item = item.index,
                    stage = %failure.stage,
                    reason = %failure.reason,
                    "Item failed"
                );
                if let Err(e) = self
                    .ledger
                    .log_error(&item.idea, &failure.reason, failure.stage)
                    .await
                {
                    warn!(item = item.index, error = %e, "Failed to log error");
                }
                if let Err(e) = item.mark_failed(failure.stage, failure.reason) {
                    error!(item = item.index, error = %e, "Could not mark item failed");
                }
            }
        }
    }

    async fn release(&self, artifact: &Artifact) {
        if let Err(e) = self.artifacts.release(artifact).await {
            warn!(file = %artifact.file_name(), error = %e, "Failed to release artifact");
        }
    }

    fn empty_report(&self) -> BatchReport {
        BatchReport {
            run_id: self.run_id,
            stats: RunStats::new(),
            items: Vec::new(),
            cancelled: false,
        }
    }
}

/// Advance an item, reporting an illegal transition as a stage failure
fn advance(item: &mut PipelineItem, next: ItemStage, stage: FailureStage) -> Result<(), ItemFailure> {
    item.advance(next).map_err(|e| ItemFailure::new(stage, e))
}
