//! Run statistics and the batch report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{ItemStage, PipelineItem};

/// Counters for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Items that reached a terminal stage
    pub total: usize,

    /// Items that were published
    pub successful: usize,

    /// Items that failed at any stage
    pub failed: usize,

    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            started_at: Utc::now(),
        }
    }

    /// Count one item on its terminal transition
    ///
    /// Non-terminal items are ignored so a resolved item is never
    /// counted twice through an intermediate stage.
    pub fn record(&mut self, stage: ItemStage) {
        match stage {
            ItemStage::Published => {
                self.total += 1;
                self.successful += 1;
            }
            ItemStage::Failed => {
                self.total += 1;
                self.failed += 1;
            }
            _ => {}
        }
    }

    /// `total == successful + failed`
    pub fn is_consistent(&self) -> bool {
        self.total == self.successful + self.failed
    }

    /// Wall time since the run started
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Everything a batch run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Run identifier stamped on every ledger record
    pub run_id: Uuid,

    /// Final counters
    pub stats: RunStats,

    /// Items that were attempted, in batch order
    pub items: Vec<PipelineItem>,

    /// Whether the run stopped on a cancellation signal
    pub cancelled: bool,
}

impl BatchReport {
    /// Items that made it to the platform
    pub fn published(&self) -> impl Iterator<Item = &PipelineItem> {
        self.items
            .iter()
            .filter(|item| item.stage == ItemStage::Published)
    }

    /// Items that failed
    pub fn failures(&self) -> impl Iterator<Item = &PipelineItem> {
        self.items
            .iter()
            .filter(|item| item.stage == ItemStage::Failed)
    }
}
