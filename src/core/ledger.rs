//! Append-only ledger with file-based persistence.
//!
//! Records are stored as newline-delimited JSON (JSONL) in a single file
//! shared by every run, each line stamped with the run id that wrote it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;
use uuid::Uuid;

use crate::adapters::{Ledger, LedgerError};
use crate::domain::{FailureStage, Idea, LedgerEntry, LedgerRecord, PublishedVideo, RecordKind};

/// File-based ledger using JSONL format
pub struct JsonlLedger {
    /// Path to the ledger file
    path: PathBuf,

    /// Run that records are stamped with
    run_id: Uuid,
}

impl JsonlLedger {
    /// Open (creating the parent directory if needed) a ledger for a run
    pub async fn open(path: impl Into<PathBuf>, run_id: Uuid) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create ledger directory: {}", parent.display()))?;
        }

        Ok(Self { path, run_id })
    }

    /// Get the path to the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append a record to the ledger
    pub async fn append(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let json = serde_json::to_string(record)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        debug!(kind = ?record.kind(), title = %record.title(), "Ledger record written");
        Ok(())
    }

    async fn append_entry(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.append(&LedgerRecord::new(self.run_id, entry)).await
    }

    /// Replay all records in order
    pub async fn replay(path: &Path) -> Result<Vec<LedgerRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open ledger: {}", path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut records = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let record: LedgerRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse ledger record: {}", line))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Replay records of one kind, newest last, keeping at most `limit`
    pub async fn recent(
        path: &Path,
        kind: Option<RecordKind>,
        limit: usize,
    ) -> Result<Vec<LedgerRecord>> {
        let mut records: Vec<LedgerRecord> = Self::replay(path)
            .await?
            .into_iter()
            .filter(|r| kind.map_or(true, |k| r.kind() == k))
            .collect();

        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }
}

#[async_trait]
impl Ledger for JsonlLedger {
    async fn log_idea(&self, idea: &Idea) -> Result<(), LedgerError> {
        self.append_entry(LedgerEntry::idea(idea)).await
    }

    async fn log_video(&self, idea: &Idea, video: &PublishedVideo) -> Result<(), LedgerError> {
        self.append_entry(LedgerEntry::video(idea, video)).await
    }

    async fn log_error(
        &self,
        idea: &Idea,
        reason: &str,
        stage: FailureStage,
    ) -> Result<(), LedgerError> {
        self.append_entry(LedgerEntry::error(idea, reason, stage)).await
    }
}
