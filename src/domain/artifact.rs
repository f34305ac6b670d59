//! Rendered media and the transient artifacts it is persisted as.
//!
//! An artifact belongs to exactly one pipeline item and must be released
//! once that item reaches a terminal stage.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default content type for rendered video
pub const VIDEO_MP4: &str = "video/mp4";

/// Raw media returned by a finished remote job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMedia {
    /// Binary payload
    pub bytes: Vec<u8>,

    /// MIME type reported for the payload
    pub content_type: String,
}

impl RenderedMedia {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Media with the default mp4 content type
    pub fn mp4(bytes: Vec<u8>) -> Self {
        Self::new(bytes, VIDEO_MP4)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Handle to persisted media awaiting publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Where the media lives while the item is in flight
    pub path: PathBuf,

    /// MIME type, forwarded to the publisher
    pub content_type: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// When the artifact was written
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(path: PathBuf, content_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path,
            content_type: content_type.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Size in mebibytes, for log lines
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// File name component of the artifact path
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
