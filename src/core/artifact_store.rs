//! Filesystem storage for rendered media awaiting publication.
//!
//! Files are named `video_{timestamp}_{prompt-hash}.{ext}` so an item's
//! artifact can be traced back to the prompt that rendered it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};

use crate::adapters::{ArtifactStore, StorageError};
use crate::domain::{Artifact, GenerationPrompt, RenderedMedia};

/// Directory-backed [`ArtifactStore`]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the artifacts directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(media: &RenderedMedia, prompt: &GenerationPrompt) -> String {
        format!(
            "video_{}_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            &hash_input(prompt.as_str())[..8],
            extension_for(&media.content_type)
        )
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(
        &self,
        media: &RenderedMedia,
        prompt: &GenerationPrompt,
    ) -> Result<Artifact, StorageError> {
        if media.is_empty() {
            return Err(StorageError::EmptyMedia);
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(Self::file_name(media, prompt));
        fs::write(&path, &media.bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        let artifact = Artifact::new(path, media.content_type.clone(), media.len() as u64);
        info!(
            file = %artifact.file_name(),
            size_mb = %format!("{:.2}", artifact.size_mb()),
            "Video saved"
        );
        Ok(artifact)
    }

    async fn release(&self, artifact: &Artifact) -> Result<(), StorageError> {
        match fs::remove_file(&artifact.path).await {
            Ok(()) => {
                debug!(file = %artifact.file_name(), "Cleaned up artifact");
                Ok(())
            }
            // Already gone is as good as released
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: artifact.path.clone(),
                source,
            }),
        }
    }
}

/// File extension for a video MIME type
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/gif" => "gif",
        _ => "mp4",
    }
}

/// Hash input content (first 16 hex chars of SHA256)
pub fn hash_input(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_persist_and_release() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path().join("artifacts"));
        let prompt = GenerationPrompt::new("sunrise over mountains, slow pan");

        let artifact = store
            .persist(&RenderedMedia::mp4(vec![7u8; 2048]), &prompt)
            .await
            .unwrap();

        assert!(artifact.path.exists());
        assert_eq!(artifact.size_bytes, 2048);
        assert!(artifact.file_name().starts_with("video_"));
        assert!(artifact.file_name().ends_with(".mp4"));
        assert!(artifact.file_name().contains(&hash_input(prompt.as_str())[..8]));

        store.release(&artifact).await.unwrap();
        assert!(!artifact.path.exists());
    }

    #[tokio::test]
    async fn test_release_twice_is_ok() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());
        let artifact = store
            .persist(&RenderedMedia::new(vec![1], "video/webm"), &GenerationPrompt::new("p"))
            .await
            .unwrap();

        assert!(artifact.file_name().ends_with(".webm"));
        store.release(&artifact).await.unwrap();
        store.release(&artifact).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_media_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());
        let err = store
            .persist(&RenderedMedia::mp4(Vec::new()), &GenerationPrompt::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptyMedia));
    }

    #[test]
    fn test_input_hash_consistency() {
        let hash1 = hash_input("test input");
        let hash2 = hash_input("test input");
        let hash3 = hash_input("different input");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 16);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_input_hash_known_value() {
        // SHA256("abc") starts with ba7816bf8f01cfea
        assert_eq!(hash_input("abc"), "ba7816bf8f01cfea");
    }
}
