//! File upload service.
//!
//! Size-checks and stores uploaded bytes; type validation is the content
//! pipeline's job since acceptable types depend on the content kind.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::storage::{FileStorage, LocalFileStorage};

/// Maximum file size (32 MB).
pub const MAX_FILE_SIZE: usize = 32 * 1024 * 1024;

/// File service for storing uploads and generated artifacts.
pub struct FileService {
    storage: Arc<LocalFileStorage>,
}

impl FileService {
    /// Create a new file service.
    pub fn new(storage: Arc<LocalFileStorage>) -> Self {
        Self { storage }
    }

    /// Store uploaded bytes under the given directory; returns the storage URI.
    pub async fn store(&self, dir: &str, filename: &str, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            bail!("empty upload: {}", filename);
        }
        if data.len() > MAX_FILE_SIZE {
            bail!(
                "file too large: {} bytes (max {} bytes)",
                data.len(),
                MAX_FILE_SIZE
            );
        }

        let uri = self.storage.generate_uri(dir, filename);
        self.storage
            .write(&uri, data)
            .await
            .context("failed to write upload to storage")?;

        debug!(uri = %uri, size = data.len(), "upload stored");
        Ok(uri)
    }

    /// The underlying storage backend.
    pub fn storage(&self) -> &Arc<LocalFileStorage> {
        &self.storage
    }
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService").finish()
    }
}

/// Sanitize a filename for safe storage.
pub fn sanitize_filename(filename: &str) -> String {
    use std::path::Path;

    // Get just the filename part (no path)
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    // Replace unsafe characters
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect::<String>()
        .chars()
        .take(200)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("notes-v2.pdf"), "notes-v2.pdf");
        assert_eq!(sanitize_filename("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
    }

    #[tokio::test]
    async fn store_rejects_empty_upload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalFileStorage::new(dir.path(), "/files"));
        let service = FileService::new(storage);

        assert!(service.store("contents", "empty.pdf", b"").await.is_err());
    }
}
