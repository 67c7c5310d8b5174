//! Media storage
//!
//! Storage abstraction for uploaded and generated media files. The default
//! backend writes to the local filesystem and serves files from a URL
//! prefix; the trait seam exists so an object-store backend can be slotted
//! in without touching the services.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Storage backend trait for media files
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store a file under the given subdirectory with the given extension.
    /// Returns the stored filename and its public URL.
    async fn put(&self, subdir: &str, ext: &str, data: &[u8]) -> Result<StoredFile>;

    /// Delete a previously stored file by its public URL. Deleting a URL
    /// this backend never issued is an error.
    async fn delete(&self, url: &str) -> Result<()>;
}

/// Type alias for a shared storage backend
pub type DynMediaStorage = Arc<dyn MediaStorage>;

/// A stored file's name and public URL
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Generated filename (uuid + extension)
    pub filename: String,
    /// Public URL the file is served under
    pub url: String,
}

/// Local filesystem storage.
///
/// Files land under `root/<subdir>/<uuid>.<ext>` and are served under
/// `url_prefix/<subdir>/<uuid>.<ext>`.
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// Create a local storage backend rooted at the given directory
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let mut url_prefix = url_prefix.into();
        while url_prefix.ends_with('/') {
            url_prefix.pop();
        }
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    /// Create a boxed storage backend for dependency injection
    pub fn boxed(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> DynMediaStorage {
        Arc::new(Self::new(root, url_prefix))
    }

    /// Resolve a public URL back to a path under the storage root.
    ///
    /// Rejects URLs outside the prefix and any path component that could
    /// escape the root.
    fn path_for_url(&self, url: &str) -> Result<PathBuf> {
        let relative = url
            .strip_prefix(&self.url_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| anyhow::anyhow!("URL not managed by this storage: {}", url))?;

        if relative.is_empty()
            || relative.split('/').any(|part| {
                part.is_empty() || part == "." || part == ".." || part.contains('\\')
            })
        {
            anyhow::bail!("Invalid storage URL: {}", url);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for LocalStorage {
    async fn put(&self, subdir: &str, ext: &str, data: &[u8]) -> Result<StoredFile> {
        let filename = if ext.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), ext)
        };

        let dir = if subdir.is_empty() {
            self.root.clone()
        } else {
            self.root.join(subdir)
        };

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create storage directory: {:?}", dir))?;

        let path = dir.join(&filename);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write file: {:?}", path))?;

        let url = if subdir.is_empty() {
            format!("{}/{}", self.url_prefix, filename)
        } else {
            format!("{}/{}/{}", self.url_prefix, subdir, filename)
        };

        Ok(StoredFile { filename, url })
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let path = self.path_for_url(url)?;

        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete file: {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exists(path: &std::path::Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    fn setup() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let storage = LocalStorage::new(dir.path(), "/media");
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_url() {
        let (dir, storage) = setup();

        let stored = storage
            .put("audio", "wav", b"RIFF0000WAVE")
            .await
            .expect("Failed to store file");

        assert!(stored.url.starts_with("/media/audio/"));
        assert!(stored.filename.ends_with(".wav"));

        let on_disk = dir.path().join("audio").join(&stored.filename);
        let contents = tokio::fs::read(&on_disk).await.expect("read back");
        assert_eq!(contents, b"RIFF0000WAVE");
    }

    #[tokio::test]
    async fn test_put_without_extension() {
        let (_dir, storage) = setup();

        let stored = storage.put("", "", b"blob").await.expect("store");
        assert!(!stored.filename.contains('.'));
        assert!(stored.url.starts_with("/media/"));
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let (dir, storage) = setup();

        let stored = storage.put("images", "png", b"fake-png").await.expect("store");
        let on_disk = dir.path().join("images").join(&stored.filename);
        assert!(exists(&on_disk).await);

        storage.delete(&stored.url).await.expect("delete");
        assert!(!exists(&on_disk).await);
    }

    #[tokio::test]
    async fn test_delete_rejects_foreign_url() {
        let (_dir, storage) = setup();

        assert!(storage.delete("/other/file.png").await.is_err());
        assert!(storage.delete("/media/../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_file_errors() {
        let (_dir, storage) = setup();

        assert!(storage.delete("/media/audio/missing.wav").await.is_err());
    }

    #[tokio::test]
    async fn test_trailing_slash_prefix_normalized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path(), "/media/");

        let stored = storage.put("audio", "wav", b"x").await.expect("store");
        assert!(stored.url.starts_with("/media/audio/"));
        assert!(!stored.url.contains("//"));
    }
}
