//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR: &str = "playlist-sync";

/// Tokio-based file system implementation
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous contents intact.
pub struct TokioFileSystem {
    data_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor rooted at the platform data directory
    pub fn new() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR);

        Self { data_dir }
    }

    /// Create a new file system accessor with a custom data directory
    pub fn with_data_directory(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        if !fs::try_exists(&self.data_dir)
            .await
            .map_err(Self::map_io_error)?
        {
            fs::create_dir_all(&self.data_dir)
                .await
                .map_err(Self::map_io_error)?;
            debug!(path = ?self.data_dir, "Created data directory");
        }
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.create_dir_all(parent).await?;
        }

        let tmp = Self::temp_path(path);
        fs::write(&tmp, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        fs::rename(&tmp, path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::with_data_directory(dir.path().to_path_buf());
        let path = dir.path().join("nested").join("templates.json");

        fs.write_file(&path, Bytes::from_static(b"{}")).await.unwrap();

        assert!(fs.exists(&path).await.unwrap());
        assert_eq!(fs.read_file(&path).await.unwrap(), Bytes::from_static(b"{}"));
        assert!(!fs.exists(&TokioFileSystem::temp_path(&path)).await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::with_data_directory(dir.path().to_path_buf());
        let path = dir.path().join("templates.json");

        fs.write_file(&path, Bytes::from_static(b"first")).await.unwrap();
        fs.write_file(&path, Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(
            fs.read_file(&path).await.unwrap(),
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test]
    async fn test_data_directory_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let fs = TokioFileSystem::with_data_directory(root.clone());

        assert_eq!(fs.get_data_directory().await.unwrap(), root);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::with_data_directory(dir.path().to_path_buf());

        let err = fs.delete_file(&dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
