/// Disk-based media storage backend
use crate::{
    error::{KudosError, KudosResult},
    media::MediaBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores objects on the local filesystem, sharded by the first two
/// characters of the key.
#[derive(Clone)]
pub struct DiskMediaBackend {
    base_path: PathBuf,
}

impl DiskMediaBackend {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// {base}/{first2chars}/{key}
    fn object_path(&self, key: &str) -> KudosResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(KudosError::MediaStorage(format!("Invalid media key: {:?}", key)));
        }

        let shard = key.get(0..2).unwrap_or("_");
        Ok(self.base_path.join(shard).join(key))
    }
}

#[async_trait]
impl MediaBackend for DiskMediaBackend {
    async fn put(&self, key: &str, data: Vec<u8>) -> KudosResult<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                KudosError::MediaStorage(format!("Failed to create media directory: {}", e))
            })?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| KudosError::MediaStorage(format!("Failed to write media {}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> KudosResult<Option<Vec<u8>>> {
        let path = self.object_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KudosError::MediaStorage(format!(
                "Failed to read media {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> KudosResult<()> {
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KudosError::MediaStorage(format!(
                "Failed to delete media {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> KudosResult<bool> {
        fs::try_exists(self.object_path(key)?).await.map_err(|e| {
            KudosError::MediaStorage(format!("Failed to stat media {}: {}", key, e))
        })
    }

    async fn health_check(&self) -> KudosResult<()> {
        let metadata = fs::metadata(&self.base_path).await.map_err(|e| {
            KudosError::MediaStorage(format!(
                "Media root {} unavailable: {}",
                self.base_path.display(),
                e
            ))
        })?;

        if !metadata.is_dir() {
            return Err(KudosError::MediaStorage(format!(
                "Media root {} is not a directory",
                self.base_path.display()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempdir().unwrap();
        let backend = DiskMediaBackend::new(dir.path().to_path_buf());

        backend.put("photo-1.png", b"png".to_vec()).await.unwrap();
        assert_eq!(backend.get("photo-1.png").await.unwrap(), Some(b"png".to_vec()));
        assert!(backend.exists("photo-1.png").await.unwrap());

        backend.delete("photo-1.png").await.unwrap();
        assert!(!backend.exists("photo-1.png").await.unwrap());

        // Deleting twice is fine
        backend.delete("photo-1.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let backend = DiskMediaBackend::new(dir.path().to_path_buf());

        assert!(backend.delete("../etc/passwd").await.is_err());
        assert!(backend.put("", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_storage_faults_are_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let backend = DiskMediaBackend::new(blocker.join("media"));
        assert!(matches!(
            backend.exists("photo-1.png").await,
            Err(KudosError::MediaStorage(_))
        ));
        assert!(backend.health_check().await.is_err());

        // The root must be a directory, not just present
        assert!(DiskMediaBackend::new(blocker).health_check().await.is_err());
        assert!(DiskMediaBackend::new(dir.path().to_path_buf())
            .health_check()
            .await
            .is_ok());
    }

    #[test]
    fn test_directory_sharding() {
        let backend = DiskMediaBackend::new(PathBuf::from("/media"));
        let path = backend.object_path("abc123").unwrap();
        assert!(path.to_string_lossy().contains("/ab/"));
    }
}
