/// Media storage for kudos attachments
///
/// Only deletion matters to moderation; uploads are handled by the
/// attachment pipeline in front of this service.

pub mod disk;

pub use disk::DiskMediaBackend;

use crate::error::KudosResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Media storage backend trait
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Store an object under `key`
    async fn put(&self, key: &str, data: Vec<u8>) -> KudosResult<()>;

    /// Retrieve an object by key
    async fn get(&self, key: &str) -> KudosResult<Option<Vec<u8>>>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> KudosResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> KudosResult<bool>;

    /// Check that the backend itself is reachable
    async fn health_check(&self) -> KudosResult<()>;
}

/// Media attached to a kudos post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub key: String,
    pub mime_type: String,
}
