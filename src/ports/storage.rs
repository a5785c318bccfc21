use crate::domain::sync_plan::RemoteObject;
use crate::error::BoxError;
use async_trait::async_trait;
use std::path::Path;

/// Headers attached to every uploaded object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOptions {
    pub cache_control: String,
    pub content_type: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, BoxError>;

    /// Upload a file from a local path to `key`
    async fn put(&self, local_path: &Path, key: &str, options: &PutOptions)
        -> Result<(), BoxError>;

    /// Delete the object at `key`
    async fn delete(&self, key: &str) -> Result<(), BoxError>;

    /// Verify the store is reachable with the current credentials
    async fn probe(&self, prefix: &str) -> Result<(), BoxError>;
}
