use crate::domain::sync_plan::{scan_local, RemoteObject};
use crate::error::BoxError;
use crate::ports::storage::{ObjectStore, PutOptions};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// FsStore implements ObjectStore on a local directory: keys are paths
/// relative to `root`. Backs `file://` destinations.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BoxError> {
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(format!("refusing key outside the store root: {}", key).into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, BoxError> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        let files = tokio::task::spawn_blocking(move || {
            if root.is_dir() {
                scan_local(&root)
            } else {
                Ok(Vec::new())
            }
        })
        .await??;

        Ok(files
            .into_iter()
            .filter(|file| file.relative.starts_with(&prefix))
            .map(|file| RemoteObject {
                key: file.relative,
                size: file.size,
                modified_secs: file.modified_secs,
            })
            .collect())
    }

    async fn put(
        &self,
        local_path: &Path,
        key: &str,
        _options: &PutOptions,
    ) -> Result<(), BoxError> {
        let key_path = self.path_for(key)?;
        if key_path != local_path {
            if let Some(parent) = key_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(local_path, key_path).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BoxError> {
        let key_path = self.path_for(key)?;
        match tokio::fs::remove_file(&key_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn probe(&self, _prefix: &str) -> Result<(), BoxError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let metadata = tokio::fs::metadata(&self.root).await?;
        if metadata.permissions().readonly() {
            return Err(format!("{} is read-only", self.root.display()).into());
        }
        Ok(())
    }
}
