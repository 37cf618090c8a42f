//! Directory-backed [`ObjectStore`].
//!
//! Each regular file directly under the root is one object; its file name
//! is the key. Used for locally mounted buckets and in tests.

use std::path::{Path, PathBuf};

use crate::bucket::{ObjectInfo, ObjectStore};
use crate::error::SourceError;
use crate::SourceFuture;

#[derive(Debug, Clone)]
pub struct DirBucket {
    root: PathBuf,
    name: String,
}

impl DirBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.display().to_string();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to its file. Keys are flat file names; anything that
    /// could resolve outside the root is rejected.
    fn object_path(&self, key: &str) -> Result<PathBuf, SourceError> {
        if matches!(key, "" | "." | "..") || key.contains(['/', '\\']) {
            return Err(SourceError::InvalidKey(format!(
                "not a flat object key: {key:?}"
            )));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for DirBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_keys(&self) -> SourceFuture<'_, Vec<ObjectInfo>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(&self.root).await?;
            let mut objects = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if !metadata.is_file() {
                    continue;
                }
                if let Ok(key) = entry.file_name().into_string() {
                    objects.push(ObjectInfo {
                        key,
                        size: metadata.len(),
                    });
                }
            }
            Ok(objects)
        })
    }

    fn download<'a>(&'a self, key: &'a str, dest: &'a Path) -> SourceFuture<'a, u64> {
        Box::pin(async move {
            let path = self.object_path(key)?;
            match tokio::fs::copy(&path, dest).await {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(SourceError::NotFound(key.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> SourceFuture<'a, bool> {
        Box::pin(async move {
            let path = self.object_path(key)?;
            Ok(tokio::fs::try_exists(&path).await?)
        })
    }

    fn copy<'a>(&'a self, from: &'a str, to: &'a str) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let (from_path, to_path) = (self.object_path(from)?, self.object_path(to)?);
            tokio::fs::copy(&from_path, &to_path).await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> SourceFuture<'a, ()> {
        Box::pin(async move {
            let path = self.object_path(key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}
