//! Attachment file stores.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::record::StoredFile;
use crate::traits::FileStore;

/// Reject anything that is not a single plain path segment.
fn check_name(file_name: &str) -> Result<(), StorageError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::Backend(format!(
            "invalid attachment file name '{file_name}'"
        ))),
    }
}

fn join_url(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name)
}

/// Stores files in a local directory, created on first save.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalFileStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        check_name(file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(file_name), bytes).await?;
        Ok(StoredFile {
            file_name: file_name.to_string(),
            url: join_url(&self.url_prefix, file_name),
        })
    }

    async fn remove(&self, file_name: &str) -> Result<(), StorageError> {
        check_name(file_name)?;
        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps files in memory. Handy for tests that need to observe the
/// remove-on-failure path.
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    url_prefix: String,
}

impl MemoryFileStore {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            files: Arc::default(),
            url_prefix: url_prefix.into(),
        }
    }

    pub async fn contains(&self, file_name: &str) -> bool {
        self.files.lock().await.contains_key(file_name)
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.lock().await.is_empty()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        check_name(file_name)?;
        self.files
            .lock()
            .await
            .insert(file_name.to_string(), bytes.to_vec());
        Ok(StoredFile {
            file_name: file_name.to_string(),
            url: join_url(&self.url_prefix, file_name),
        })
    }

    async fn remove(&self, file_name: &str) -> Result<(), StorageError> {
        self.files.lock().await.remove(file_name);
        Ok(())
    }
}
