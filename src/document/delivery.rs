use crate::error::{ExportError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Where a finished document goes
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Store `bytes` under `file_name` and return its location
    async fn deliver(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Writes documents into a directory, creating it when missing
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Delivery for DirectoryDelivery {
    async fn deliver(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ExportError::DeliveryFailed(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ExportError::DeliveryFailed(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(path.display().to_string())
    }
}

/// Keeps delivered documents in memory
#[derive(Debug, Default)]
pub struct MemoryDelivery {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryDelivery {
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().clone()
    }
}

#[async_trait]
impl Delivery for MemoryDelivery {
    async fn deliver(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        self.files.lock().push((file_name.to_string(), bytes));
        Ok(format!("memory:{}", file_name))
    }
}
