//! Durable key-value storage for provider credentials.
//!
//! Each provider owns a single string entry keyed `"<provider>-api-key"`.

use crate::error::GenError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Storage key for a provider's credential
pub fn credential_key(provider: &str) -> String {
    format!("{}-api-key", provider)
}

/// String-keyed durable storage.
#[async_trait]
pub trait CredentialStore: Send + Sync + Debug + 'static {
    /// Read a value, `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, GenError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), GenError>;
}

/// Process-local store, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GenError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GenError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object file mapping keys to values.
///
/// The file is re-read on every access so that separate processes sharing it
/// observe each other's writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/toolwiz/credentials.json`
    pub fn default_location() -> Result<Self, GenError> {
        let dir = dirs::config_dir()
            .ok_or_else(|| GenError::storage("No configuration directory on this platform"))?;
        Ok(Self::new(dir.join("toolwiz").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, GenError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(GenError::storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), GenError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GenError::storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, content).await.map_err(|e| {
            GenError::storage(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GenError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GenError> {
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_key() {
        assert_eq!(credential_key("runware"), "runware-api-key");
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileStore::new(&path);
        assert_eq!(store.get("runware-api-key").await.unwrap(), None);
        store.set("runware-api-key", "secret").await.unwrap();
        store.set("other-api-key", "x").await.unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("runware-api-key").await.unwrap().as_deref(),
            Some("secret")
        );
        reopened.set("other-api-key", "y").await.unwrap();
        assert_eq!(store.get("other-api-key").await.unwrap().as_deref(), Some("y"));
        assert_eq!(
            store.get("runware-api-key").await.unwrap().as_deref(),
            Some("secret")
        );
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::new(&path).get("k").await.unwrap_err();
        assert!(matches!(err, GenError::Serialization(_)));
    }
}
