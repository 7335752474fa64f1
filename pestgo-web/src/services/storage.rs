use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::backend::BackendError;

pub const LANGUAGE_KEY: &str = "pestgo360_language";
pub const SESSION_KEY: &str = "pestgo360_session";

/// Small persistent key/value store backing client-side preferences.
///
/// Entries live in a single JSON object file; every write rewrites the file.
pub struct LocalStorage {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl LocalStorage {
    /// Open the store at `path`. A missing file starts empty; an unreadable or
    /// corrupt one is logged and ignored.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt local storage file");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read local storage file");
                Map::new()
            }
        };

        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .await
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(&entries).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries).await
    }

    async fn persist(&self, entries: &Map<String, Value>) -> Result<(), BackendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::Storage(e.to_string()))?;
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = LocalStorage::open(&path).await;
        storage.set(LANGUAGE_KEY, "en").await.unwrap();
        storage.set(SESSION_KEY, "{}").await.unwrap();
        storage.remove(SESSION_KEY).await.unwrap();

        let reopened = LocalStorage::open(&path).await;
        assert_eq!(reopened.get(LANGUAGE_KEY).await.as_deref(), Some("en"));
        assert_eq!(reopened.get(SESSION_KEY).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let storage = LocalStorage::open(&path).await;
        assert_eq!(storage.get(LANGUAGE_KEY).await, None);

        storage.set(LANGUAGE_KEY, "tr").await.unwrap();
        assert_eq!(
            LocalStorage::open(&path).await.get(LANGUAGE_KEY).await.as_deref(),
            Some("tr")
        );
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let storage = LocalStorage::in_memory();
        assert_eq!(storage.get(LANGUAGE_KEY).await, None);
        storage.set(LANGUAGE_KEY, "en").await.unwrap();
        assert_eq!(storage.get(LANGUAGE_KEY).await.as_deref(), Some("en"));
    }
}
