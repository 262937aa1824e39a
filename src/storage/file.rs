// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON-file backed local store.
//!
//! The whole key space is one JSON object on disk. It is read on first use
//! and rewritten (temp file + rename) after every mutation.

use crate::error::{AppError, Result};
use crate::storage::LocalStore;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Option<Map<String, Value>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No store file yet, starting empty");
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            AppError::Storage(format!("Corrupt store file {}: {}", self.path.display(), e))
        })
    }

    async fn persist(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to replace store file: {}", e)))?;
        Ok(())
    }

    /// Run `f` against the loaded map and write the result back.
    async fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> bool,
    {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let Some(entries) = guard.as_mut() else {
            return Err(AppError::Storage("store not loaded".to_string()));
        };

        let mut next = entries.clone();
        if f(&mut next) {
            self.persist(&next).await?;
            *entries = next;
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|entries| entries.remove(key).is_some()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("store.json");

        let store = FileStore::new(&path);
        store.set("email", Value::from("a@b.com")).await.unwrap();
        store.set("hasLoggedIn", Value::Bool(true)).await.unwrap();
        drop(store);

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("email").await.unwrap(),
            Some(Value::from("a@b.com"))
        );
        assert_eq!(
            reopened.get("hasLoggedIn").await.unwrap(),
            Some(Value::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_remove_and_missing_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("store.json"));

        assert_eq!(store.get("id").await.unwrap(), None);
        store.remove("id").await.unwrap();

        store.set("id", Value::from("u1")).await.unwrap();
        store.remove("id").await.unwrap();
        assert_eq!(store.get("id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        let err = store.get("id").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
