// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory remote store for offline mode and tests.

use crate::db::{CollectionPath, DocPath, RemoteStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Documents keyed by their full rendered path.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    docs: Arc<DashMap<String, Map<String, Value>>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing the network: every call fails until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Snapshot of a single document.
    pub fn get(&self, path: &DocPath) -> Option<Map<String, Value>> {
        self.docs.get(&path.to_string()).map(|doc| doc.clone())
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::Remote(AppError::REMOTE_UNREACHABLE.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<()> {
        self.check_reachable()?;
        self.docs.entry(path.to_string()).or_default().extend(fields);
        Ok(())
    }

    async fn list(&self, path: &CollectionPath) -> Result<Vec<Map<String, Value>>> {
        self.check_reachable()?;
        let prefix = format!("{}/", path);

        let mut children: Vec<(String, Map<String, Value>)> = self
            .docs
            .iter()
            .filter(|entry| {
                entry
                    .key()
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(children.into_iter().map(|(_, doc)| doc).collect())
    }
}
