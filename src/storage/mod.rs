// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local key-value store that survives restarts.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Key names as constants.
pub mod keys {
    pub const HAS_LOGGED_IN: &str = "hasLoggedIn";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const ID: &str = "id";
    pub const EMAIL: &str = "email";
    pub const PHOTO_URL: &str = "photoUrl";
    /// Auxiliary application record
    pub const AUXILIARY: &str = "stuff";
    /// Serialized card snapshot (JSON text)
    pub const CARDS: &str = "cards";
}

/// Durable async key-value storage of JSON values.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
