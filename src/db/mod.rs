//! Remote document store (Firestore).

pub mod firestore;
pub mod memory;
pub mod paths;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryRemoteStore;
pub use paths::{CollectionPath, DocPath};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Cards live in a subcollection of each user document
    pub const CARDS: &str = "cards";
}

/// Path-addressed document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Merge `fields` into the document at `path`, creating it if absent.
    ///
    /// Top-level fields not named in `fields` are left untouched.
    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<()>;

    /// All documents directly under a collection.
    async fn list(&self, path: &CollectionPath) -> Result<Vec<Map<String, Value>>>;
}
