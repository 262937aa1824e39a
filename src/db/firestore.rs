// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed remote document store.
//!
//! Paths map onto Firestore as:
//! - `/users/{uid}` -> document `uid` in the root `users` collection
//! - `/users/{uid}/cards/{card}` -> document `card` in the `cards`
//!   subcollection under `users/{uid}`

use crate::db::{CollectionPath, DocPath, RemoteStore};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any token, so skip credential discovery entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::Remote(format!(
                "{}: failed to connect to Firestore: {}",
                AppError::REMOTE_UNREACHABLE,
                e
            ))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Remote(format!(
                "{}: failed to connect to Firestore Emulator: {}",
                AppError::REMOTE_UNREACHABLE,
                e
            ))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Full Firestore parent path for a list of (collection, document) ancestors.
    fn parent_path(&self, ancestors: &[(&str, &str)]) -> String {
        let mut parent = self.client.get_documents_path().to_string();
        for (collection, document) in ancestors {
            parent.push('/');
            parent.push_str(collection);
            parent.push('/');
            parent.push_str(document);
        }
        parent
    }
}

#[async_trait]
impl RemoteStore for FirestoreDb {
    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> Result<(), AppError> {
        let parent = self.parent_path(&path.ancestors());
        // Only the named fields are written; the rest of the document is kept.
        let mask: Vec<String> = fields.keys().cloned().collect();

        let _: () = self
            .client
            .fluent()
            .update()
            .fields(mask)
            .in_col(path.collection_id())
            .document_id(path.document_id())
            .parent(parent.as_str())
            .object(&fields)
            .execute()
            .await
            .map_err(|e| AppError::Remote(e.to_string()))?;

        tracing::debug!(path = %path, fields = fields.len(), "Merged document");
        Ok(())
    }

    async fn list(&self, path: &CollectionPath) -> Result<Vec<Map<String, Value>>, AppError> {
        let parent = self.parent_path(&path.ancestors());

        self.client
            .fluent()
            .select()
            .from(path.collection_id())
            .parent(parent.as_str())
            .obj::<Map<String, Value>>()
            .query()
            .await
            .map_err(|e| AppError::Remote(e.to_string()))
    }
}
