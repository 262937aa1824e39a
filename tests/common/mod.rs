// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use mecard::db::{FirestoreDb, MemoryRemoteStore};
use mecard::models::{AuthClaims, AuthState};
use mecard::services::{EventBus, SessionManager, SignOutPolicy, StaticIdentityProvider};
use mecard::storage::MemoryStore;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// The user from the Google sign-in scenario.
#[allow(dead_code)]
pub fn alice() -> AuthState {
    AuthState::new(
        "u1",
        AuthClaims {
            email: "a@b.com".to_string(),
            display_name: "Al".to_string(),
            photo_url: "http://x/p.png".to_string(),
            provider_id: "google.com".to_string(),
        },
    )
}

/// Manager wired to in-memory collaborators, with handles to each.
#[allow(dead_code)]
pub struct Harness {
    pub manager: SessionManager,
    pub identity: Arc<StaticIdentityProvider>,
    pub local: MemoryStore,
    pub remote: MemoryRemoteStore,
    pub events: EventBus,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(SignOutPolicy::default())
}

#[allow(dead_code)]
pub fn harness_with(policy: SignOutPolicy) -> Harness {
    let identity = Arc::new(StaticIdentityProvider::new(alice()));
    let local = MemoryStore::new();
    let remote = MemoryRemoteStore::new();
    let events = EventBus::new();

    let manager = SessionManager::builder(
        identity.clone(),
        Arc::new(local.clone()),
        Arc::new(remote.clone()),
    )
    .events(events.clone())
    .sign_out_policy(policy)
    .build();

    Harness {
        manager,
        identity,
        local,
        remote,
        events,
    }
}
