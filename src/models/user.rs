// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User identity and profile models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Opaque session token issued by the identity provider.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Profile claims returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClaims {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    /// Profile picture URL
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    /// Provider that authenticated the user (e.g. "google.com")
    #[serde(default)]
    pub provider_id: String,
}

/// Authenticated state pushed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Unique user id (also used as the remote document id)
    pub uid: String,
    pub auth: AuthClaims,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SessionToken>,
}

impl AuthState {
    pub fn new(uid: impl Into<String>, auth: AuthClaims) -> Self {
        Self {
            uid: uid.into(),
            auth,
            token: None,
        }
    }

    pub fn with_token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }
}

/// User profile document stored at `/users/{uid}`.
///
/// Always written with merge semantics so fields owned by other writers
/// survive a sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfileDocument {
    pub display_name: String,
    pub email: String,
    pub photo_url: String,
    pub provider_id: String,
}

impl UserProfileDocument {
    /// Field map suitable for a partial remote update.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("displayName".into(), Value::String(self.display_name.clone()));
        fields.insert("email".into(), Value::String(self.email.clone()));
        fields.insert("photoUrl".into(), Value::String(self.photo_url.clone()));
        fields.insert("providerId".into(), Value::String(self.provider_id.clone()));
        fields
    }
}

impl From<&AuthClaims> for UserProfileDocument {
    fn from(claims: &AuthClaims) -> Self {
        Self {
            display_name: claims.display_name.clone(),
            email: claims.email.clone(),
            photo_url: claims.photo_url.clone(),
            provider_id: claims.provider_id.clone(),
        }
    }
}

/// Profile fields mirrored into the local key-value store.
///
/// Each field is an independent entry, so any subset may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileCache {
    pub display_name: Option<String>,
    pub id: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub has_logged_in: bool,
    /// Auxiliary application record
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub auxiliary: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_state_deserializes_provider_shape() {
        let json = r#"{
            "uid": "u1",
            "auth": {
                "email": "a@b.com",
                "displayName": "Al",
                "photoURL": "http://x/p.png",
                "providerId": "google.com"
            }
        }"#;
        let state: AuthState = serde_json::from_str(json).unwrap();
        assert_eq!(state.uid, "u1");
        assert_eq!(state.auth.photo_url, "http://x/p.png");
        assert!(state.token.is_none());
    }

    #[test]
    fn test_profile_document_fields_use_remote_names() {
        let doc = UserProfileDocument::from(&AuthClaims {
            email: "a@b.com".into(),
            display_name: "Al".into(),
            photo_url: "http://x/p.png".into(),
            provider_id: "google.com".into(),
        });
        let fields = doc.to_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields["displayName"], "Al");
        assert_eq!(fields["photoUrl"], "http://x/p.png");
        assert_eq!(fields["providerId"], "google.com");
    }

    #[test]
    fn test_session_token_debug_is_redacted() {
        let token = SessionToken::new("secret-id-token");
        assert_eq!(format!("{:?}", token), "SessionToken(***)");
        assert_eq!(token.expose(), "secret-id-token");
    }
}
