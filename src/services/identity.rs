// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity providers.
//!
//! Handles:
//! - Interactive login per provider kind
//! - Logout
//! - Pushing the current auth state to subscribers

use crate::error::AppError;
use crate::models::{AuthClaims, AuthState, ProviderKind, SessionToken};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_REQUEST_URI: &str = "http://localhost";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// External authentication capability.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Receiver of auth state pushes; `None` means signed out or expired.
    fn subscribe(&self) -> watch::Receiver<Option<AuthState>>;

    async fn login(&self, kind: ProviderKind) -> Result<AuthState, AppError>;

    async fn logout(&self) -> Result<(), AppError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity Toolkit (REST)
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth credential already obtained from a provider's own login flow.
#[derive(Clone)]
pub struct ProviderCredential {
    pub access_token: String,
    /// OAuth 1.0 token secret (Twitter only)
    pub secret: Option<String>,
}

impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("access_token", &"***")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Signs in through the Identity Toolkit `accounts:signInWithIdp` endpoint.
pub struct IdentityToolkitProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    request_uri: String,
    credentials: HashMap<ProviderKind, ProviderCredential>,
    state: watch::Sender<Option<AuthState>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    provider_id: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorDetail {
    message: String,
}

impl IdentityToolkitProvider {
    pub fn new(
        api_key: String,
        credentials: HashMap<ProviderKind, ProviderCredential>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;
        let (state, _) = watch::channel(None);

        Ok(Self {
            http,
            base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            api_key,
            request_uri: DEFAULT_REQUEST_URI.to_string(),
            credentials,
            state,
        })
    }

    /// Point at a different endpoint (e.g. the Auth emulator).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn post_body(kind: ProviderKind, credential: &ProviderCredential) -> String {
        let mut body = format!(
            "access_token={}",
            urlencoding::encode(&credential.access_token)
        );
        if let Some(secret) = &credential.secret {
            body.push_str(&format!("&oauth_token_secret={}", urlencoding::encode(secret)));
        }
        body.push_str(&format!("&providerId={}", kind.provider_id()));
        body
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<IdentityErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(AppError::Provider(format!("HTTP {}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    fn subscribe(&self) -> watch::Receiver<Option<AuthState>> {
        self.state.subscribe()
    }

    async fn login(&self, kind: ProviderKind) -> Result<AuthState, AppError> {
        let credential = self.credentials.get(&kind).ok_or_else(|| {
            AppError::Provider(format!("No credential configured for {}", kind))
        })?;

        let url = format!(
            "{}/accounts:signInWithIdp?key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        let request = SignInWithIdpRequest {
            post_body: Self::post_body(kind, credential),
            request_uri: &self.request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("network error: {}", e)))?;

        let body: SignInWithIdpResponse = Self::check_response_json(response).await?;

        let mut state = AuthState::new(
            body.local_id,
            AuthClaims {
                email: body.email.unwrap_or_default(),
                display_name: body.display_name.unwrap_or_default(),
                photo_url: body.photo_url.unwrap_or_default(),
                provider_id: body
                    .provider_id
                    .unwrap_or_else(|| kind.provider_id().to_string()),
            },
        );
        if let Some(token) = body.id_token {
            state = state.with_token(SessionToken::new(token));
        }

        tracing::info!(provider = %kind, uid = %state.uid, "Identity Toolkit sign-in succeeded");
        self.state.send_replace(Some(state.clone()));
        Ok(state)
    }

    async fn logout(&self) -> Result<(), AppError> {
        // ID tokens are stateless; dropping ours ends the session.
        self.state.send_replace(None);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Static provider (offline mode and tests)
// ─────────────────────────────────────────────────────────────────────────────

/// Provider returning a fixed identity, or a fixed failure.
pub struct StaticIdentityProvider {
    outcome: Mutex<Result<AuthState, String>>,
    logout_failure: Mutex<Option<String>>,
    state: watch::Sender<Option<AuthState>>,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl StaticIdentityProvider {
    pub fn new(state: AuthState) -> Self {
        Self::with_outcome(Ok(state))
    }

    /// Every login fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(Err(message.into()))
    }

    fn with_outcome(outcome: Result<AuthState, String>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            outcome: Mutex::new(outcome),
            logout_failure: Mutex::new(None),
            state,
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failure(&self, message: impl Into<String>) {
        *lock(&self.outcome) = Err(message.into());
    }

    pub fn set_logout_failure(&self, message: Option<String>) {
        *lock(&self.logout_failure) = message;
    }

    /// Push a signed-out state without a logout call, as when a session
    /// expires on the provider side.
    pub fn expire(&self) {
        self.state.send_replace(None);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<Option<AuthState>> {
        self.state.subscribe()
    }

    async fn login(&self, kind: ProviderKind) -> Result<AuthState, AppError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        let outcome = lock(&self.outcome).clone();
        let mut state = outcome.map_err(AppError::Provider)?;
        state.auth.provider_id = kind.provider_id().to_string();

        self.state.send_replace(Some(state.clone()));
        Ok(state)
    }

    async fn logout(&self) -> Result<(), AppError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = lock(&self.logout_failure).clone() {
            return Err(AppError::Provider(message));
        }
        self.state.send_replace(None);
        Ok(())
    }
}
