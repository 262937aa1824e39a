// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session, profile cache and card sync.
//!
//! The manager composes three collaborators it does not own:
//! - an identity provider (login/logout, pushes auth state)
//! - a local key-value store (profile mirror, card snapshot)
//! - a remote document store (profile document, card collection)
//!
//! Writes to the local and remote stores are not atomic with each other.
//! Failures of side effects nobody waits on go to the fault channel.

use crate::db::{paths, DocPath, RemoteStore};
use crate::error::{AppError, Result};
use crate::models::{
    ActiveSession, AuthState, CardRecord, ProfileCache, ProviderKind, Session, UserProfileDocument,
};
use crate::services::events::{EventBus, SessionEvent};
use crate::services::faults::{Fault, FaultChannel, FaultReporter};
use crate::services::identity::IdentityProvider;
use crate::storage::{keys, LocalStore};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use validator::Validate;

const MAX_CONCURRENT_CARD_WRITES: usize = 8;

/// Which local entries sign-out removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutPolicy {
    /// Login flag, every cached profile field and the auxiliary record.
    #[default]
    FullProfile,
    /// Only the login flag and the cached user id.
    FlagOnly,
}

impl SignOutPolicy {
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            SignOutPolicy::FullProfile => &[
                keys::HAS_LOGGED_IN,
                keys::ID,
                keys::DISPLAY_NAME,
                keys::EMAIL,
                keys::PHOTO_URL,
                keys::AUXILIARY,
            ],
            SignOutPolicy::FlagOnly => &[keys::HAS_LOGGED_IN, keys::ID],
        }
    }
}

impl FromStr for SignOutPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "full-profile" => Ok(SignOutPolicy::FullProfile),
            "flag-only" | "flag" => Ok(SignOutPolicy::FlagOnly),
            other => Err(AppError::Validation(format!(
                "Unknown sign-out policy: {}",
                other
            ))),
        }
    }
}

// ─── Session State ───────────────────────────────────────────

/// Holder of the current session snapshot.
///
/// [`SessionState::apply`] is the only way to change it; everything else
/// reads snapshots.
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::Unauthenticated);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Replace the snapshot from a provider push.
    ///
    /// A repeated push for the same user keeps the original `since`.
    pub fn apply(&self, pushed: Option<AuthState>) {
        self.replace_with(move || pushed);
    }

    /// Apply the newest value of a provider feed.
    ///
    /// The feed is read while the snapshot is locked, so a value read before
    /// a concurrent [`SessionState::apply`] can never land after it.
    pub fn apply_latest(&self, feed: &mut watch::Receiver<Option<AuthState>>) {
        self.replace_with(|| feed.borrow_and_update().clone());
    }

    fn replace_with(&self, pushed: impl FnOnce() -> Option<AuthState>) {
        self.tx.send_if_modified(|current| {
            let next = match pushed() {
                None => Session::Unauthenticated,
                Some(state) => {
                    let since = match &*current {
                        Session::Authenticated(active) if active.state.uid == state.uid => {
                            active.since
                        }
                        _ => Utc::now(),
                    };
                    Session::Authenticated(ActiveSession { state, since })
                }
            };

            if *current == next {
                return false;
            }
            tracing::debug!(
                authenticated = next.is_authenticated(),
                user_id = next.user_id(),
                "Session changed"
            );
            *current = next;
            true
        });
    }
}

// ─── Pending Writes ──────────────────────────────────────────

/// Handle to a card upload running in the background.
///
/// Dropping it does not cancel the write. Failures are reported to the
/// fault channel whether or not anyone waits.
#[derive(Debug)]
pub struct PendingWrite {
    path: DocPath,
    handle: JoinHandle<Result<()>>,
}

impl PendingWrite {
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the remote store to acknowledge the write.
    pub async fn wait(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Write task failed: {}", e)))?
    }
}

// ─── Session Manager ─────────────────────────────────────────

pub struct SessionManagerBuilder {
    identity: Arc<dyn IdentityProvider>,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    events: EventBus,
    sign_out_policy: SignOutPolicy,
    auxiliary: Option<Value>,
}

impl SessionManagerBuilder {
    /// Share an existing event bus instead of creating a private one.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn sign_out_policy(mut self, policy: SignOutPolicy) -> Self {
        self.sign_out_policy = policy;
        self
    }

    /// Record written to the auxiliary key after every successful sign-in.
    pub fn auxiliary_record(mut self, record: Value) -> Self {
        self.auxiliary = Some(record);
        self
    }

    /// Build the manager and start mirroring the provider's state pushes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> SessionManager {
        let state = SessionState::new();
        let mut pushes = self.identity.subscribe();
        state.apply_latest(&mut pushes);

        let mirror = state.clone();
        let subscription = tokio::spawn(async move {
            while pushes.changed().await.is_ok() {
                mirror.apply_latest(&mut pushes);
            }
            tracing::debug!("Identity provider closed its state feed");
        });

        SessionManager {
            identity: self.identity,
            local: self.local,
            remote: self.remote,
            events: self.events,
            faults: FaultChannel::new(),
            state,
            sign_out_policy: self.sign_out_policy,
            auxiliary: self.auxiliary,
            subscription,
        }
    }
}

/// Session and card sync manager.
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    events: EventBus,
    faults: FaultChannel,
    state: SessionState,
    sign_out_policy: SignOutPolicy,
    auxiliary: Option<Value>,
    subscription: JoinHandle<()>,
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.subscription.abort();
    }
}

impl SessionManager {
    pub fn builder(
        identity: Arc<dyn IdentityProvider>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            identity,
            local,
            remote,
            events: EventBus::new(),
            sign_out_policy: SignOutPolicy::default(),
            auxiliary: None,
        }
    }

    // ─── Session Snapshot ────────────────────────────────────────

    pub fn session(&self) -> Session {
        self.state.snapshot()
    }

    /// Receiver that observes every session change.
    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.state.watch()
    }

    pub fn authenticated(&self) -> bool {
        self.state.snapshot().is_authenticated()
    }

    /// Current user id, or an empty string when signed out.
    pub fn current_user_id(&self) -> String {
        self.state.snapshot().user_id().to_string()
    }

    pub fn current_email(&self) -> Result<String> {
        self.with_active(|active| active.email().to_string())
    }

    pub fn current_display_name(&self) -> Result<String> {
        self.with_active(|active| active.display_name().to_string())
    }

    fn with_active<T>(&self, f: impl FnOnce(&ActiveSession) -> T) -> Result<T> {
        self.state
            .snapshot()
            .active()
            .map(f)
            .ok_or(AppError::NotAuthenticated)
    }

    /// Log the current session at debug level.
    pub fn auth_details(&self) {
        tracing::debug!(session = ?self.state.snapshot(), "Auth details");
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Receiver of background failures. Only the first call gets it.
    pub fn faults(&self) -> Option<mpsc::Receiver<Fault>> {
        self.faults.take_receiver()
    }

    // ─── Sign In / Sign Out ──────────────────────────────────────

    /// Sign in with the given provider and mirror the profile.
    ///
    /// Provider failures are returned. Once login succeeds the call succeeds;
    /// profile mirroring failures are only reported to the fault channel.
    pub async fn sign_in(&self, kind: ProviderKind) -> Result<Session> {
        self.events.publish(SessionEvent::Login);

        let auth = self.identity.login(kind).await.map_err(|e| {
            tracing::error!(provider = %kind, error = %e, "Sign-in failed");
            e
        })?;

        self.state.apply(Some(auth.clone()));
        tracing::info!(provider = %kind, user_id = %auth.uid, "Signed in");

        self.mirror_profile(&auth).await;
        Ok(self.state.snapshot())
    }

    pub async fn sign_in_with_github(&self) -> Result<Session> {
        self.sign_in(ProviderKind::Github).await
    }

    pub async fn sign_in_with_google(&self) -> Result<Session> {
        self.sign_in(ProviderKind::Google).await
    }

    pub async fn sign_in_with_twitter(&self) -> Result<Session> {
        self.sign_in(ProviderKind::Twitter).await
    }

    pub async fn sign_in_with_facebook(&self) -> Result<Session> {
        self.sign_in(ProviderKind::Facebook).await
    }

    async fn mirror_profile(&self, auth: &AuthState) {
        let reporter = self.faults.reporter();

        if let Err(e) = self
            .local
            .set(keys::HAS_LOGGED_IN, Value::Bool(true))
            .await
        {
            reporter.report("set login flag", keys::HAS_LOGGED_IN, &e);
        }

        let profile = UserProfileDocument::from(&auth.auth);
        match paths::user_doc(&auth.uid) {
            Ok(path) => {
                if let Err(e) = self.remote.update(&path, profile.to_fields()).await {
                    reporter.report("merge profile", path.to_string(), &e);
                }
            }
            Err(e) => reporter.report("merge profile", &auth.uid, &e),
        }

        let entries = [
            (keys::DISPLAY_NAME, &auth.auth.display_name),
            (keys::ID, &auth.uid),
            (keys::EMAIL, &auth.auth.email),
            (keys::PHOTO_URL, &auth.auth.photo_url),
        ];
        for (key, value) in entries {
            if let Err(e) = self.local.set(key, Value::String(value.clone())).await {
                reporter.report("cache profile field", key, &e);
            }
        }

        if let Some(record) = &self.auxiliary {
            if let Err(e) = self.local.set(keys::AUXILIARY, record.clone()).await {
                reporter.report("cache auxiliary record", keys::AUXILIARY, &e);
            }
        }
    }

    /// Clear the local profile mirror, then end the provider session.
    ///
    /// Local entries are removed first and are not restored if the
    /// provider logout fails.
    pub async fn sign_out(&self) -> Result<()> {
        let user_id = self.current_user_id();
        let reporter = self.faults.reporter();

        for key in self.sign_out_policy.keys() {
            if let Err(e) = self.local.remove(key).await {
                reporter.report("clear profile field", *key, &e);
            }
        }

        self.events.publish(SessionEvent::Logout);

        self.identity.logout().await.map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Provider logout failed");
            e
        })?;

        self.state.apply(None);
        tracing::info!(user_id = %user_id, "Signed out");
        Ok(())
    }

    // ─── Profile Cache ───────────────────────────────────────────

    pub async fn has_logged_in(&self) -> Result<bool> {
        Ok(matches!(
            self.local.get(keys::HAS_LOGGED_IN).await?,
            Some(Value::Bool(true))
        ))
    }

    pub async fn cached_user_id(&self) -> Result<Option<String>> {
        Ok(self
            .cached_string(keys::ID)
            .await?
            .filter(|id| !id.is_empty()))
    }

    pub async fn cached_display_name(&self) -> Result<Option<String>> {
        self.cached_string(keys::DISPLAY_NAME).await
    }

    pub async fn cached_email(&self) -> Result<Option<String>> {
        self.cached_string(keys::EMAIL).await
    }

    pub async fn cached_photo_url(&self) -> Result<Option<String>> {
        self.cached_string(keys::PHOTO_URL).await
    }

    async fn cached_string(&self, key: &str) -> Result<Option<String>> {
        match self.local.get(key).await? {
            Some(Value::String(value)) => Ok(Some(value)),
            None | Some(Value::Null) => Ok(None),
            Some(other) => {
                tracing::warn!(key, value = %other, "Ignoring non-string profile entry");
                Ok(None)
            }
        }
    }

    /// Every mirrored profile entry, each read independently.
    pub async fn profile_cache(&self) -> Result<ProfileCache> {
        Ok(ProfileCache {
            display_name: self.cached_display_name().await?,
            id: self.cached_user_id().await?,
            email: self.cached_email().await?,
            photo_url: self.cached_photo_url().await?,
            has_logged_in: self.has_logged_in().await?,
            auxiliary: self.auxiliary().await?,
        })
    }

    pub async fn set_auxiliary(&self, record: Value) -> Result<()> {
        self.local.set(keys::AUXILIARY, record).await
    }

    pub async fn auxiliary(&self) -> Result<Option<Value>> {
        self.local.get(keys::AUXILIARY).await
    }

    // ─── Cards ───────────────────────────────────────────────────

    /// List the remote cards of the user whose id is cached locally.
    ///
    /// Documents that do not parse as cards are skipped and reported to the
    /// fault channel.
    pub async fn get_cards(&self) -> Result<Vec<CardRecord>> {
        let user_id = self
            .cached_user_id()
            .await?
            .ok_or(AppError::NotAuthenticated)?;
        let path = paths::cards_collection(&user_id)?;

        let docs = self.remote.list(&path).await?;
        tracing::debug!(user_id = %user_id, count = docs.len(), "Fetched cards");

        let reporter = self.faults.reporter();
        Ok(docs
            .into_iter()
            .filter_map(|doc| match CardRecord::from_fields(doc) {
                Ok(card) => Some(card),
                Err(e) => {
                    reporter.report("read card", path.to_string(), &e);
                    None
                }
            })
            .collect())
    }

    /// Merge one card into the current user's card collection.
    ///
    /// Preconditions are checked before returning; the write itself runs in
    /// the background.
    pub fn save_card(&self, card: &CardRecord) -> Result<PendingWrite> {
        card.validate()?;

        let user_id = self.current_user_id();
        if user_id.is_empty() {
            return Err(AppError::NotAuthenticated);
        }
        let path = paths::card_doc(&user_id, &card.card_name)?;
        let fields = card.to_fields()?;

        let remote = Arc::clone(&self.remote);
        let reporter: FaultReporter = self.faults.reporter();
        let task_path = path.clone();

        let handle = tokio::spawn(async move {
            let result = remote.update(&task_path, fields).await;
            match &result {
                Ok(()) => tracing::debug!(path = %task_path, "Card saved"),
                Err(e) => reporter.report("save card", task_path.to_string(), e),
            }
            result
        });

        Ok(PendingWrite { path, handle })
    }

    /// Upload every card of the local snapshot, a few at a time.
    ///
    /// Returns the number written. All uploads are attempted; the first
    /// failure is returned after the rest finish.
    pub async fn push_local_cards(&self) -> Result<usize> {
        let cards = self.load_local_cards().await?;

        // A card that cannot be saved must not stop the others.
        let writes: Vec<Result<PendingWrite>> = cards
            .iter()
            .map(|card| {
                self.save_card(card).map_err(|e| {
                    tracing::warn!(card_name = %card.card_name, error = %e, "Skipping card");
                    e
                })
            })
            .collect();

        let results = stream::iter(writes)
            .map(|write| async move {
                match write {
                    Ok(pending) => pending.wait().await,
                    Err(e) => Err(e),
                }
            })
            .buffer_unordered(MAX_CONCURRENT_CARD_WRITES)
            .collect::<Vec<Result<()>>>()
            .await;

        let pushed = results.iter().filter(|r| r.is_ok()).count();
        tracing::info!(count = pushed, total = results.len(), "Pushed local cards");

        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(pushed)
    }

    /// Replace the local snapshot with the remote card list.
    pub async fn pull_cards(&self) -> Result<Vec<CardRecord>> {
        let cards = self.get_cards().await?;
        self.save_cards_locally(&cards).await?;
        Ok(cards)
    }

    /// Overwrite the local card snapshot.
    pub async fn save_cards_locally(&self, cards: &[CardRecord]) -> Result<()> {
        let text = serde_json::to_string(cards)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode cards: {}", e)))?;
        self.local.set(keys::CARDS, Value::String(text)).await?;
        tracing::debug!(count = cards.len(), "Saved card snapshot");
        Ok(())
    }

    pub async fn load_local_cards(&self) -> Result<Vec<CardRecord>> {
        match self.local.get(keys::CARDS).await? {
            Some(Value::String(text)) => serde_json::from_str(&text)
                .map_err(|e| AppError::CacheCorrupt(format!("Unreadable card snapshot: {}", e))),
            Some(other) => Err(AppError::CacheCorrupt(format!(
                "Card snapshot is not text: {}",
                other
            ))),
            None => Err(AppError::CacheCorrupt("No card snapshot stored".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthClaims;

    fn state(uid: &str) -> AuthState {
        AuthState::new(
            uid,
            AuthClaims {
                email: format!("{}@example.com", uid),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_apply_transitions() {
        let holder = SessionState::new();
        assert_eq!(holder.snapshot(), Session::Unauthenticated);

        holder.apply(Some(state("u1")));
        assert_eq!(holder.snapshot().user_id(), "u1");

        holder.apply(None);
        assert_eq!(holder.snapshot(), Session::Unauthenticated);
    }

    #[test]
    fn test_repeated_push_keeps_since() {
        let holder = SessionState::new();
        holder.apply(Some(state("u1")));
        let first = holder.snapshot().active().unwrap().since;

        holder.apply(Some(state("u1")));
        assert_eq!(holder.snapshot().active().unwrap().since, first);
    }

    #[test]
    fn test_watchers_see_changes() {
        let holder = SessionState::new();
        let mut rx = holder.watch();

        holder.apply(Some(state("u1")));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        holder.apply(Some(state("u1")));
        assert!(!rx.has_changed().unwrap(), "identical push is not a change");
    }

    #[test]
    fn test_late_feed_wakeup_does_not_resurrect_session() {
        let holder = SessionState::new();
        let (provider, mut feed) = watch::channel(Some(state("u1")));
        holder.apply_latest(&mut feed);
        assert!(holder.snapshot().is_authenticated());

        // Provider logs out and the manager applies it directly; the mirror
        // task then wakes up for the earlier change.
        provider.send_replace(None);
        holder.apply(None);
        holder.apply_latest(&mut feed);

        assert_eq!(holder.snapshot(), Session::Unauthenticated);
    }

    #[test]
    fn test_sign_out_policy_keys() {
        assert_eq!(
            SignOutPolicy::FlagOnly.keys(),
            &[keys::HAS_LOGGED_IN, keys::ID]
        );
        let full = SignOutPolicy::FullProfile.keys();
        assert!(full.contains(&keys::EMAIL));
        assert!(!full.contains(&keys::CARDS));

        assert_eq!(
            "flag-only".parse::<SignOutPolicy>().unwrap(),
            SignOutPolicy::FlagOnly
        );
        assert_eq!(
            "FULL".parse::<SignOutPolicy>().unwrap(),
            SignOutPolicy::FullProfile
        );
        assert!("sometimes".parse::<SignOutPolicy>().is_err());
    }
}
