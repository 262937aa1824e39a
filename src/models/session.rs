// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! In-memory session snapshot and supported login providers.

use crate::error::AppError;
use crate::models::AuthState;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Identity providers the app can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Github,
    Google,
    Twitter,
    Facebook,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Github,
        ProviderKind::Google,
        ProviderKind::Twitter,
        ProviderKind::Facebook,
    ];

    /// Short lowercase name used in config keys and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Github => "github",
            ProviderKind::Google => "google",
            ProviderKind::Twitter => "twitter",
            ProviderKind::Facebook => "facebook",
        }
    }

    /// Provider id as reported in identity claims.
    pub fn provider_id(&self) -> &'static str {
        match self {
            ProviderKind::Github => "github.com",
            ProviderKind::Google => "google.com",
            ProviderKind::Twitter => "twitter.com",
            ProviderKind::Facebook => "facebook.com",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s) || kind.provider_id() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown provider: {}", s)))
    }
}

/// Identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub state: AuthState,
    /// When this user's session was first observed
    pub since: DateTime<Utc>,
}

impl ActiveSession {
    pub fn user_id(&self) -> &str {
        &self.state.uid
    }

    pub fn email(&self) -> &str {
        &self.state.auth.email
    }

    pub fn display_name(&self) -> &str {
        &self.state.auth.display_name
    }
}

/// Current session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated(ActiveSession),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            Session::Authenticated(active) => Some(active),
            Session::Unauthenticated => None,
        }
    }

    /// User id, or an empty string when signed out.
    pub fn user_id(&self) -> &str {
        self.active().map(ActiveSession::user_id).unwrap_or("")
    }
}
