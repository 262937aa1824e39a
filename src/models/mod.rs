// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod card;
pub mod session;
pub mod user;

pub use card::CardRecord;
pub use session::{ActiveSession, ProviderKind, Session};
pub use user::{AuthClaims, AuthState, ProfileCache, SessionToken, UserProfileDocument};
