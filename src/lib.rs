// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! me-card: session, profile cache and business-card sync
//!
//! This crate signs users in through an identity provider, mirrors their
//! profile into a local key-value store, and keeps their business cards in
//! a remote document store.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

pub use error::{AppError, Result};
pub use models::{CardRecord, ProviderKind, Session};
pub use services::SessionManager;
