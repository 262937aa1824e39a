// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod events;
pub mod faults;
pub mod identity;
pub mod session;

pub use events::{EventBus, SessionEvent};
pub use faults::{Fault, FaultReporter};
pub use identity::{
    IdentityProvider, IdentityToolkitProvider, ProviderCredential, StaticIdentityProvider,
};
pub use session::{PendingWrite, SessionManager, SessionManagerBuilder, SessionState, SignOutPolicy};
