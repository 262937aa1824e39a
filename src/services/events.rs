// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Broadcast of session lifecycle events to the rest of the app.

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// Lifecycle notifications published by the session manager. No payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login attempt is about to start.
    Login,
    /// A logout is about to be issued.
    Logout,
}

impl SessionEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            SessionEvent::Login => "user:login",
            SessionEvent::Logout => "user:logout",
        }
    }
}

/// Fan-out bus; cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget; having no listeners is fine.
    pub fn publish(&self, event: SessionEvent) {
        match self.tx.send(event) {
            Ok(listeners) => tracing::debug!(topic = event.topic(), listeners, "Published event"),
            Err(_) => tracing::trace!(topic = event.topic(), "No listeners for event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics() {
        assert_eq!(SessionEvent::Login.topic(), "user:login");
        assert_eq!(SessionEvent::Logout.topic(), "user:logout");
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();

        bus.publish(SessionEvent::Login);

        assert_eq!(a.recv().await.unwrap(), SessionEvent::Login);
        assert_eq!(b.recv().await.unwrap(), SessionEvent::Login);
    }

    #[test]
    fn test_publish_without_listeners() {
        EventBus::new().publish(SessionEvent::Logout);
    }
}
