// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reporting channel for failures of writes nobody awaits.
//!
//! Side effects that must not block the caller (profile mirroring during
//! sign-in, card uploads) still report their failures here, and to the log.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tokio::sync::mpsc;

const FAULT_CAPACITY: usize = 64;

/// A failed background operation.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Short name of the operation that failed
    pub operation: &'static str,
    /// Key or path the operation was addressing
    pub target: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Sending half; cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct FaultReporter {
    tx: mpsc::Sender<Fault>,
}

impl FaultReporter {
    /// Log the failure and queue it for whoever is listening.
    pub fn report(&self, operation: &'static str, target: impl Into<String>, error: &AppError) {
        let fault = Fault {
            operation,
            target: target.into(),
            message: error.to_string(),
            at: Utc::now(),
        };

        tracing::warn!(
            operation,
            target = %fault.target,
            error = %fault.message,
            "Background operation failed"
        );

        if let Err(mpsc::error::TrySendError::Full(dropped)) = self.tx.try_send(fault) {
            tracing::warn!(
                operation = dropped.operation,
                "Fault queue full, dropping report"
            );
        }
    }
}

/// Channel pair; the receiver can be taken exactly once.
pub struct FaultChannel {
    reporter: FaultReporter,
    rx: Mutex<Option<mpsc::Receiver<Fault>>>,
}

impl Default for FaultChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(FAULT_CAPACITY);
        Self {
            reporter: FaultReporter { tx },
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn reporter(&self) -> FaultReporter {
        self.reporter.clone()
    }

    /// Take the receiving half. Returns `None` after the first call.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<Fault>> {
        match self.rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reported_fault_is_received() {
        let channel = FaultChannel::new();
        let mut rx = channel.take_receiver().unwrap();
        assert!(channel.take_receiver().is_none());

        channel.reporter().report(
            "save card",
            "/users/u1/cards/work",
            &AppError::Remote("boom".into()),
        );

        let fault = rx.recv().await.unwrap();
        assert_eq!(fault.operation, "save card");
        assert_eq!(fault.target, "/users/u1/cards/work");
        assert!(fault.message.contains("boom"));
    }

    #[test]
    fn test_full_queue_does_not_block() {
        let channel = FaultChannel::new();
        let reporter = channel.reporter();
        for _ in 0..FAULT_CAPACITY + 5 {
            reporter.report("set", "k", &AppError::Storage("full".into()));
        }
    }
}
