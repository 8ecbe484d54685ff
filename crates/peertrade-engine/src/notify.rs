//! Notification delivery seam.
//!
//! The engine emits a [`Notification`] on every user-visible transition and
//! hands it to a [`NotificationSink`]. Delivery is best-effort: a sink
//! failure is logged and never rolls back the ledger mutation that
//! triggered it.

use std::sync::{Arc, Mutex};

use peertrade_types::{Notification, Result};

/// Where notifications go. Implementations must be cheap to call inline
/// with ledger mutations; anything slow should queue internally.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    fn deliver(&self, notification: Notification) -> Result<()>;
}

/// Collects notifications in memory. Clones share the same buffer, so a
/// test can keep one handle and hand the other to the engine.
#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in order.
    #[must_use]
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationSink for InMemoryNotifier {
    fn deliver(&self, notification: Notification) -> Result<()> {
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Logs each notification through `tracing` and otherwise drops it.
#[derive(Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn deliver(&self, notification: Notification) -> Result<()> {
        tracing::info!(
            user = %notification.user_id,
            kind = %notification.kind,
            reference = %notification.reference_id,
            "{}",
            notification.title,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use peertrade_types::{NotificationKind, UserId};

    #[test]
    fn in_memory_notifier_records_in_order() {
        let notifier = InMemoryNotifier::new();
        for (i, kind) in [NotificationKind::TradeStarted, NotificationKind::PaymentSent]
            .into_iter()
            .enumerate()
        {
            notifier
                .deliver(Notification::new(
                    UserId::new(),
                    kind,
                    format!("event {i}"),
                    "body",
                    "trade:x",
                    Utc::now(),
                ))
                .unwrap();
        }
        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].kind, NotificationKind::TradeStarted);
        assert_eq!(delivered[1].kind, NotificationKind::PaymentSent);
    }

    #[test]
    fn clones_share_the_buffer() {
        let notifier = InMemoryNotifier::new();
        let handle = notifier.clone();
        notifier
            .deliver(Notification::new(
                UserId::new(),
                NotificationKind::DisputeOpened,
                "Dispute opened",
                "body",
                "dispute:x",
                Utc::now(),
            ))
            .unwrap();
        assert_eq!(handle.delivered().len(), 1);
    }
}
