//! Notification records fanned out on user-visible state transitions.
//!
//! Delivery is best-effort relative to the transaction that triggers it:
//! a failed delivery is logged by the engine and never rolls back the
//! underlying ledger mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// What kind of event a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    TradeStarted,
    PaymentSent,
    PaymentConfirmed,
    TradeCancelled,
    TradeExpired,
    DisputeOpened,
    DisputeResolved,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TradeStarted => write!(f, "trade_started"),
            Self::PaymentSent => write!(f, "payment_sent"),
            Self::PaymentConfirmed => write!(f, "payment_confirmed"),
            Self::TradeCancelled => write!(f, "trade_cancelled"),
            Self::TradeExpired => write!(f, "trade_expired"),
            Self::DisputeOpened => write!(f, "dispute_opened"),
            Self::DisputeResolved => write!(f, "dispute_resolved"),
        }
    }
}

/// A single notification addressed to one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// The addressee.
    pub user_id: UserId,
    /// Event category.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Human-readable body.
    pub message: String,
    /// Id of the trade or dispute this refers to, in display form.
    pub reference_id: String,
    /// When the notification was produced.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification for `user_id` about `reference_id`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        reference_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            reference_id: reference_id.into(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(format!("{}", NotificationKind::DisputeOpened), "dispute_opened");
        assert_eq!(format!("{}", NotificationKind::PaymentConfirmed), "payment_confirmed");
    }

    #[test]
    fn serde_roundtrip() {
        let n = Notification::new(
            UserId::new(),
            NotificationKind::TradeStarted,
            "Trade started",
            "Send payment within the time limit.",
            "trade:xyz",
            Utc::now(),
        );
        let json = serde_json::to_string(&n).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(n.user_id, back.user_id);
        assert_eq!(n.kind, back.kind);
        assert_eq!(n.reference_id, back.reference_id);
    }
}
