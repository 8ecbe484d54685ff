//! Trade types for the PeerTrade state machine.
//!
//! A [`Trade`] is one matched, in-progress exchange between a specific buyer
//! and seller against an offer. Its status moves through a closed state
//! machine; `COMPLETED` and `CANCELLED` are terminal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, OfferId, TradeId, UserId};

/// The lifecycle state of a trade.
///
/// ```text
///   PENDING ──▶ PAYMENT_SENT ──▶ COMPLETED
///      │              │
///      │              └─────▶ DISPUTED ──▶ COMPLETED | CANCELLED
///      ├──────────────────────────▲
///      └─▶ CANCELLED
/// ```
///
/// Transitions are **monotonic**: no transition skips a state and terminal
/// states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Trade created; buyer has not yet signaled fiat payment.
    Pending,
    /// Buyer marked the fiat payment as sent; awaiting seller confirmation.
    PaymentSent,
    /// An arbitration case is open against this trade.
    Disputed,
    /// Crypto released to the buyer. **Terminal.**
    Completed,
    /// Escrow refunded to the seller. **Terminal.**
    Cancelled,
}

impl TradeStatus {
    /// Can this trade transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::PaymentSent | Self::Cancelled | Self::Disputed)
                | (Self::PaymentSent, Self::Completed | Self::Disputed)
                | (Self::Disputed, Self::Completed | Self::Cancelled)
        )
    }

    /// Whether this status permits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a dispute may still be opened from this status.
    #[must_use]
    pub fn is_disputable(&self) -> bool {
        matches!(self, Self::Pending | Self::PaymentSent)
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::PaymentSent => write!(f, "PAYMENT_SENT"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Who initiated a trade cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Buyer backed out before sending payment.
    Buyer,
    /// Seller withdrew before payment was sent.
    Seller,
    /// Escrow expired without payment; cancelled by the sweep.
    Expired,
    /// An arbitrator resolved a dispute against the buyer.
    DisputeRefund,
}

/// One matched exchange between a buyer and a seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Globally unique trade identifier.
    pub id: TradeId,
    /// The offer this trade was matched against.
    pub offer_id: OfferId,
    /// The buying account.
    pub buyer: UserId,
    /// The selling account.
    pub seller: UserId,
    /// Asset being exchanged.
    pub token: Asset,
    /// Crypto amount locked for this trade.
    pub crypto_amount: Decimal,
    /// Fiat amount the buyer owes the seller.
    pub fiat_amount: Decimal,
    /// Current lifecycle state.
    pub status: TradeStatus,
    /// When the trade was created.
    pub created_at: DateTime<Utc>,
    /// Deadline for the buyer to send fiat payment.
    pub payment_deadline: DateTime<Utc>,
    /// When the buyer signaled payment, if they have.
    pub payment_sent_at: Option<DateTime<Utc>>,
    /// When the trade reached a terminal state, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Whether `user` is the buyer or seller of this trade.
    #[must_use]
    pub fn is_party(&self, user: UserId) -> bool {
        self.buyer == user || self.seller == user
    }

    /// The other party, given one counterparty. `None` for strangers.
    #[must_use]
    pub fn counterparty_of(&self, user: UserId) -> Option<UserId> {
        if user == self.buyer {
            Some(self.seller)
        } else if user == self.seller {
            Some(self.buyer)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} {} for {} fiat",
            self.id, self.status, self.crypto_amount, self.token, self.fiat_amount,
        )
    }
}

/// Dummy trade helpers for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Trade {
    /// Create a dummy pending trade for unit tests.
    pub fn dummy(buyer: UserId, seller: UserId, token: &str, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: TradeId::new(),
            offer_id: OfferId::new(),
            buyer,
            seller,
            token: token.to_string(),
            crypto_amount: amount,
            fiat_amount: amount * Decimal::new(5, 0),
            status: TradeStatus::Pending,
            created_at: now,
            payment_deadline: now + chrono::Duration::minutes(30),
            payment_sent_at: None,
            completed_at: None,
        }
    }
}
