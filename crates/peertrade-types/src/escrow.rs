//! # Escrow — the locked-fund record backing a trade
//!
//! An [`Escrow`] pins a seller's crypto against a fiat-settlement promise.
//! Locking moves value from the seller's spendable balance into the locked
//! bucket; the record then resolves to exactly one terminal state.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  release (to buyer)   ┌──────────┐
//!   │ LOCKED ├──────────────────────▶│ RELEASED │
//!   └───┬────┘                       └──────────┘
//!       │ refund / expire
//!       ▼
//!   ┌──────────┐
//!   │ REFUNDED │
//!   └──────────┘
//! ```
//!
//! ## Safety Properties
//!
//! - **Atomic locking**: the record exists only when the balance debit
//!   succeeded, so a seller can never lock more than their spendable balance
//! - **Single terminal transition**: `LOCKED → RELEASED` xor
//!   `LOCKED → REFUNDED`, irreversible, never both
//! - **Time-bound**: expires after the payment window; the sweep refunds
//!   expired locks so an absent buyer cannot strand seller funds

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, EscrowId, PeertradeError, TradeId, UserId};

/// The lifecycle state of an escrow record.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Locked → Released` (settlement credited the buyer)
/// - `Locked → Refunded` (cancellation or expiry credited the seller back)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Funds are debited from the seller and held by the engine.
    Locked,
    /// Funds were credited to the buyer. **Irreversible.**
    Released,
    /// Funds were credited back to the seller. **Irreversible.**
    Refunded,
}

impl EscrowStatus {
    /// Can this escrow transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Locked, Self::Released | Self::Refunded))
    }

    /// Whether the escrow has settled one way or the other.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "LOCKED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// The locked-fund record backing a single trade (1:1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    /// Derived from `trade_id`; see [`EscrowId::for_trade`].
    pub id: EscrowId,
    /// The trade this escrow backs.
    pub trade_id: TradeId,
    /// The seller whose balance was debited.
    pub seller: UserId,
    /// Amount locked.
    pub amount: Decimal,
    /// The asset locked.
    pub token: Asset,
    /// Current lifecycle state.
    pub status: EscrowStatus,
    /// When the lock was taken.
    pub locked_at: DateTime<Utc>,
    /// When the lock expires if the buyer never pays.
    pub expires_at: DateTime<Utc>,
}

impl Escrow {
    /// Returns `true` if this escrow is still locked past its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == EscrowStatus::Locked && now > self.expires_at
    }

    /// Attempt to transition to RELEASED.
    ///
    /// # Errors
    /// Returns [`PeertradeError::AlreadyResolved`] unless currently locked.
    pub fn mark_released(&mut self) -> crate::Result<()> {
        if !self.status.can_transition_to(EscrowStatus::Released) {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("escrow {} is {}, not LOCKED", self.id, self.status),
            });
        }
        self.status = EscrowStatus::Released;
        Ok(())
    }

    /// Attempt to transition to REFUNDED.
    ///
    /// # Errors
    /// Returns [`PeertradeError::AlreadyResolved`] unless currently locked.
    pub fn mark_refunded(&mut self) -> crate::Result<()> {
        if !self.status.can_transition_to(EscrowStatus::Refunded) {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("escrow {} is {}, not LOCKED", self.id, self.status),
            });
        }
        self.status = EscrowStatus::Refunded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_escrow() -> Escrow {
        let trade_id = TradeId::new();
        let now = Utc::now();
        Escrow {
            id: EscrowId::for_trade(trade_id),
            trade_id,
            seller: UserId::new(),
            amount: Decimal::new(200, 0),
            token: "PEZ".to_string(),
            status: EscrowStatus::Locked,
            locked_at: now,
            expires_at: now + chrono::Duration::minutes(30),
        }
    }

    #[test]
    fn state_transitions_valid() {
        assert!(EscrowStatus::Locked.can_transition_to(EscrowStatus::Released));
        assert!(EscrowStatus::Locked.can_transition_to(EscrowStatus::Refunded));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!EscrowStatus::Released.can_transition_to(EscrowStatus::Refunded));
        assert!(!EscrowStatus::Released.can_transition_to(EscrowStatus::Locked));
        assert!(!EscrowStatus::Refunded.can_transition_to(EscrowStatus::Released));
        assert!(!EscrowStatus::Refunded.can_transition_to(EscrowStatus::Locked));
    }

    #[test]
    fn release_from_locked() {
        let mut escrow = make_escrow();
        assert!(escrow.mark_released().is_ok());
        assert_eq!(escrow.status, EscrowStatus::Released);
    }

    #[test]
    fn double_release_blocked() {
        let mut escrow = make_escrow();
        escrow.mark_released().unwrap();
        assert!(escrow.mark_released().is_err(), "RELEASED → RELEASED must fail");
    }

    #[test]
    fn released_cannot_be_refunded() {
        let mut escrow = make_escrow();
        escrow.mark_released().unwrap();
        assert!(escrow.mark_refunded().is_err(), "RELEASED → REFUNDED must fail");
    }

    #[test]
    fn refunded_cannot_be_released() {
        let mut escrow = make_escrow();
        escrow.mark_refunded().unwrap();
        assert!(escrow.mark_released().is_err(), "REFUNDED → RELEASED must fail");
    }

    #[test]
    fn expiry_depends_on_clock_not_fields() {
        let escrow = make_escrow();
        assert!(!escrow.is_expired(Utc::now()));
        assert!(escrow.is_expired(escrow.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn terminal_escrow_is_never_expired() {
        let mut escrow = make_escrow();
        escrow.mark_refunded().unwrap();
        assert!(!escrow.is_expired(escrow.expires_at + chrono::Duration::hours(1)));
    }

    #[test]
    fn serde_roundtrip() {
        let escrow = make_escrow();
        let json = serde_json::to_string(&escrow).unwrap();
        let back: Escrow = serde_json::from_str(&json).unwrap();
        assert_eq!(escrow.id, back.id);
        assert_eq!(escrow.amount, back.amount);
        assert_eq!(escrow.status, back.status);
    }
}
