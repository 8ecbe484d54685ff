//! Balance tracking types for the PeerTrade escrow model.
//!
//! Every account has an `available` balance (spendable, usable to back new
//! offers) and a `locked` balance (committed to active escrows).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single balance entry for an (account, asset) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Spendable balance, usable to back new escrow locks.
    pub available: Decimal,
    /// Locked in active escrows awaiting settlement.
    pub locked: Decimal,
}

impl BalanceEntry {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            locked: Decimal::ZERO,
        }
    }

    /// Total balance (available + locked).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.locked.is_zero()
    }
}

impl Default for BalanceEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for asset identifiers (e.g., "HEZ", "PEZ").
pub type Asset = String;
