//! Balance management for the escrow engine.
//!
//! Tracks per-(account, asset) balances with available/locked accounting.
//! All mutations are atomic: either the full operation succeeds or the
//! balance is unchanged. Locking is the sole double-spend defense — an
//! account can never commit more than its spendable balance.

use std::collections::HashMap;

use peertrade_types::{Asset, BalanceEntry, PeertradeError, Result, UserId};
use rust_decimal::Decimal;

/// Manages account balances with available/locked accounting.
///
/// The ledger is the source of truth for all balance state. The escrow
/// manager calls into it to lock funds when a trade is created and to
/// settle them at release or refund.
pub struct BalanceLedger {
    /// Per-(account, asset) balances.
    balances: HashMap<(UserId, Asset), BalanceEntry>,
}

impl BalanceLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Deposit funds (increases available balance).
    pub fn deposit(&mut self, user: UserId, asset: &str, amount: Decimal) {
        let entry = self.balances.entry((user, asset.to_string())).or_default();
        entry.available += amount;
    }

    /// Lock funds (available → locked). Used when an escrow is taken.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn lock(&mut self, user: UserId, asset: &str, amount: Decimal) -> Result<()> {
        let entry = self.balances.get_mut(&(user, asset.to_string())).ok_or(
            PeertradeError::InsufficientBalance {
                needed: amount,
                available: Decimal::ZERO,
            },
        )?;

        if entry.available < amount {
            return Err(PeertradeError::InsufficientBalance {
                needed: amount,
                available: entry.available,
            });
        }

        entry.available -= amount;
        entry.locked += amount;
        Ok(())
    }

    /// Unlock funds (locked → available). Used when an escrow is refunded.
    ///
    /// # Errors
    /// Returns `InsufficientLocked` if locked < amount.
    pub fn unlock(&mut self, user: UserId, asset: &str, amount: Decimal) -> Result<()> {
        let entry = self
            .balances
            .get_mut(&(user, asset.to_string()))
            .ok_or(PeertradeError::InsufficientLocked)?;

        if entry.locked < amount {
            return Err(PeertradeError::InsufficientLocked);
        }

        entry.locked -= amount;
        entry.available += amount;
        Ok(())
    }

    /// Settle a release: debit `from`'s locked bucket and credit `to`'s
    /// available bucket in one call. Total supply is unchanged.
    ///
    /// # Errors
    /// Returns `InsufficientLocked` if `from` has less than `amount` locked;
    /// nothing is credited in that case.
    pub fn transfer_locked(
        &mut self,
        from: UserId,
        to: UserId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        {
            let entry = self
                .balances
                .get_mut(&(from, asset.to_string()))
                .ok_or(PeertradeError::InsufficientLocked)?;
            if entry.locked < amount {
                return Err(PeertradeError::InsufficientLocked);
            }
            entry.locked -= amount;
        }
        let entry = self.balances.entry((to, asset.to_string())).or_default();
        entry.available += amount;
        Ok(())
    }

    /// Get the balance for an (account, asset) pair.
    #[must_use]
    pub fn balance(&self, user: UserId, asset: &str) -> BalanceEntry {
        self.balances
            .get(&(user, asset.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Spendable balance for an (account, asset) pair.
    #[must_use]
    pub fn available(&self, user: UserId, asset: &str) -> Decimal {
        self.balance(user, asset).available
    }

    /// Total supply of an asset (sum of all accounts' available + locked).
    ///
    /// Lock/release/refund sequences never change this — the conservation
    /// law the test suite asserts.
    #[must_use]
    pub fn total_supply(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, entry)| entry.total())
            .sum()
    }
}

impl Default for BalanceLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_increases_available() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "PEZ", Decimal::new(1000, 0));
        let bal = ledger.balance(user, "PEZ");
        assert_eq!(bal.available, Decimal::new(1000, 0));
        assert_eq!(bal.locked, Decimal::ZERO);
    }

    #[test]
    fn lock_moves_to_locked() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "PEZ", Decimal::new(1000, 0));
        ledger.lock(user, "PEZ", Decimal::new(200, 0)).unwrap();
        let bal = ledger.balance(user, "PEZ");
        assert_eq!(bal.available, Decimal::new(800, 0));
        assert_eq!(bal.locked, Decimal::new(200, 0));
    }

    #[test]
    fn lock_insufficient_fails_and_leaves_balance() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "PEZ", Decimal::new(100, 0));
        let err = ledger.lock(user, "PEZ", Decimal::new(200, 0)).unwrap_err();
        assert!(matches!(err, PeertradeError::InsufficientBalance { .. }));
        let bal = ledger.balance(user, "PEZ");
        assert_eq!(bal.available, Decimal::new(100, 0));
        assert_eq!(bal.locked, Decimal::ZERO);
    }

    #[test]
    fn cannot_lock_beyond_spendable_across_escrows() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "PEZ", Decimal::new(300, 0));
        ledger.lock(user, "PEZ", Decimal::new(200, 0)).unwrap();
        // Second lock can only see the remaining 100.
        let err = ledger.lock(user, "PEZ", Decimal::new(200, 0)).unwrap_err();
        assert!(matches!(
            err,
            PeertradeError::InsufficientBalance { available, .. }
                if available == Decimal::new(100, 0)
        ));
    }

    #[test]
    fn unlock_restores_available() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "PEZ", Decimal::new(1000, 0));
        ledger.lock(user, "PEZ", Decimal::new(400, 0)).unwrap();
        ledger.unlock(user, "PEZ", Decimal::new(400, 0)).unwrap();
        let bal = ledger.balance(user, "PEZ");
        assert_eq!(bal.available, Decimal::new(1000, 0));
        assert_eq!(bal.locked, Decimal::ZERO);
    }

    #[test]
    fn unlock_more_than_locked_fails() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "PEZ", Decimal::new(1000, 0));
        ledger.lock(user, "PEZ", Decimal::new(100, 0)).unwrap();
        let err = ledger.unlock(user, "PEZ", Decimal::new(200, 0)).unwrap_err();
        assert!(matches!(err, PeertradeError::InsufficientLocked));
    }

    #[test]
    fn transfer_locked_settles_to_counterparty() {
        let mut ledger = BalanceLedger::new();
        let seller = UserId::new();
        let buyer = UserId::new();
        ledger.deposit(seller, "PEZ", Decimal::new(500, 0));
        ledger.lock(seller, "PEZ", Decimal::new(200, 0)).unwrap();

        ledger
            .transfer_locked(seller, buyer, "PEZ", Decimal::new(200, 0))
            .unwrap();

        assert_eq!(ledger.balance(seller, "PEZ").available, Decimal::new(300, 0));
        assert_eq!(ledger.balance(seller, "PEZ").locked, Decimal::ZERO);
        assert_eq!(ledger.balance(buyer, "PEZ").available, Decimal::new(200, 0));
    }

    #[test]
    fn transfer_locked_insufficient_credits_nothing() {
        let mut ledger = BalanceLedger::new();
        let seller = UserId::new();
        let buyer = UserId::new();
        ledger.deposit(seller, "PEZ", Decimal::new(100, 0));
        ledger.lock(seller, "PEZ", Decimal::new(50, 0)).unwrap();

        let err = ledger
            .transfer_locked(seller, buyer, "PEZ", Decimal::new(80, 0))
            .unwrap_err();
        assert!(matches!(err, PeertradeError::InsufficientLocked));
        assert!(ledger.balance(buyer, "PEZ").is_zero());
    }

    #[test]
    fn supply_conserved_through_lock_and_settle() {
        let mut ledger = BalanceLedger::new();
        let seller = UserId::new();
        let buyer = UserId::new();
        ledger.deposit(seller, "HEZ", Decimal::new(1000, 0));
        ledger.deposit(buyer, "HEZ", Decimal::new(50, 0));
        let supply = ledger.total_supply("HEZ");

        ledger.lock(seller, "HEZ", Decimal::new(400, 0)).unwrap();
        assert_eq!(ledger.total_supply("HEZ"), supply);

        ledger
            .transfer_locked(seller, buyer, "HEZ", Decimal::new(400, 0))
            .unwrap();
        assert_eq!(ledger.total_supply("HEZ"), supply);
    }

    #[test]
    fn assets_are_independent() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(user, "HEZ", Decimal::new(100, 0));
        ledger.deposit(user, "PEZ", Decimal::new(200, 0));
        ledger.lock(user, "HEZ", Decimal::new(100, 0)).unwrap();
        assert_eq!(ledger.available(user, "PEZ"), Decimal::new(200, 0));
    }

    #[test]
    fn nonexistent_balance_is_zero() {
        let ledger = BalanceLedger::new();
        assert!(ledger.balance(UserId::new(), "HEZ").is_zero());
    }
}
