//! The escrow manager: locked-fund records and their settlement.
//!
//! One [`Escrow`] per trade (1:1, id derived from the trade id). Locking
//! debits the seller's available balance through the [`BalanceLedger`]; the
//! record then settles exactly once, by release (credit buyer), refund
//! (credit seller back), or split (both, in basis-point proportion).
//!
//! Escrow status and ledger buckets move together: the record transitions
//! only after the corresponding ledger mutation succeeded, so a record in
//! `RELEASED` always means the buyer was credited.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use peertrade_types::{
    constants, Escrow, EscrowId, EscrowStatus, PeertradeError, Result, Trade, TradeId, UserId,
};
use peertrade_ledger::BalanceLedger;
use rust_decimal::Decimal;

/// Manages escrow records keyed by trade id.
pub struct EscrowManager {
    escrows: HashMap<TradeId, Escrow>,
}

impl EscrowManager {
    /// Create a new empty escrow manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            escrows: HashMap::new(),
        }
    }

    /// Lock the trade's crypto amount from the seller's balance.
    ///
    /// The record is only inserted if the ledger debit succeeds, so an
    /// underfunded seller produces no escrow at all.
    ///
    /// # Errors
    /// - `InsufficientBalance` if the seller's available balance is short.
    /// - `AlreadyResolved` if an escrow already exists for this trade.
    pub fn lock(
        &mut self,
        ledger: &mut BalanceLedger,
        trade: &Trade,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<EscrowId> {
        if self.escrows.contains_key(&trade.id) {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("escrow already exists for {}", trade.id),
            });
        }

        ledger.lock(trade.seller, &trade.token, trade.crypto_amount)?;

        let escrow = Escrow {
            id: EscrowId::for_trade(trade.id),
            trade_id: trade.id,
            seller: trade.seller,
            amount: trade.crypto_amount,
            token: trade.token.clone(),
            status: EscrowStatus::Locked,
            locked_at: now,
            expires_at,
        };
        let id = escrow.id;
        tracing::info!(
            escrow_id = %id,
            trade_id = %trade.id,
            amount = %trade.crypto_amount,
            token = %trade.token,
            "escrow locked"
        );
        self.escrows.insert(trade.id, escrow);
        Ok(id)
    }

    /// Release the escrow to the buyer (trade completed).
    ///
    /// # Errors
    /// - `EscrowNotFound` if no record exists for the trade.
    /// - `AlreadyResolved` if the escrow has already settled.
    pub fn release(
        &mut self,
        ledger: &mut BalanceLedger,
        trade_id: TradeId,
        buyer: UserId,
    ) -> Result<()> {
        let escrow = self
            .escrows
            .get_mut(&trade_id)
            .ok_or(PeertradeError::EscrowNotFound(trade_id))?;

        if escrow.status != EscrowStatus::Locked {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("escrow {} is {}, not LOCKED", escrow.id, escrow.status),
            });
        }

        ledger.transfer_locked(escrow.seller, buyer, &escrow.token, escrow.amount)?;
        escrow.mark_released()?;
        tracing::info!(trade_id = %trade_id, amount = %escrow.amount, "escrow released to buyer");
        Ok(())
    }

    /// Refund the escrow to the seller (trade cancelled or expired).
    ///
    /// # Errors
    /// - `EscrowNotFound` if no record exists for the trade.
    /// - `AlreadyResolved` if the escrow has already settled.
    pub fn refund(&mut self, ledger: &mut BalanceLedger, trade_id: TradeId) -> Result<()> {
        let escrow = self
            .escrows
            .get_mut(&trade_id)
            .ok_or(PeertradeError::EscrowNotFound(trade_id))?;

        if escrow.status != EscrowStatus::Locked {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("escrow {} is {}, not LOCKED", escrow.id, escrow.status),
            });
        }

        ledger.unlock(escrow.seller, &escrow.token, escrow.amount)?;
        escrow.mark_refunded()?;
        tracing::info!(trade_id = %trade_id, amount = %escrow.amount, "escrow refunded to seller");
        Ok(())
    }

    /// Split the escrow between buyer and seller.
    ///
    /// The buyer receives `amount * buyer_bps / 10000`; the seller receives
    /// the exact remainder, so the two shares always sum to the locked
    /// amount. Decimal arithmetic, no rounding leakage.
    ///
    /// # Errors
    /// - `InvalidSplitRatio` unless `0 < buyer_bps < 10000` (a full release
    ///   or refund must use the dedicated operation).
    /// - `EscrowNotFound` / `AlreadyResolved` as for [`Self::release`].
    pub fn split(
        &mut self,
        ledger: &mut BalanceLedger,
        trade_id: TradeId,
        buyer: UserId,
        buyer_bps: u32,
    ) -> Result<(Decimal, Decimal)> {
        if buyer_bps == 0 || buyer_bps >= constants::SPLIT_BPS_DENOMINATOR {
            return Err(PeertradeError::InvalidSplitRatio { bps: buyer_bps });
        }

        let escrow = self
            .escrows
            .get_mut(&trade_id)
            .ok_or(PeertradeError::EscrowNotFound(trade_id))?;

        if escrow.status != EscrowStatus::Locked {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("escrow {} is {}, not LOCKED", escrow.id, escrow.status),
            });
        }

        let buyer_share = escrow.amount * Decimal::from(buyer_bps)
            / Decimal::from(constants::SPLIT_BPS_DENOMINATOR);
        let seller_share = escrow.amount - buyer_share;

        ledger.transfer_locked(escrow.seller, buyer, &escrow.token, buyer_share)?;
        ledger.unlock(escrow.seller, &escrow.token, seller_share)?;
        escrow.mark_released()?;
        tracing::info!(
            trade_id = %trade_id,
            buyer_share = %buyer_share,
            seller_share = %seller_share,
            "escrow split"
        );
        Ok((buyer_share, seller_share))
    }

    /// Look up the escrow backing a trade.
    ///
    /// # Errors
    /// Returns `EscrowNotFound` if no record exists.
    pub fn get(&self, trade_id: TradeId) -> Result<&Escrow> {
        self.escrows
            .get(&trade_id)
            .ok_or(PeertradeError::EscrowNotFound(trade_id))
    }

    /// Trade ids of all escrows still locked past their expiry.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<TradeId> {
        self.escrows
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.trade_id)
            .collect()
    }
}

impl Default for EscrowManager {
    fn default() -> Self {
        Self::new()
    }
}
