//! The trade engine: offer matching, the trade state machine, and settlement.
//!
//! [`TradeEngine`] owns the balance ledger, offer book, escrow manager, and
//! reputation book, and is the single entry point through which they are
//! mutated. Every operation validates first and mutates second, so a failed
//! call leaves all four stores untouched.
//!
//! Dispute settlement (the `settle_*` and `mark_disputed` operations) is
//! driven by the arbitration engine in `peertrade-dispute`, which owns the
//! dispute records themselves.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use peertrade_ledger::{BalanceLedger, OfferBook};
use peertrade_types::{
    BalanceEntry, CancelReason, Clock, EngineConfig, Escrow, Notification, NotificationKind,
    Offer, OfferId, OfferTerms, PeertradeError, Reputation, Result, Trade, TradeId, TradeStatus,
    UserId,
};
use rust_decimal::Decimal;

use crate::escrow::EscrowManager;
use crate::notify::{LogNotifier, NotificationSink};
use crate::reputation::ReputationBook;

/// The engine facade. All operations take `&mut self`; callers that share
/// the engine across tasks wrap it in `Arc<Mutex<_>>` (see `Sweeper`).
pub struct TradeEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    notifier: Box<dyn NotificationSink>,
    ledger: BalanceLedger,
    offers: OfferBook,
    escrows: EscrowManager,
    trades: HashMap<TradeId, Trade>,
    reputation: ReputationBook,
}

impl TradeEngine {
    /// Build an engine with explicit config, clock, and notification sink.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        notifier: Box<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            clock,
            notifier,
            ledger: BalanceLedger::new(),
            offers: OfferBook::new(),
            escrows: EscrowManager::new(),
            trades: HashMap::new(),
            reputation: ReputationBook::new(),
        }
    }

    /// Default config, wall clock, log-only notifications.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            EngineConfig::default(),
            Arc::new(peertrade_types::SystemClock),
            Box::new(LogNotifier),
        )
    }

    // =====================================================================
    // Balances
    // =====================================================================

    /// Credit an account's available balance.
    pub fn deposit(&mut self, user: UserId, asset: &str, amount: Decimal) {
        self.ledger.deposit(user, asset, amount);
    }

    /// Current balance for an (account, asset) pair.
    #[must_use]
    pub fn balance(&self, user: UserId, asset: &str) -> BalanceEntry {
        self.ledger.balance(user, asset)
    }

    /// Total supply of an asset across all accounts and buckets.
    #[must_use]
    pub fn total_supply(&self, asset: &str) -> Decimal {
        self.ledger.total_supply(asset)
    }

    // =====================================================================
    // Offers
    // =====================================================================

    /// Create an offer. The seller must hold the full offered amount as
    /// spendable balance at creation time; funds are locked per-trade when
    /// a buyer accepts, not here.
    pub fn create_offer(&mut self, seller: UserId, terms: OfferTerms) -> Result<OfferId> {
        let available = self.ledger.available(seller, &terms.token);
        if available < terms.total_amount {
            return Err(PeertradeError::InsufficientBalance {
                needed: terms.total_amount,
                available,
            });
        }
        self.offers.create(seller, terms, self.clock.now())
    }

    /// Look up an offer.
    pub fn offer(&self, id: OfferId) -> Result<&Offer> {
        self.offers.get(id)
    }

    /// Open, matchable offers for a token, cheapest first.
    #[must_use]
    pub fn open_offers(&self, token: &str) -> Vec<&Offer> {
        self.offers.open_offers(token)
    }

    /// Pause an offer (seller only).
    pub fn pause_offer(&mut self, id: OfferId, user: UserId) -> Result<()> {
        self.offers.pause(id, user)
    }

    /// Resume a paused offer (seller only).
    pub fn resume_offer(&mut self, id: OfferId, user: UserId) -> Result<()> {
        self.offers.resume(id, user)
    }

    /// Close an offer (seller only). In-flight trades are unaffected.
    pub fn close_offer(&mut self, id: OfferId, user: UserId) -> Result<()> {
        self.offers.close(id, user).map(|_| ())
    }

    // =====================================================================
    // Trade lifecycle
    // =====================================================================

    /// Accept an offer: reserve liquidity, create the trade, and lock the
    /// seller's crypto in escrow, atomically. On escrow failure the offer
    /// reservation is rolled back.
    ///
    /// # Errors
    /// - `SelfTradeBlocked` if the buyer is the offer's seller.
    /// - Offer errors from the reservation (`OfferNotOpen`,
    ///   `InsufficientLiquidity`, ...).
    /// - `InsufficientBalance` if the seller can no longer fund the escrow.
    pub fn accept_offer(
        &mut self,
        buyer: UserId,
        offer_id: OfferId,
        amount: Decimal,
    ) -> Result<TradeId> {
        if self.offers.get(offer_id)?.seller == buyer {
            return Err(PeertradeError::SelfTradeBlocked);
        }

        let offer = self.offers.reserve(offer_id, amount)?;
        let now = self.clock.now();
        let deadline = now + self.config.payment_timeout();
        let trade = Trade {
            id: TradeId::new(),
            offer_id,
            buyer,
            seller: offer.seller,
            token: offer.token.clone(),
            crypto_amount: amount,
            fiat_amount: offer.fiat_value(amount),
            status: TradeStatus::Pending,
            created_at: now,
            payment_deadline: deadline,
            payment_sent_at: None,
            completed_at: None,
        };

        if let Err(err) = self.escrows.lock(&mut self.ledger, &trade, deadline, now) {
            // Roll the reservation back so the offer's liquidity survives.
            self.offers.restore(offer_id, amount)?;
            return Err(err);
        }

        let trade_id = trade.id;
        tracing::info!(
            trade_id = %trade_id,
            offer_id = %offer_id,
            buyer = %buyer,
            seller = %trade.seller,
            amount = %amount,
            fiat = %trade.fiat_amount,
            "trade created"
        );
        self.notify(
            buyer,
            NotificationKind::TradeStarted,
            "Trade started",
            format!(
                "Send {} {} within {} minutes.",
                trade.fiat_amount, offer.fiat_currency, self.config.payment_timeout_minutes
            ),
            trade_id.to_string(),
        );
        self.notify(
            trade.seller,
            NotificationKind::TradeStarted,
            "Trade started",
            format!("{} {} locked in escrow.", amount, trade.token),
            trade_id.to_string(),
        );
        self.trades.insert(trade_id, trade);
        Ok(trade_id)
    }

    /// Buyer signals that the fiat payment has been sent.
    ///
    /// # Errors
    /// - `NotAuthorized` unless `user` is the buyer.
    /// - `InvalidTradeState` unless the trade is `PENDING`.
    pub fn mark_payment_sent(&mut self, trade_id: TradeId, user: UserId) -> Result<()> {
        let now = self.clock.now();
        let trade = self
            .trades
            .get_mut(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))?;
        if user != trade.buyer {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "mark payment sent",
            });
        }
        if trade.status != TradeStatus::Pending {
            return Err(PeertradeError::InvalidTradeState {
                operation: "mark_payment_sent",
                actual: trade.status,
            });
        }

        trade.status = TradeStatus::PaymentSent;
        trade.payment_sent_at = Some(now);
        let seller = trade.seller;
        tracing::info!(trade_id = %trade_id, "payment marked as sent");
        self.notify(
            seller,
            NotificationKind::PaymentSent,
            "Payment sent",
            "The buyer reports the fiat payment is on its way. Confirm receipt to release the escrow.",
            trade_id.to_string(),
        );
        Ok(())
    }

    /// Seller confirms fiat receipt; escrow releases to the buyer and the
    /// trade completes.
    ///
    /// # Errors
    /// - `NotAuthorized` unless `user` is the seller.
    /// - `InvalidTradeState` unless the trade is `PAYMENT_SENT`.
    pub fn confirm_and_complete(&mut self, trade_id: TradeId, user: UserId) -> Result<()> {
        let now = self.clock.now();
        let trade = self
            .trades
            .get(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))?;
        if user != trade.seller {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "confirm payment",
            });
        }
        if trade.status != TradeStatus::PaymentSent {
            return Err(PeertradeError::InvalidTradeState {
                operation: "confirm_and_complete",
                actual: trade.status,
            });
        }
        let (buyer, seller) = (trade.buyer, trade.seller);

        self.escrows.release(&mut self.ledger, trade_id, buyer)?;
        self.set_status(trade_id, TradeStatus::Completed, Some(now));
        self.reputation.record_completed(buyer, seller);
        tracing::info!(trade_id = %trade_id, "trade completed");
        self.notify(
            buyer,
            NotificationKind::PaymentConfirmed,
            "Trade completed",
            "The seller confirmed your payment; the crypto is in your balance.",
            trade_id.to_string(),
        );
        self.notify(
            seller,
            NotificationKind::PaymentConfirmed,
            "Trade completed",
            "You confirmed the payment; the escrow was released.",
            trade_id.to_string(),
        );
        Ok(())
    }

    /// Cancel a pending trade. Either party may cancel before the buyer has
    /// marked payment sent; after that the only exits are confirmation or
    /// dispute.
    ///
    /// # Errors
    /// - `NotAuthorized` unless `user` is a party to the trade.
    /// - `InvalidTradeState` unless the trade is `PENDING`.
    pub fn cancel(&mut self, trade_id: TradeId, user: UserId) -> Result<()> {
        let trade = self
            .trades
            .get(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))?;
        if !trade.is_party(user) {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "cancel trade",
            });
        }
        if trade.status != TradeStatus::Pending {
            return Err(PeertradeError::InvalidTradeState {
                operation: "cancel",
                actual: trade.status,
            });
        }
        let reason = if user == trade.buyer {
            CancelReason::Buyer
        } else {
            CancelReason::Seller
        };
        self.cancel_internal(trade_id, reason)?;
        // Only buyer-initiated cancellations count against reputation
        // history; a seller withdrawing pre-payment is not a strike.
        if reason == CancelReason::Buyer {
            self.reputation.record_cancelled(user);
        }
        Ok(())
    }

    /// Refund expired escrows and cancel their pending trades. Returns the
    /// ids of the trades swept.
    ///
    /// Only `PENDING` trades are swept here: a `PAYMENT_SENT` trade whose
    /// seller goes quiet is escalated to a system dispute instead (see the
    /// arbitration engine), never silently refunded.
    pub fn sweep_expired(&mut self) -> Vec<TradeId> {
        let now = self.clock.now();
        let mut swept = Vec::new();
        for trade_id in self.escrows.expired(now) {
            let Some(trade) = self.trades.get(&trade_id) else {
                continue;
            };
            if trade.status != TradeStatus::Pending {
                continue;
            }
            match self.cancel_internal(trade_id, CancelReason::Expired) {
                Ok(()) => {
                    swept.push(trade_id);
                }
                Err(err) => {
                    tracing::warn!(trade_id = %trade_id, %err, "sweep failed to cancel trade");
                }
            }
        }
        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "expired trades swept");
        }
        swept
    }

    /// Trades sitting in `PAYMENT_SENT` longer than the confirmation grace
    /// period. The arbitration engine opens system disputes for these.
    #[must_use]
    pub fn stalled_payment_sent(&self) -> Vec<TradeId> {
        let now = self.clock.now();
        let grace = self.config.confirmation_grace();
        self.trades
            .values()
            .filter(|t| {
                t.status == TradeStatus::PaymentSent
                    && t.payment_sent_at.is_some_and(|sent| now > sent + grace)
            })
            .map(|t| t.id)
            .collect()
    }

    // =====================================================================
    // Ratings
    // =====================================================================

    /// Rate the counterparty of a completed trade.
    ///
    /// # Errors
    /// - `InvalidTradeState` unless the trade is `COMPLETED`.
    /// - `NotAuthorized` unless `rater` is a party to the trade.
    /// - `InvalidRating` for out-of-range stars or duplicates.
    pub fn submit_rating(
        &mut self,
        trade_id: TradeId,
        rater: UserId,
        stars: u8,
        review: Option<String>,
    ) -> Result<()> {
        let trade = self
            .trades
            .get(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))?;
        if trade.status != TradeStatus::Completed {
            return Err(PeertradeError::InvalidTradeState {
                operation: "submit_rating",
                actual: trade.status,
            });
        }
        let rated = trade
            .counterparty_of(rater)
            .ok_or(PeertradeError::NotAuthorized {
                user: rater,
                operation: "rate trade",
            })?;
        self.reputation
            .submit(trade_id, rater, rated, stars, review, self.clock.now())
    }

    /// Current reputation for an account.
    #[must_use]
    pub fn reputation(&self, user: UserId) -> Reputation {
        self.reputation.reputation(user)
    }

    // =====================================================================
    // Dispute hooks (driven by the arbitration engine)
    // =====================================================================

    /// Look up a trade.
    pub fn trade(&self, trade_id: TradeId) -> Result<&Trade> {
        self.trades
            .get(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))
    }

    /// Look up the escrow backing a trade.
    pub fn escrow(&self, trade_id: TradeId) -> Result<&Escrow> {
        self.escrows.get(trade_id)
    }

    /// Move a trade into `DISPUTED` and count the dispute for both parties.
    ///
    /// # Errors
    /// Returns `InvalidTradeState` unless the trade is `PENDING` or
    /// `PAYMENT_SENT`.
    pub fn mark_disputed(&mut self, trade_id: TradeId) -> Result<()> {
        let trade = self
            .trades
            .get_mut(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))?;
        if !trade.status.is_disputable() {
            return Err(PeertradeError::InvalidTradeState {
                operation: "mark_disputed",
                actual: trade.status,
            });
        }
        trade.status = TradeStatus::Disputed;
        let (buyer, seller) = (trade.buyer, trade.seller);
        self.reputation.record_disputed(buyer, seller);
        Ok(())
    }

    /// Settle a disputed trade in the buyer's favor: release the escrow and
    /// complete the trade.
    pub fn settle_release_to_buyer(&mut self, trade_id: TradeId) -> Result<()> {
        let trade = self.disputed_trade(trade_id)?;
        let buyer = trade.buyer;
        self.escrows.release(&mut self.ledger, trade_id, buyer)?;
        self.set_status(trade_id, TradeStatus::Completed, Some(self.clock.now()));
        Ok(())
    }

    /// Settle a disputed trade in the seller's favor: refund the escrow,
    /// restore the offer's liquidity, and cancel the trade.
    pub fn settle_refund_to_seller(&mut self, trade_id: TradeId) -> Result<()> {
        let trade = self.disputed_trade(trade_id)?;
        let (offer_id, amount) = (trade.offer_id, trade.crypto_amount);
        self.escrows.refund(&mut self.ledger, trade_id)?;
        self.offers.restore(offer_id, amount)?;
        self.set_status(trade_id, TradeStatus::Cancelled, Some(self.clock.now()));
        Ok(())
    }

    /// Settle a disputed trade by splitting the escrow. Returns the
    /// (buyer, seller) shares.
    pub fn settle_split(
        &mut self,
        trade_id: TradeId,
        buyer_bps: u32,
    ) -> Result<(Decimal, Decimal)> {
        let trade = self.disputed_trade(trade_id)?;
        let buyer = trade.buyer;
        let shares = self
            .escrows
            .split(&mut self.ledger, trade_id, buyer, buyer_bps)?;
        self.set_status(trade_id, TradeStatus::Completed, Some(self.clock.now()));
        Ok(shares)
    }

    /// Apply the configured dispute-loss penalty to an account.
    pub fn apply_dispute_penalty(&mut self, user: UserId) {
        self.reputation
            .apply_penalty(user, self.config.dispute_loss_penalty);
    }

    /// The engine's view of the current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Emit a notification, logging instead of failing the caller if the
    /// sink rejects it.
    pub fn notify(
        &self,
        user: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        reference_id: impl Into<String>,
    ) {
        let notification =
            Notification::new(user, kind, title, message, reference_id, self.clock.now());
        if let Err(err) = self.notifier.deliver(notification) {
            tracing::warn!(user = %user, %kind, %err, "notification delivery failed");
        }
    }

    // =====================================================================
    // Internals
    // =====================================================================

    fn disputed_trade(&self, trade_id: TradeId) -> Result<&Trade> {
        let trade = self.trade(trade_id)?;
        if trade.status != TradeStatus::Disputed {
            return Err(PeertradeError::InvalidTradeState {
                operation: "settle_dispute",
                actual: trade.status,
            });
        }
        Ok(trade)
    }

    /// Refund + restore + cancel for a `PENDING` trade. Caller has already
    /// validated state and authorization.
    fn cancel_internal(&mut self, trade_id: TradeId, reason: CancelReason) -> Result<()> {
        let trade = self.trade(trade_id)?;
        let (buyer, seller, offer_id, amount) =
            (trade.buyer, trade.seller, trade.offer_id, trade.crypto_amount);

        self.escrows.refund(&mut self.ledger, trade_id)?;
        self.offers.restore(offer_id, amount)?;
        self.set_status(trade_id, TradeStatus::Cancelled, Some(self.clock.now()));
        tracing::info!(trade_id = %trade_id, ?reason, "trade cancelled");

        let kind = if reason == CancelReason::Expired {
            NotificationKind::TradeExpired
        } else {
            NotificationKind::TradeCancelled
        };
        let message = match reason {
            CancelReason::Expired => "Payment window elapsed; the escrow was refunded.",
            _ => "The trade was cancelled and the escrow refunded.",
        };
        self.notify(buyer, kind, "Trade cancelled", message, trade_id.to_string());
        self.notify(seller, kind, "Trade cancelled", message, trade_id.to_string());
        Ok(())
    }

    fn set_status(&mut self, trade_id: TradeId, status: TradeStatus, at: Option<DateTime<Utc>>) {
        if let Some(trade) = self.trades.get_mut(&trade_id) {
            debug_assert!(trade.status.can_transition_to(status));
            trade.status = status;
            if status.is_terminal() {
                trade.completed_at = at;
            }
        }
    }
}
