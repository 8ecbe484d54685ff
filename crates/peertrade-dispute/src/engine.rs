//! The arbitration engine: dispute records and verdict execution.
//!
//! A dispute freezes its trade in `DISPUTED`; nothing else can touch the
//! escrow until an arbitrator resolves the case. Resolution fires exactly
//! one settlement on the trade engine (release, refund, or split) together
//! with the reputation penalty for the losing side.

use std::collections::HashMap;

use peertrade_engine::TradeEngine;
use peertrade_types::{
    Dispute, DisputeId, DisputeOpener, DisputeOutcome, DisputeStatus, NotificationKind,
    PeertradeError, Result, TradeId, UserId,
};

use crate::arbitration::ArbitratorDirectory;

/// Owns all dispute records and the arbitrator directory. Settlement is
/// delegated to the [`TradeEngine`] passed into each operation, which keeps
/// ledger, escrow, and trade state behind a single facade.
pub struct DisputeEngine {
    arbitrators: Box<dyn ArbitratorDirectory>,
    disputes: HashMap<DisputeId, Dispute>,
    /// Active (unresolved) dispute per trade. At most one.
    active_by_trade: HashMap<TradeId, DisputeId>,
}

impl DisputeEngine {
    /// Build an engine over the given arbitrator directory.
    #[must_use]
    pub fn new(arbitrators: Box<dyn ArbitratorDirectory>) -> Self {
        Self {
            arbitrators,
            disputes: HashMap::new(),
            active_by_trade: HashMap::new(),
        }
    }

    /// Open a dispute on behalf of one of the trade's counterparties.
    ///
    /// # Errors
    /// - `TradeNotFound` for unknown trades.
    /// - `NotAuthorized` unless `opener` is a party to the trade.
    /// - `InvalidTradeState` unless the trade is `PENDING` or `PAYMENT_SENT`.
    /// - `DisputeAlreadyOpen` if an unresolved dispute exists.
    pub fn open(
        &mut self,
        engine: &mut TradeEngine,
        trade_id: TradeId,
        opener: UserId,
        reason: impl Into<String>,
        evidence: Vec<String>,
    ) -> Result<DisputeId> {
        if !engine.trade(trade_id)?.is_party(opener) {
            return Err(PeertradeError::NotAuthorized {
                user: opener,
                operation: "open dispute",
            });
        }
        self.open_internal(engine, trade_id, DisputeOpener::Party(opener), reason, evidence)
    }

    /// Open a dispute on the system's behalf (confirmation-grace escalation).
    pub fn open_system(
        &mut self,
        engine: &mut TradeEngine,
        trade_id: TradeId,
        reason: impl Into<String>,
    ) -> Result<DisputeId> {
        self.open_internal(engine, trade_id, DisputeOpener::System, reason, Vec::new())
    }

    /// Append an evidence reference to an unresolved dispute. Either
    /// counterparty may contribute; order is preserved.
    ///
    /// # Errors
    /// - `DisputeNotFound` for unknown disputes.
    /// - `NotAuthorized` unless `user` is a party to the disputed trade.
    /// - `InvalidDisputeState` if the dispute is already resolved.
    pub fn append_evidence(
        &mut self,
        engine: &TradeEngine,
        dispute_id: DisputeId,
        user: UserId,
        item: impl Into<String>,
    ) -> Result<()> {
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(PeertradeError::DisputeNotFound(dispute_id))?;
        if dispute.status.is_terminal() {
            return Err(PeertradeError::InvalidDisputeState {
                operation: "append_evidence",
            });
        }
        if !engine.trade(dispute.trade_id)?.is_party(user) {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "submit evidence",
            });
        }
        dispute.evidence.push(item.into());
        Ok(())
    }

    /// Claim an open dispute for review. Arbitrators only, and never one
    /// of the trade's own counterparties.
    ///
    /// # Errors
    /// - `DisputeNotFound` for unknown disputes.
    /// - `NotAuthorized` unless `arbitrator` holds the capability, or if
    ///   they are a party to the disputed trade.
    /// - `InvalidDisputeState` unless the dispute is `OPEN`.
    pub fn claim(
        &mut self,
        engine: &TradeEngine,
        dispute_id: DisputeId,
        arbitrator: UserId,
    ) -> Result<()> {
        if !self.arbitrators.is_arbitrator(arbitrator) {
            return Err(PeertradeError::NotAuthorized {
                user: arbitrator,
                operation: "claim dispute",
            });
        }
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(PeertradeError::DisputeNotFound(dispute_id))?;
        if engine.trade(dispute.trade_id)?.is_party(arbitrator) {
            return Err(PeertradeError::NotAuthorized {
                user: arbitrator,
                operation: "claim own dispute",
            });
        }
        if dispute.status != DisputeStatus::Open {
            return Err(PeertradeError::InvalidDisputeState { operation: "claim" });
        }
        dispute.status = DisputeStatus::UnderReview;
        dispute.claimed_by = Some(arbitrator);
        tracing::info!(dispute_id = %dispute_id, arbitrator = %arbitrator, "dispute claimed");
        Ok(())
    }

    /// Resolve a dispute with a verdict. Arbitrators only, and never one of
    /// the trade's own counterparties, even if the directory lists them.
    /// Resolving an unclaimed dispute claims it implicitly.
    ///
    /// Exactly one settlement fires on the trade engine:
    /// - `ReleaseToBuyer` — escrow to the buyer, trade completes, seller
    ///   takes the dispute-loss penalty.
    /// - `RefundToSeller` — escrow back to the seller, offer liquidity
    ///   restored, trade cancels, buyer takes the penalty.
    /// - `Split` — escrow divided by basis points (the configured default
    ///   ratio when none is given), trade completes, no penalty for either
    ///   side.
    ///
    /// # Errors
    /// - `DisputeNotFound` / `NotAuthorized` as for [`Self::claim`].
    /// - `AlreadyResolved` on a second resolution attempt.
    /// - `InvalidSplitRatio` for degenerate split ratios.
    pub fn resolve(
        &mut self,
        engine: &mut TradeEngine,
        dispute_id: DisputeId,
        arbitrator: UserId,
        outcome: DisputeOutcome,
    ) -> Result<()> {
        if !self.arbitrators.is_arbitrator(arbitrator) {
            return Err(PeertradeError::NotAuthorized {
                user: arbitrator,
                operation: "resolve dispute",
            });
        }
        let dispute = self
            .disputes
            .get(&dispute_id)
            .ok_or(PeertradeError::DisputeNotFound(dispute_id))?;
        if dispute.status.is_terminal() {
            return Err(PeertradeError::AlreadyResolved {
                reason: format!("dispute {dispute_id} already resolved"),
            });
        }
        let trade_id = dispute.trade_id;
        let trade = engine.trade(trade_id)?;
        if trade.is_party(arbitrator) {
            return Err(PeertradeError::NotAuthorized {
                user: arbitrator,
                operation: "resolve own dispute",
            });
        }
        let (buyer, seller) = (trade.buyer, trade.seller);

        // Settle first; the record only flips to RESOLVED if the escrow
        // transition succeeded.
        match outcome {
            DisputeOutcome::ReleaseToBuyer => {
                engine.settle_release_to_buyer(trade_id)?;
                engine.apply_dispute_penalty(seller);
            }
            DisputeOutcome::RefundToSeller => {
                engine.settle_refund_to_seller(trade_id)?;
                engine.apply_dispute_penalty(buyer);
            }
            DisputeOutcome::Split { buyer_bps } => {
                let bps = buyer_bps.unwrap_or(engine.config().default_split_buyer_bps);
                engine.settle_split(trade_id, bps)?;
            }
        }

        let now = engine.now();
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(PeertradeError::DisputeNotFound(dispute_id))?;
        dispute.status = DisputeStatus::Resolved;
        dispute.resolution = Some(outcome);
        dispute.resolved_by = Some(arbitrator);
        dispute.resolved_at = Some(now);
        if dispute.claimed_by.is_none() {
            dispute.claimed_by = Some(arbitrator);
        }
        self.active_by_trade.remove(&trade_id);
        tracing::info!(
            dispute_id = %dispute_id,
            trade_id = %trade_id,
            %outcome,
            arbitrator = %arbitrator,
            "dispute resolved"
        );

        let message = format!("An arbitrator resolved the dispute: {outcome}.");
        for user in [buyer, seller] {
            engine.notify(
                user,
                NotificationKind::DisputeResolved,
                "Dispute resolved",
                message.clone(),
                dispute_id.to_string(),
            );
        }
        Ok(())
    }

    /// Open system disputes for every trade stuck in `PAYMENT_SENT` past
    /// the confirmation grace period. Returns the new dispute ids.
    pub fn escalate_stalled(&mut self, engine: &mut TradeEngine) -> Vec<DisputeId> {
        let mut opened = Vec::new();
        for trade_id in engine.stalled_payment_sent() {
            if self.active_by_trade.contains_key(&trade_id) {
                continue;
            }
            match self.open_system(
                engine,
                trade_id,
                "seller did not confirm payment within the grace period",
            ) {
                Ok(dispute_id) => opened.push(dispute_id),
                Err(err) => {
                    tracing::warn!(trade_id = %trade_id, %err, "auto-escalation failed");
                }
            }
        }
        if !opened.is_empty() {
            tracing::info!(count = opened.len(), "stalled trades escalated to disputes");
        }
        opened
    }

    /// Look up a dispute.
    pub fn get(&self, dispute_id: DisputeId) -> Result<&Dispute> {
        self.disputes
            .get(&dispute_id)
            .ok_or(PeertradeError::DisputeNotFound(dispute_id))
    }

    /// The active dispute for a trade, if one exists.
    #[must_use]
    pub fn active_for_trade(&self, trade_id: TradeId) -> Option<&Dispute> {
        self.active_by_trade
            .get(&trade_id)
            .and_then(|id| self.disputes.get(id))
    }

    /// All unresolved disputes, oldest first.
    #[must_use]
    pub fn open_disputes(&self) -> Vec<&Dispute> {
        let mut open: Vec<&Dispute> = self
            .disputes
            .values()
            .filter(|d| !d.status.is_terminal())
            .collect();
        open.sort_by_key(|d| d.opened_at);
        open
    }

    fn open_internal(
        &mut self,
        engine: &mut TradeEngine,
        trade_id: TradeId,
        opened_by: DisputeOpener,
        reason: impl Into<String>,
        evidence: Vec<String>,
    ) -> Result<DisputeId> {
        if self.active_by_trade.contains_key(&trade_id) {
            return Err(PeertradeError::DisputeAlreadyOpen(trade_id));
        }
        // Validates PENDING | PAYMENT_SENT and flips the trade to DISPUTED.
        engine.mark_disputed(trade_id)?;

        let dispute = Dispute::new(trade_id, opened_by, reason, evidence, engine.now());
        let dispute_id = dispute.id;
        tracing::info!(
            dispute_id = %dispute_id,
            trade_id = %trade_id,
            opened_by = %opened_by,
            "dispute opened"
        );
        self.disputes.insert(dispute_id, dispute);
        self.active_by_trade.insert(trade_id, dispute_id);

        let trade = engine.trade(trade_id)?;
        let (buyer, seller) = (trade.buyer, trade.seller);
        let message = format!("A dispute was opened by {opened_by}; the escrow is frozen.");
        // Parties plus the arbitration roster, so a claimant can pick the
        // case up without polling.
        let mut recipients = vec![buyer, seller];
        recipients.extend(self.arbitrators.roster());
        for user in recipients {
            engine.notify(
                user,
                NotificationKind::DisputeOpened,
                "Dispute opened",
                message.clone(),
                dispute_id.to_string(),
            );
        }
        Ok(dispute_id)
    }
}
