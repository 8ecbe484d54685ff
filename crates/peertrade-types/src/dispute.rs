//! Dispute types for the PeerTrade arbitration engine.
//!
//! A [`Dispute`] is an arbitration case opened against a trade when the two
//! parties disagree about payment. It collects evidence from both sides and
//! is resolved exclusively by an account holding the arbitration capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DisputeId, TradeId, UserId};

/// The lifecycle state of a dispute: `open → under_review → resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeStatus {
    /// Opened by a counterparty or the system; unclaimed.
    Open,
    /// Claimed by an arbitrator for review.
    UnderReview,
    /// Settled. **Terminal** — fires exactly one escrow/trade transition pair.
    Resolved,
}

impl DisputeStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::UnderReview => write!(f, "UNDER_REVIEW"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// Who opened a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeOpener {
    /// One of the trade's counterparties.
    Party(UserId),
    /// Automatic escalation: the seller sat on a `payment_sent` trade past
    /// the confirmation grace period.
    System,
}

impl std::fmt::Display for DisputeOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Party(user) => write!(f, "{user}"),
            Self::System => write!(f, "system"),
        }
    }
}

/// The arbitrator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeOutcome {
    /// Escrow released to the buyer; trade completes. Seller lost.
    ReleaseToBuyer,
    /// Escrow refunded to the seller; trade cancels. Buyer lost.
    RefundToSeller,
    /// Escrow divided between the parties. `buyer_bps` is the buyer's share
    /// in basis points of the locked amount; the seller receives the exact
    /// remainder. `None` falls back to the engine's configured default
    /// ratio. Nobody takes a reputation penalty.
    Split { buyer_bps: Option<u32> },
}

impl std::fmt::Display for DisputeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReleaseToBuyer => write!(f, "release_to_buyer"),
            Self::RefundToSeller => write!(f, "refund_to_seller"),
            Self::Split {
                buyer_bps: Some(bps),
            } => write!(f, "split:{bps}bps"),
            Self::Split { buyer_bps: None } => write!(f, "split:default"),
        }
    }
}

/// An arbitration case against a single trade.
///
/// `evidence` is append-only for the lifetime of the dispute: both
/// counterparties may add references, and order is preserved for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    /// Globally unique dispute identifier.
    pub id: DisputeId,
    /// The trade under arbitration.
    pub trade_id: TradeId,
    /// Who opened the case.
    pub opened_by: DisputeOpener,
    /// Free-form reason stated at opening.
    pub reason: String,
    /// Ordered evidence references (receipts, screenshots, tx ids).
    pub evidence: Vec<String>,
    /// Current lifecycle state.
    pub status: DisputeStatus,
    /// The verdict, set exactly once at resolution.
    pub resolution: Option<DisputeOutcome>,
    /// The arbitrator who resolved the case.
    pub resolved_by: Option<UserId>,
    /// When the case was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// The arbitrator who claimed the case, if any.
    pub claimed_by: Option<UserId>,
    /// When the case was opened.
    pub opened_at: DateTime<Utc>,
}

impl Dispute {
    /// Construct a freshly opened dispute.
    #[must_use]
    pub fn new(
        trade_id: TradeId,
        opened_by: DisputeOpener,
        reason: impl Into<String>,
        evidence: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DisputeId::new(),
            trade_id,
            opened_by,
            reason: reason.into(),
            evidence,
            status: DisputeStatus::Open,
            resolution: None,
            resolved_by: None,
            resolved_at: None,
            claimed_by: None,
            opened_at: now,
        }
    }
}
