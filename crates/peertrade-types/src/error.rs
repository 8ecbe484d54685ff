//! Error types for the PeerTrade engine.
//!
//! All errors use the `PT_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Offer errors
//! - 2xx: Balance errors
//! - 3xx: Trade errors
//! - 4xx: Escrow / settlement errors
//! - 5xx: Dispute errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{DisputeId, OfferId, OfferStatus, TradeId, TradeStatus, UserId};

/// Central error enum for all PeerTrade operations.
#[derive(Debug, Error)]
pub enum PeertradeError {
    // =================================================================
    // Offer Errors (1xx)
    // =================================================================
    /// The requested offer was not found in the book.
    #[error("PT_ERR_100: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The offer failed validation (bad bounds, zero amount, etc.).
    #[error("PT_ERR_101: Invalid offer: {reason}")]
    InvalidOffer { reason: String },

    /// The offer is paused or closed and cannot be matched.
    #[error("PT_ERR_102: Offer is {status}, not open")]
    OfferNotOpen { status: OfferStatus },

    /// The requested amount violates the offer's order bounds or exceeds
    /// its remaining amount.
    #[error("PT_ERR_103: Insufficient liquidity: {reason}")]
    InsufficientLiquidity { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough spendable balance to perform the operation.
    #[error("PT_ERR_200: Insufficient available balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Not enough locked balance to settle or unlock.
    #[error("PT_ERR_201: Insufficient locked balance")]
    InsufficientLocked,

    // =================================================================
    // Trade Errors (3xx)
    // =================================================================
    /// The requested trade was not found.
    #[error("PT_ERR_300: Trade not found: {0}")]
    TradeNotFound(TradeId),

    /// An operation was attempted from a state that does not permit it.
    #[error("PT_ERR_301: Invalid trade state for {operation}: trade is {actual}")]
    InvalidTradeState {
        operation: &'static str,
        actual: TradeStatus,
    },

    /// The caller is not the required party for the operation.
    #[error("PT_ERR_302: Not authorized: {user} may not {operation}")]
    NotAuthorized {
        user: UserId,
        operation: &'static str,
    },

    /// Buyer and seller are the same account.
    #[error("PT_ERR_303: Self-trade prevented: buyer and seller are the same account")]
    SelfTradeBlocked,

    /// The rating is outside [1, 5] or a duplicate for this trade.
    #[error("PT_ERR_304: Invalid rating: {reason}")]
    InvalidRating { reason: String },

    // =================================================================
    // Escrow / Settlement Errors (4xx)
    // =================================================================
    /// No escrow record exists for the referenced trade.
    #[error("PT_ERR_400: Escrow not found for {0}")]
    EscrowNotFound(TradeId),

    /// Duplicate resolution/release/refund attempt on a terminal escrow
    /// or dispute.
    #[error("PT_ERR_401: Already resolved: {reason}")]
    AlreadyResolved { reason: String },

    // =================================================================
    // Dispute Errors (5xx)
    // =================================================================
    /// The requested dispute was not found.
    #[error("PT_ERR_500: Dispute not found: {0}")]
    DisputeNotFound(DisputeId),

    /// An active dispute already exists for this trade.
    #[error("PT_ERR_501: Dispute already open for {0}")]
    DisputeAlreadyOpen(TradeId),

    /// An operation was attempted from a dispute status that does not
    /// permit it.
    #[error("PT_ERR_502: Invalid dispute state for {operation}")]
    InvalidDisputeState { operation: &'static str },

    /// The split ratio is outside (0, 10000) basis points.
    #[error("PT_ERR_503: Invalid split ratio: {bps} bps")]
    InvalidSplitRatio { bps: u32 },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("PT_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PeertradeError>;
