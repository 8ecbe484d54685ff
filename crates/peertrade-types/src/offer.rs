//! Offer types for the PeerTrade offer book.
//!
//! An [`Offer`] is a standing advertisement by a seller to exchange a crypto
//! amount for fiat at a stated price. Its `remaining_amount` counter is
//! decremented only by trade matching and restored only by trade
//! cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, OfferId, UserId};

/// The lifecycle state of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferStatus {
    /// Visible and matchable.
    Open,
    /// Hidden by the seller; not matchable until resumed.
    Paused,
    /// Fully consumed or withdrawn by the seller. A drained offer reopens
    /// if a trade against it is cancelled; a withdrawn one never does.
    Closed,
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Seller-supplied terms for a new offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferTerms {
    /// Asset being sold (e.g., "HEZ", "PEZ").
    pub token: Asset,
    /// Total crypto amount offered.
    pub total_amount: Decimal,
    /// Fiat price per crypto unit.
    pub price_per_unit: Decimal,
    /// Fiat currency code (e.g., "TRY", "EUR").
    pub fiat_currency: String,
    /// Smallest crypto amount a single trade may take.
    pub min_order: Decimal,
    /// Largest crypto amount a single trade may take.
    pub max_order: Decimal,
    /// Payment rail the seller accepts (e.g., "bank_transfer").
    pub payment_method: String,
}

/// A standing sell advertisement in the offer book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Globally unique offer identifier.
    pub id: OfferId,
    /// The seller who owns this offer.
    pub seller: UserId,
    /// Asset being sold.
    pub token: Asset,
    /// Total crypto amount originally offered.
    pub total_amount: Decimal,
    /// Crypto amount still available for matching.
    /// Invariant: `0 <= remaining_amount <= total_amount`.
    pub remaining_amount: Decimal,
    /// Fiat price per crypto unit.
    pub price_per_unit: Decimal,
    /// Fiat currency code.
    pub fiat_currency: String,
    /// Smallest crypto amount a single trade may take.
    pub min_order: Decimal,
    /// Largest crypto amount a single trade may take.
    pub max_order: Decimal,
    /// Payment rail the seller accepts.
    pub payment_method: String,
    /// Current lifecycle state.
    pub status: OfferStatus,
    /// Whether the seller withdrew this offer explicitly. A withdrawn
    /// offer stays closed even when a trade cancellation returns the
    /// amount it had reserved.
    pub withdrawn: bool,
    /// When the offer was created.
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Construct a fresh offer from seller terms, fully available and open.
    #[must_use]
    pub fn new(seller: UserId, terms: OfferTerms, now: DateTime<Utc>) -> Self {
        Self {
            id: OfferId::new(),
            seller,
            token: terms.token,
            total_amount: terms.total_amount,
            remaining_amount: terms.total_amount,
            price_per_unit: terms.price_per_unit,
            fiat_currency: terms.fiat_currency,
            min_order: terms.min_order,
            max_order: terms.max_order,
            payment_method: terms.payment_method,
            status: OfferStatus::Open,
            withdrawn: false,
            created_at: now,
        }
    }

    /// Fiat value of `crypto_amount` at this offer's price.
    #[must_use]
    pub fn fiat_value(&self, crypto_amount: Decimal) -> Decimal {
        crypto_amount * self.price_per_unit
    }

    /// Whether the offer is open with liquidity remaining.
    #[must_use]
    pub fn is_matchable(&self) -> bool {
        self.status == OfferStatus::Open && self.remaining_amount > Decimal::ZERO
    }
}

impl std::fmt::Display for Offer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Offer[{}] {} {}/{} {} @ {} {}",
            self.id,
            self.status,
            self.remaining_amount,
            self.total_amount,
            self.token,
            self.price_per_unit,
            self.fiat_currency,
        )
    }
}
