//! The offer book: standing sell advertisements and their liquidity.
//!
//! Matching is reservation-based. When a trade is created against an offer,
//! [`OfferBook::reserve`] decrements `remaining_amount`; if the trade is
//! later cancelled, [`OfferBook::restore`] re-credits it. An offer whose
//! remaining amount reaches zero auto-closes, and reopens if a restore
//! brings liquidity back.

use std::collections::HashMap;

use peertrade_types::{Offer, OfferId, OfferStatus, OfferTerms, PeertradeError, Result, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// In-memory store of offers keyed by id.
pub struct OfferBook {
    offers: HashMap<OfferId, Offer>,
}

impl OfferBook {
    /// Create a new empty offer book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: HashMap::new(),
        }
    }

    /// Validate terms and insert a new open offer. Returns the offer id.
    ///
    /// Term validation only; the funding check against the seller's balance
    /// is the caller's responsibility (the trade engine performs it before
    /// inserting).
    ///
    /// # Errors
    /// Returns `InvalidOffer` if any amount is non-positive or the order
    /// bounds are inconsistent (`min_order > max_order` or
    /// `max_order > total_amount`).
    pub fn create(
        &mut self,
        seller: UserId,
        terms: OfferTerms,
        now: DateTime<Utc>,
    ) -> Result<OfferId> {
        if terms.total_amount <= Decimal::ZERO {
            return Err(PeertradeError::InvalidOffer {
                reason: "total_amount must be positive".to_string(),
            });
        }
        if terms.price_per_unit <= Decimal::ZERO {
            return Err(PeertradeError::InvalidOffer {
                reason: "price_per_unit must be positive".to_string(),
            });
        }
        if terms.min_order <= Decimal::ZERO {
            return Err(PeertradeError::InvalidOffer {
                reason: "min_order must be positive".to_string(),
            });
        }
        if terms.min_order > terms.max_order {
            return Err(PeertradeError::InvalidOffer {
                reason: format!(
                    "min_order {} exceeds max_order {}",
                    terms.min_order, terms.max_order
                ),
            });
        }
        if terms.max_order > terms.total_amount {
            return Err(PeertradeError::InvalidOffer {
                reason: format!(
                    "max_order {} exceeds total_amount {}",
                    terms.max_order, terms.total_amount
                ),
            });
        }

        let offer = Offer::new(seller, terms, now);
        let id = offer.id;
        tracing::debug!(offer_id = %id, seller = %seller, "offer created");
        self.offers.insert(id, offer);
        Ok(id)
    }

    /// Reserve `amount` of an offer's liquidity for a new trade.
    ///
    /// Enforces `min_order <= amount <= max_order` and
    /// `amount <= remaining_amount`. Decrements the remaining amount and
    /// auto-closes the offer when it hits zero. Returns a snapshot of the
    /// offer as it was **before** the decrement, which carries the price
    /// and payment terms the trade inherits.
    ///
    /// # Errors
    /// - `OfferNotFound` for unknown ids.
    /// - `OfferNotOpen` if the offer is paused or closed.
    /// - `InsufficientLiquidity` if the amount violates the order bounds
    ///   or exceeds the remaining amount.
    pub fn reserve(&mut self, id: OfferId, amount: Decimal) -> Result<Offer> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(PeertradeError::OfferNotFound(id))?;

        if offer.status != OfferStatus::Open {
            return Err(PeertradeError::OfferNotOpen {
                status: offer.status,
            });
        }
        if amount < offer.min_order {
            return Err(PeertradeError::InsufficientLiquidity {
                reason: format!("amount {} below min_order {}", amount, offer.min_order),
            });
        }
        if amount > offer.max_order {
            return Err(PeertradeError::InsufficientLiquidity {
                reason: format!("amount {} above max_order {}", amount, offer.max_order),
            });
        }
        if amount > offer.remaining_amount {
            return Err(PeertradeError::InsufficientLiquidity {
                reason: format!(
                    "amount {} exceeds remaining {}",
                    amount, offer.remaining_amount
                ),
            });
        }

        let snapshot = offer.clone();
        offer.remaining_amount -= amount;
        if offer.remaining_amount == Decimal::ZERO {
            offer.status = OfferStatus::Closed;
            tracing::debug!(offer_id = %id, "offer drained, auto-closed");
        }
        Ok(snapshot)
    }

    /// Restore previously reserved liquidity after a trade cancellation.
    ///
    /// Re-increments `remaining_amount` and reopens a drain-closed offer,
    /// since cancellation makes its liquidity matchable again. Paused
    /// offers stay paused, and an offer the seller withdrew stays closed:
    /// the cancelled trade's funds go back to the seller through the
    /// escrow refund, not the book.
    ///
    /// # Errors
    /// Returns `OfferNotFound` for unknown ids.
    pub fn restore(&mut self, id: OfferId, amount: Decimal) -> Result<()> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(PeertradeError::OfferNotFound(id))?;

        if offer.withdrawn {
            tracing::debug!(offer_id = %id, "offer withdrawn by seller, restore skipped");
            return Ok(());
        }
        offer.remaining_amount += amount;
        if offer.status == OfferStatus::Closed && offer.remaining_amount > Decimal::ZERO {
            offer.status = OfferStatus::Open;
            tracing::debug!(offer_id = %id, "offer reopened after restore");
        }
        Ok(())
    }

    /// Pause an open offer so it stops matching. Only the seller may pause.
    ///
    /// # Errors
    /// - `OfferNotFound` for unknown ids.
    /// - `NotAuthorized` if `user` is not the seller.
    /// - `OfferNotOpen` if the offer is not currently open.
    pub fn pause(&mut self, id: OfferId, user: UserId) -> Result<()> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(PeertradeError::OfferNotFound(id))?;
        if offer.seller != user {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "pause offer",
            });
        }
        if offer.status != OfferStatus::Open {
            return Err(PeertradeError::OfferNotOpen {
                status: offer.status,
            });
        }
        offer.status = OfferStatus::Paused;
        Ok(())
    }

    /// Resume a paused offer. Only the seller may resume.
    ///
    /// # Errors
    /// - `OfferNotFound` for unknown ids.
    /// - `NotAuthorized` if `user` is not the seller.
    /// - `OfferNotOpen` if the offer is not currently paused.
    pub fn resume(&mut self, id: OfferId, user: UserId) -> Result<()> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(PeertradeError::OfferNotFound(id))?;
        if offer.seller != user {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "resume offer",
            });
        }
        if offer.status != OfferStatus::Paused {
            return Err(PeertradeError::OfferNotOpen {
                status: offer.status,
            });
        }
        offer.status = OfferStatus::Open;
        Ok(())
    }

    /// Close an offer permanently at the seller's request. Returns the
    /// remaining amount that was withdrawn from the book. In-flight trades
    /// against the offer are unaffected; their funds are already locked,
    /// and later cancellations do not reopen a withdrawn offer.
    ///
    /// # Errors
    /// - `OfferNotFound` for unknown ids.
    /// - `NotAuthorized` if `user` is not the seller.
    /// - `OfferNotOpen` if the offer is already closed.
    pub fn close(&mut self, id: OfferId, user: UserId) -> Result<Decimal> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(PeertradeError::OfferNotFound(id))?;
        if offer.seller != user {
            return Err(PeertradeError::NotAuthorized {
                user,
                operation: "close offer",
            });
        }
        if offer.status == OfferStatus::Closed {
            return Err(PeertradeError::OfferNotOpen {
                status: offer.status,
            });
        }
        offer.status = OfferStatus::Closed;
        offer.withdrawn = true;
        let remaining = offer.remaining_amount;
        offer.remaining_amount = Decimal::ZERO;
        Ok(remaining)
    }

    /// Look up an offer by id.
    ///
    /// # Errors
    /// Returns `OfferNotFound` for unknown ids.
    pub fn get(&self, id: OfferId) -> Result<&Offer> {
        self.offers.get(&id).ok_or(PeertradeError::OfferNotFound(id))
    }

    /// All open, matchable offers for a token, cheapest first.
    #[must_use]
    pub fn open_offers(&self, token: &str) -> Vec<&Offer> {
        let mut open: Vec<&Offer> = self
            .offers
            .values()
            .filter(|o| o.token == token && o.is_matchable())
            .collect();
        open.sort_by(|a, b| a.price_per_unit.cmp(&b.price_per_unit));
        open
    }

    /// All offers owned by a seller, regardless of status.
    #[must_use]
    pub fn by_seller(&self, seller: UserId) -> Vec<&Offer> {
        self.offers
            .values()
            .filter(|o| o.seller == seller)
            .collect()
    }
}

impl Default for OfferBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(total: i64) -> OfferTerms {
        OfferTerms {
            token: "PEZ".to_string(),
            total_amount: Decimal::new(total, 0),
            price_per_unit: Decimal::new(5, 0),
            fiat_currency: "TRY".to_string(),
            min_order: Decimal::new(10, 0),
            max_order: Decimal::new(total, 0),
            payment_method: "bank_transfer".to_string(),
        }
    }

    #[test]
    fn create_and_get() {
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let id = book.create(seller, terms(500), Utc::now()).unwrap();
        let offer = book.get(id).unwrap();
        assert_eq!(offer.seller, seller);
        assert_eq!(offer.remaining_amount, Decimal::new(500, 0));
    }

    #[test]
    fn create_rejects_inverted_bounds() {
        let mut book = OfferBook::new();
        let mut t = terms(100);
        t.min_order = Decimal::new(60, 0);
        t.max_order = Decimal::new(40, 0);
        let err = book.create(UserId::new(), t, Utc::now()).unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidOffer { .. }));
    }

    #[test]
    fn create_rejects_max_above_total() {
        let mut book = OfferBook::new();
        let mut t = terms(100);
        t.max_order = Decimal::new(150, 0);
        let err = book.create(UserId::new(), t, Utc::now()).unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidOffer { .. }));
    }

    #[test]
    fn create_rejects_zero_amount() {
        let mut book = OfferBook::new();
        let mut t = terms(100);
        t.total_amount = Decimal::ZERO;
        let err = book.create(UserId::new(), t, Utc::now()).unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidOffer { .. }));
    }

    #[test]
    fn reserve_decrements_remaining() {
        let mut book = OfferBook::new();
        let id = book.create(UserId::new(), terms(500), Utc::now()).unwrap();
        let snapshot = book.reserve(id, Decimal::new(200, 0)).unwrap();
        assert_eq!(snapshot.remaining_amount, Decimal::new(500, 0));
        assert_eq!(book.get(id).unwrap().remaining_amount, Decimal::new(300, 0));
    }

    #[test]
    fn reserve_enforces_min_order() {
        let mut book = OfferBook::new();
        let id = book.create(UserId::new(), terms(500), Utc::now()).unwrap();
        let err = book.reserve(id, Decimal::new(5, 0)).unwrap_err();
        assert!(matches!(err, PeertradeError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn reserve_enforces_remaining() {
        let mut book = OfferBook::new();
        let id = book.create(UserId::new(), terms(500), Utc::now()).unwrap();
        book.reserve(id, Decimal::new(450, 0)).unwrap();
        let err = book.reserve(id, Decimal::new(100, 0)).unwrap_err();
        assert!(matches!(err, PeertradeError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn drained_offer_auto_closes_and_restore_reopens() {
        let mut book = OfferBook::new();
        let id = book.create(UserId::new(), terms(100), Utc::now()).unwrap();
        book.reserve(id, Decimal::new(100, 0)).unwrap();
        assert_eq!(book.get(id).unwrap().status, OfferStatus::Closed);

        book.restore(id, Decimal::new(100, 0)).unwrap();
        let offer = book.get(id).unwrap();
        assert_eq!(offer.status, OfferStatus::Open);
        assert_eq!(offer.remaining_amount, Decimal::new(100, 0));
    }

    #[test]
    fn restore_does_not_reopen_withdrawn_offer() {
        // The seller takes the offer down while a trade is in flight; the
        // trade's later cancellation must not put the offer back on the
        // book against the seller's wishes.
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let id = book.create(seller, terms(500), Utc::now()).unwrap();
        book.reserve(id, Decimal::new(200, 0)).unwrap();
        book.close(id, seller).unwrap();

        book.restore(id, Decimal::new(200, 0)).unwrap();
        let offer = book.get(id).unwrap();
        assert_eq!(offer.status, OfferStatus::Closed);
        assert_eq!(offer.remaining_amount, Decimal::ZERO);
        assert!(!offer.is_matchable());
    }

    #[test]
    fn reserve_rejects_closed_offer() {
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let id = book.create(seller, terms(100), Utc::now()).unwrap();
        book.close(id, seller).unwrap();
        let err = book.reserve(id, Decimal::new(50, 0)).unwrap_err();
        assert!(matches!(err, PeertradeError::OfferNotOpen { .. }));
    }

    #[test]
    fn pause_and_resume_gate_matching() {
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let id = book.create(seller, terms(100), Utc::now()).unwrap();

        book.pause(id, seller).unwrap();
        let err = book.reserve(id, Decimal::new(50, 0)).unwrap_err();
        assert!(matches!(err, PeertradeError::OfferNotOpen { .. }));

        book.resume(id, seller).unwrap();
        book.reserve(id, Decimal::new(50, 0)).unwrap();
    }

    #[test]
    fn only_seller_may_pause() {
        let mut book = OfferBook::new();
        let id = book.create(UserId::new(), terms(100), Utc::now()).unwrap();
        let err = book.pause(id, UserId::new()).unwrap_err();
        assert!(matches!(err, PeertradeError::NotAuthorized { .. }));
    }

    #[test]
    fn close_returns_remaining_for_unlock() {
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let id = book.create(seller, terms(500), Utc::now()).unwrap();
        book.reserve(id, Decimal::new(200, 0)).unwrap();
        let remaining = book.close(id, seller).unwrap();
        assert_eq!(remaining, Decimal::new(300, 0));
        assert_eq!(book.get(id).unwrap().remaining_amount, Decimal::ZERO);
    }

    #[test]
    fn open_offers_sorted_by_price() {
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let mut cheap = terms(100);
        cheap.price_per_unit = Decimal::new(3, 0);
        let mut pricey = terms(100);
        pricey.price_per_unit = Decimal::new(9, 0);
        let id_pricey = book.create(seller, pricey, Utc::now()).unwrap();
        let id_cheap = book.create(seller, cheap, Utc::now()).unwrap();

        let open = book.open_offers("PEZ");
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, id_cheap);
        assert_eq!(open[1].id, id_pricey);
    }

    #[test]
    fn by_seller_includes_closed() {
        let mut book = OfferBook::new();
        let seller = UserId::new();
        let id = book.create(seller, terms(100), Utc::now()).unwrap();
        book.close(id, seller).unwrap();
        assert_eq!(book.by_seller(seller).len(), 1);
        assert!(book.by_seller(UserId::new()).is_empty());
    }
}
