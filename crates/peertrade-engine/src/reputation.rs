//! Reputation bookkeeping: ratings, trade counters, and dispute penalties.
//!
//! One rating per rater per trade, enforced here. Reputation scores move
//! only through rating deltas and dispute-loss penalties, always clamped to
//! `[0, 100]` by [`Reputation::apply_delta`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use peertrade_types::{constants, PeertradeError, Rating, Reputation, Result, TradeId, UserId};

/// Per-account reputation store plus the rating log.
pub struct ReputationBook {
    accounts: HashMap<UserId, Reputation>,
    ratings: Vec<Rating>,
    /// Guards one-rating-per-rater-per-trade.
    rated: HashSet<(TradeId, UserId)>,
}

impl ReputationBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            ratings: Vec::new(),
            rated: HashSet::new(),
        }
    }

    /// Record a rating and apply its delta to the rated account.
    ///
    /// # Errors
    /// Returns `InvalidRating` if stars are outside `[1, 5]` or the rater
    /// already rated this trade.
    pub fn submit(
        &mut self,
        trade_id: TradeId,
        rater: UserId,
        rated: UserId,
        stars: u8,
        review: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !(constants::RATING_MIN..=constants::RATING_MAX).contains(&stars) {
            return Err(PeertradeError::InvalidRating {
                reason: format!("stars must be 1-5, got {stars}"),
            });
        }
        if !self.rated.insert((trade_id, rater)) {
            return Err(PeertradeError::InvalidRating {
                reason: format!("{rater} already rated {trade_id}"),
            });
        }

        let rating = Rating {
            trade_id,
            rater,
            rated,
            rating: stars,
            review,
            created_at: now,
        };
        let delta = rating.reputation_delta();
        self.accounts.entry(rated).or_default().apply_delta(delta);
        tracing::debug!(trade_id = %trade_id, rated = %rated, stars, delta, "rating applied");
        self.ratings.push(rating);
        Ok(())
    }

    /// Apply the dispute-loss penalty to an account.
    pub fn apply_penalty(&mut self, user: UserId, penalty: i32) {
        self.accounts.entry(user).or_default().apply_delta(-penalty);
        tracing::info!(user = %user, penalty, "dispute-loss penalty applied");
    }

    /// Count a completed trade for both parties.
    pub fn record_completed(&mut self, buyer: UserId, seller: UserId) {
        self.accounts.entry(buyer).or_default().completed_trades += 1;
        self.accounts.entry(seller).or_default().completed_trades += 1;
    }

    /// Count a cancellation against the cancelling account.
    pub fn record_cancelled(&mut self, user: UserId) {
        self.accounts.entry(user).or_default().cancelled_trades += 1;
    }

    /// Count a dispute for both parties of the trade.
    pub fn record_disputed(&mut self, buyer: UserId, seller: UserId) {
        self.accounts.entry(buyer).or_default().disputed_trades += 1;
        self.accounts.entry(seller).or_default().disputed_trades += 1;
    }

    /// Current reputation for an account (fresh default if never seen).
    #[must_use]
    pub fn reputation(&self, user: UserId) -> Reputation {
        self.accounts.get(&user).cloned().unwrap_or_default()
    }

    /// All ratings received by an account, in submission order.
    #[must_use]
    pub fn ratings_for(&self, user: UserId) -> Vec<&Rating> {
        self.ratings.iter().filter(|r| r.rated == user).collect()
    }
}

impl Default for ReputationBook {
    fn default() -> Self {
        Self::new()
    }
}
