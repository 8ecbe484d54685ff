//! Reputation and rating types.
//!
//! Reputation is a bounded integer score in `[0, 100]` per account, mutated
//! only by rating events and dispute-loss penalties — never by trade
//! completion alone. Trade counters are tracked separately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{constants, TradeId, UserId};

/// Coarse trust tier derived from history, shown next to offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrustLevel {
    New,
    Basic,
    Intermediate,
    Advanced,
    Verified,
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Basic => write!(f, "basic"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
            Self::Verified => write!(f, "verified"),
        }
    }
}

/// Per-account reputation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reputation {
    /// Bounded score in `[0, 100]`.
    pub score: i32,
    /// Trades this account saw through to completion.
    pub completed_trades: u32,
    /// Trades this account cancelled as buyer.
    pub cancelled_trades: u32,
    /// Trades that went to arbitration with this account as a party.
    pub disputed_trades: u32,
}

impl Reputation {
    /// Fresh account reputation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            score: constants::REPUTATION_INITIAL,
            completed_trades: 0,
            cancelled_trades: 0,
            disputed_trades: 0,
        }
    }

    /// Apply a signed delta, clamping to `[0, 100]`.
    pub fn apply_delta(&mut self, delta: i32) {
        self.score = (self.score + delta)
            .clamp(constants::REPUTATION_MIN, constants::REPUTATION_MAX);
    }

    /// Trust tier derived from completed trades and score.
    #[must_use]
    pub fn trust_level(&self) -> TrustLevel {
        match (self.completed_trades, self.score) {
            (t, s) if t >= 100 && s >= 90 => TrustLevel::Verified,
            (t, s) if t >= 50 && s >= 75 => TrustLevel::Advanced,
            (t, s) if t >= 10 && s >= 60 => TrustLevel::Intermediate,
            (t, _) if t >= 1 => TrustLevel::Basic,
            _ => TrustLevel::New,
        }
    }
}

impl Default for Reputation {
    fn default() -> Self {
        Self::new()
    }
}

/// A post-trade rating left by one counterparty for the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    /// The completed trade being rated.
    pub trade_id: TradeId,
    /// Who left the rating.
    pub rater: UserId,
    /// Who the rating is about.
    pub rated: UserId,
    /// Stars in `[1, 5]`.
    pub rating: u8,
    /// Optional free-form review text.
    pub review: Option<String>,
    /// When the rating was submitted.
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Reputation delta this rating applies: `(rating - 3) * 2`.
    ///
    /// 5 stars = +4, 3 stars = 0, 1 star = -4.
    #[must_use]
    pub fn reputation_delta(&self) -> i32 {
        (i32::from(self.rating) - 3) * 2
    }
}
