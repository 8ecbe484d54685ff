//! Configuration for the PeerTrade engine.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Policy knobs for the trade, escrow, and dispute lifecycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minutes a buyer has to send fiat payment before the escrow expires.
    pub payment_timeout_minutes: i64,
    /// Minutes a seller has to confirm after `payment_sent` before the
    /// system opens a dispute on the buyer's behalf.
    pub confirmation_grace_minutes: i64,
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
    /// Reputation penalty for the losing side of a dispute.
    pub dispute_loss_penalty: i32,
    /// Buyer share (basis points) when an arbitrator splits without
    /// specifying a ratio.
    pub default_split_buyer_bps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payment_timeout_minutes: constants::DEFAULT_PAYMENT_TIMEOUT_MINUTES,
            confirmation_grace_minutes: constants::DEFAULT_CONFIRMATION_GRACE_MINUTES,
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            dispute_loss_penalty: constants::DEFAULT_DISPUTE_LOSS_PENALTY,
            default_split_buyer_bps: constants::DEFAULT_SPLIT_BUYER_BPS,
        }
    }
}

impl EngineConfig {
    /// Payment window as a chrono duration.
    #[must_use]
    pub fn payment_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.payment_timeout_minutes)
    }

    /// Confirmation grace period as a chrono duration.
    #[must_use]
    pub fn confirmation_grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.confirmation_grace_minutes)
    }
}
