//! System-wide constants for the PeerTrade engine.

/// Default minutes a buyer has to send fiat payment before the escrow
/// expires and the trade is swept.
pub const DEFAULT_PAYMENT_TIMEOUT_MINUTES: i64 = 30;

/// Default minutes a seller has to confirm a `payment_sent` trade before
/// the system opens a dispute on the buyer's behalf.
pub const DEFAULT_CONFIRMATION_GRACE_MINUTES: i64 = 120;

/// Default interval between expiry sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Default reputation penalty applied to the losing side of a dispute.
pub const DEFAULT_DISPUTE_LOSS_PENALTY: i32 = 15;

/// Lowest possible reputation score.
pub const REPUTATION_MIN: i32 = 0;

/// Highest possible reputation score.
pub const REPUTATION_MAX: i32 = 100;

/// Reputation score assigned to brand-new accounts.
pub const REPUTATION_INITIAL: i32 = 50;

/// Lowest valid trade rating.
pub const RATING_MIN: u8 = 1;

/// Highest valid trade rating.
pub const RATING_MAX: u8 = 5;

/// Basis-point denominator for split dispute resolutions.
pub const SPLIT_BPS_DENOMINATOR: u32 = 10_000;

/// Default buyer share for a split resolution (50/50).
pub const DEFAULT_SPLIT_BUYER_BPS: u32 = 5_000;
