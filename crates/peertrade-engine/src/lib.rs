//! # peertrade-engine
//!
//! The PeerTrade trade engine: offer matching, the trade state machine,
//! escrow settlement, reputation bookkeeping, and the background expiry
//! sweeper.
//!
//! The [`TradeEngine`] facade is the only way the underlying stores are
//! mutated. It enforces the invariants the rest of the system relies on:
//!
//! - escrow records settle exactly once (release xor refund xor split)
//! - trade status transitions are monotonic, with no state skipping
//! - total asset supply is conserved by every lifecycle path
//! - a failed operation leaves every store untouched
//!
//! Dispute records and arbitration live in `peertrade-dispute`, which
//! drives this crate's `mark_disputed` / `settle_*` hooks.

pub mod engine;
pub mod escrow;
pub mod notify;
pub mod reputation;
pub mod sweeper;

pub use engine::TradeEngine;
pub use escrow::EscrowManager;
pub use notify::{InMemoryNotifier, LogNotifier, NotificationSink};
pub use reputation::ReputationBook;
pub use sweeper::Sweeper;
