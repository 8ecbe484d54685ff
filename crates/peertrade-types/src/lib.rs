//! # peertrade-types
//!
//! Shared types, errors, and configuration for the **PeerTrade** escrow and
//! dispute engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OfferId`], [`TradeId`], [`EscrowId`], [`DisputeId`], [`UserId`]
//! - **Offer model**: [`Offer`], [`OfferStatus`], [`OfferTerms`]
//! - **Trade model**: [`Trade`], [`TradeStatus`]
//! - **Escrow model**: [`Escrow`], [`EscrowStatus`]
//! - **Dispute model**: [`Dispute`], [`DisputeStatus`], [`DisputeOutcome`], [`DisputeOpener`]
//! - **Balance model**: [`BalanceEntry`], [`Asset`]
//! - **Reputation model**: [`Reputation`], [`TrustLevel`], [`Rating`]
//! - **Notifications**: [`Notification`], [`NotificationKind`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`PeertradeError`] with `PT_ERR_` prefix codes
//! - **Clock**: [`Clock`], [`SystemClock`], [`ManualClock`]

pub mod balance;
pub mod clock;
pub mod config;
pub mod constants;
pub mod dispute;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod notification;
pub mod offer;
pub mod reputation;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use peertrade_types::{Offer, Trade, Escrow, Dispute, ...};

pub use balance::*;
pub use clock::*;
pub use config::*;
pub use dispute::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use notification::*;
pub use offer::*;
pub use reputation::*;
pub use trade::*;

// Constants are accessed via `peertrade_types::constants::FOO`
// (not re-exported to avoid name collisions).
