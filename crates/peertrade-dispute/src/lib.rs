//! # peertrade-dispute
//!
//! Arbitration for PeerTrade: dispute records, evidence collection, the
//! arbitrator capability check, and verdict execution against the trade
//! engine.
//!
//! A dispute is the only path by which a `PAYMENT_SENT` trade can end
//! without seller confirmation, and the only authority that may move a
//! `DISPUTED` escrow. The [`DisputeEngine`] owns the case records; all
//! ledger and trade mutations go through the `peertrade-engine` facade it
//! is handed.

pub mod arbitration;
pub mod engine;

pub use arbitration::{ArbitratorDirectory, StaticArbitratorSet};
pub use engine::DisputeEngine;
