//! # peertrade-ledger
//!
//! The two shared mutable resources every other component reads and writes:
//!
//! - [`BalanceLedger`] — per-(account, asset) balances with available/locked
//!   accounting. Every credit and debit is a signed delta applied to an
//!   entry; a failed operation leaves the entry untouched.
//! - [`OfferBook`] — standing sell advertisements with the remaining-amount
//!   counter that trade matching decrements and cancellation restores.
//!
//! The escrow manager and trade engine (in `peertrade-engine`) call into
//! these stores; the stores themselves carry no trade or dispute state.

pub mod balances;
pub mod offers;

pub use balances::BalanceLedger;
pub use offers::OfferBook;
