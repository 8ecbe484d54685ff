//! Arbitrator capability checks.
//!
//! Resolving a dispute is gated on membership in an arbitrator directory.
//! The directory is a trait so deployments can back it with whatever
//! registry they have; [`StaticArbitratorSet`] covers fixed rosters and
//! tests.

use std::collections::HashSet;

use peertrade_types::UserId;

/// Who is allowed to claim and resolve disputes.
pub trait ArbitratorDirectory: Send + Sync {
    /// Whether `user` holds the arbitration capability.
    fn is_arbitrator(&self, user: UserId) -> bool;

    /// Every arbitrator account, for dispute-opened notifications.
    fn roster(&self) -> Vec<UserId>;
}

/// A fixed set of arbitrator accounts.
#[derive(Debug, Clone, Default)]
pub struct StaticArbitratorSet {
    members: HashSet<UserId>,
}

impl StaticArbitratorSet {
    /// Build a roster from the given accounts.
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    /// Add an arbitrator to the roster.
    pub fn add(&mut self, user: UserId) {
        self.members.insert(user);
    }
}

impl ArbitratorDirectory for StaticArbitratorSet {
    fn is_arbitrator(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    fn roster(&self) -> Vec<UserId> {
        self.members.iter().copied().collect()
    }
}
