//! One delegator's position: an active and an inactive deferred deposit.

use crate::deposit::DeferredDeposit;
use crate::journal::EpochJournal;
use crate::types::{Amount, PeriodId};
use serde::{Deserialize, Serialize};

/// A delegator's stake in one pool, split by earning state.
///
/// The active side renews per reward-epoch; the inactive side renews per
/// lockup-cycle, matching the real timing at which unlocked stake becomes
/// withdrawable. One instance exists per delegator, plus one aggregate
/// instance owned by the pool. Records are created lazily on first stake
/// and never destroyed; zero balances are a valid terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub active: DeferredDeposit,
    pub inactive: DeferredDeposit,
}

impl Delegation {
    /// Create an empty position anchored at the journal's current periods.
    pub fn new(journal: &EpochJournal) -> Self {
        Self {
            active: DeferredDeposit::new(false, journal.reward_epoch()),
            inactive: DeferredDeposit::new(true, journal.lockup_epoch()),
        }
    }

    /// Renewed view of the active side as of the journal's reward epoch.
    pub fn active_renewed(&self, journal: &EpochJournal) -> (PeriodId, Amount, Amount) {
        self.active.read_renewed(journal.period_for(false))
    }

    /// Renewed view of the inactive side as of the journal's lockup cycle.
    pub fn inactive_renewed(&self, journal: &EpochJournal) -> (PeriodId, Amount, Amount) {
        self.inactive.read_renewed(journal.period_for(true))
    }

    /// Stake unlocked but not yet past its lockup cycle (still earning).
    pub fn pending_inactive(&self, journal: &EpochJournal) -> Amount {
        let (_, current, next) = self.inactive_renewed(journal);
        next.saturating_sub(current)
    }
}
