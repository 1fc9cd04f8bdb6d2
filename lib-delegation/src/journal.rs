//! Epoch and lockup-cycle journal.
//!
//! The journal keeps two independent monotone counters per pool: the local
//! reward epoch and the local lockup cycle, both starting at 1. They
//! advance in lock-step with an external clock that is observed less often
//! than it ticks, so a single call advances each counter by at most one
//! step; callers catch up by calling repeatedly.
//!
//! The `lockup_to_reward_epoch` map records, once known, the reward epoch
//! at which each lockup cycle began, which is also the epoch at which the
//! previous cycle's pending-inactive stake stopped earning.

use crate::events::{EventSink, PoolEvent};
use crate::types::{PeriodId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Period/lockup-cycle counters and their external-clock anchors.
///
/// Uses BTreeMap for deterministic serialization (consensus-critical).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochJournal {
    /// Local reward-epoch counter, starts at 1
    reward_epoch: PeriodId,
    /// Local lockup-cycle counter, starts at 1
    lockup_epoch: PeriodId,
    /// External clock value at which `reward_epoch` was last advanced
    last_observed_external_epoch: PeriodId,
    /// When the current lockup is expected to end
    last_lock_expiry: Timestamp,
    /// lockup cycle -> reward epoch at which it began (append-only)
    lockup_to_reward_epoch: BTreeMap<PeriodId, PeriodId>,
}

impl EpochJournal {
    /// Create a journal anchored at the given external observations.
    pub fn new(observed_epoch: PeriodId, lock_expiry: Timestamp) -> Self {
        Self {
            reward_epoch: 1,
            lockup_epoch: 1,
            last_observed_external_epoch: observed_epoch,
            last_lock_expiry: lock_expiry,
            lockup_to_reward_epoch: BTreeMap::new(),
        }
    }

    pub fn reward_epoch(&self) -> PeriodId {
        self.reward_epoch
    }

    pub fn lockup_epoch(&self) -> PeriodId {
        self.lockup_epoch
    }

    pub fn last_lock_expiry(&self) -> Timestamp {
        self.last_lock_expiry
    }

    /// The renewal counter a deposit keys on.
    pub fn period_for(&self, renews_on_lockup_cycle: bool) -> PeriodId {
        if renews_on_lockup_cycle {
            self.lockup_epoch
        } else {
            self.reward_epoch
        }
    }

    /// Reward epoch at which `lockup_epoch` began, once known.
    ///
    /// `None` means that cycle has not started yet (its predecessor is
    /// still resolving).
    pub fn resolution_epoch(&self, lockup_epoch: PeriodId) -> Option<PeriodId> {
        self.lockup_to_reward_epoch.get(&lockup_epoch).copied()
    }

    /// Advance the local counters if the external clock has ticked.
    ///
    /// Returns false (no-op) unless `observed_epoch` has moved past the
    /// last observation. Otherwise the reward epoch advances by exactly
    /// one step; if the wall clock has also reached the recorded lockup
    /// expiry, the lockup cycle advances by exactly one step and
    /// re-anchors on `next_expiry`. Periods are never batched: a clock
    /// that jumped several ticks still yields a single step per call.
    pub fn attempt_advance(
        &mut self,
        observed_epoch: PeriodId,
        now: Timestamp,
        next_expiry: Timestamp,
        sink: &mut dyn EventSink,
    ) -> bool {
        if observed_epoch <= self.last_observed_external_epoch {
            return false;
        }

        self.reward_epoch += 1;
        self.last_observed_external_epoch = observed_epoch;

        tracing::info!(
            "Epoch journal: reward epoch advanced to {} (external clock {})",
            self.reward_epoch,
            observed_epoch
        );
        sink.emit(PoolEvent::EpochAdvanced {
            reward_epoch: self.reward_epoch,
            lockup_epoch: self.lockup_epoch,
            observed_clock: observed_epoch,
            lock_expiry: self.last_lock_expiry,
        });

        if now >= self.last_lock_expiry {
            self.lockup_epoch += 1;
            self.last_lock_expiry = next_expiry;
            self.lockup_to_reward_epoch
                .insert(self.lockup_epoch, self.reward_epoch);

            tracing::info!(
                "Epoch journal: lockup cycle advanced to {} at reward epoch {}",
                self.lockup_epoch,
                self.reward_epoch
            );
            sink.emit(PoolEvent::EpochAdvanced {
                reward_epoch: self.reward_epoch,
                lockup_epoch: self.lockup_epoch,
                observed_clock: observed_epoch,
                lock_expiry: self.last_lock_expiry,
            });
        }

        true
    }

    /// Reflect an explicit lockup extension.
    ///
    /// A lockup already past its recorded expiry is mid-transition and is
    /// not retroactively extended; the refreshed expiry will be picked up
    /// when the cycle advances.
    pub fn after_lockup_extended(&mut self, now: Timestamp, next_expiry: Timestamp) {
        if now < self.last_lock_expiry {
            self.last_lock_expiry = next_expiry;
        }
    }
}
