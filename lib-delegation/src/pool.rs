//! Delegation pool orchestration.
//!
//! A `DelegationPool` composes the epoch journal, the cumulative reward
//! ledger, one aggregate position, and the per-delegator position map into
//! the public staking operations. The ordering rule that everything else
//! hangs off:
//!
//! 1. every mutating operation first runs `end_period` (advance the local
//!    counters if the external clock ticked, close the reward period), then
//! 2. settles the invoking delegator's outstanding rewards up to the
//!    now-current period (`restake`), and only then
//! 3. applies its own balance delta, mirrored onto the aggregate position.
//!
//! Operations can be delayed indefinitely and still reconcile to the same
//! answer, because settlement reads intervals out of the cumulative ratio
//! table rather than replaying history.
//!
//! # Consensus-Critical
//!
//! All arithmetic is checked and performed before any value moves; the
//! external ledger call happens after the checks and before the mirrored
//! slot mutations, so a collaborator failure aborts the operation with no
//! internal state change. Uses BTreeMap for deterministic iteration.

use crate::delegation::Delegation;
use crate::errors::{PoolError, PoolResult};
use crate::events::{EventSink, PoolEvent};
use crate::interface::{EpochClock, StakeLedger};
use crate::journal::EpochJournal;
use crate::rewards::RewardLedger;
use crate::types::{Address, Amount, PeriodId, PoolId, PoolStats, StakeBalances, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reward-distribution accounting for one stake pool.
///
/// Created once per validator/operator relationship; lives for the
/// lifetime of the staking relationship. The pool object is pure state:
/// the custody ledger, clock and event sink are passed into each
/// operation, and the pool holds the exclusive right to drive its ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationPool {
    id: PoolId,
    /// Pool owner (immutable at init); gates lockup and role changes
    owner: Address,
    /// Operator of the underlying validator
    operator: Address,
    /// Delegated governance voter
    voter: Address,
    journal: EpochJournal,
    rewards: RewardLedger,
    /// Sum of all delegator positions, mutated in lock-step with them
    aggregate: Delegation,
    /// Per-delegator positions, created lazily, never destroyed
    delegations: BTreeMap<Address, Delegation>,
    stats: PoolStats,
}

impl DelegationPool {
    /// Create a pool anchored on the current external observations.
    pub fn new(
        id: PoolId,
        owner: Address,
        observed_epoch: PeriodId,
        lock_expiry: Timestamp,
        initial_balance: Amount,
    ) -> Self {
        let journal = EpochJournal::new(observed_epoch, lock_expiry);
        let aggregate = Delegation::new(&journal);
        Self {
            id,
            owner,
            operator: owner,
            voter: owner,
            journal,
            rewards: RewardLedger::new(initial_balance),
            aggregate,
            delegations: BTreeMap::new(),
            stats: PoolStats::new(),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn voter(&self) -> Address {
        self.voter
    }

    pub fn journal(&self) -> &EpochJournal {
        &self.journal
    }

    pub fn rewards(&self) -> &RewardLedger {
        &self.rewards
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn delegator_count(&self) -> usize {
        self.delegations.len()
    }

    /// A delegator's renewed position, in the external balance breakdown
    /// shape. Absent delegators read as all-zero.
    pub fn delegator_stake(&self, delegator: &Address) -> StakeBalances {
        match self.delegations.get(delegator) {
            None => StakeBalances::default(),
            Some(d) => {
                let (_, active, active_next) = d.active_renewed(&self.journal);
                let (_, inactive, inactive_next) = d.inactive_renewed(&self.journal);
                StakeBalances {
                    active,
                    inactive,
                    pending_active: active_next.saturating_sub(active),
                    pending_inactive: inactive_next.saturating_sub(inactive),
                }
            }
        }
    }

    /// The aggregate position's renewed view, same shape as above.
    pub fn total_stake(&self) -> StakeBalances {
        let (_, active, active_next) = self.aggregate.active_renewed(&self.journal);
        let (_, inactive, inactive_next) = self.aggregate.inactive_renewed(&self.journal);
        StakeBalances {
            active,
            inactive,
            pending_active: active_next.saturating_sub(active),
            pending_inactive: inactive_next.saturating_sub(inactive),
        }
    }

    // ─── Period Advance ─────────────────────────────────────────────────

    /// Advance the local accounting period if the external clock ticked.
    ///
    /// The earning stake for the closing period is read from the
    /// aggregate's renewed views just before the flip: active stake plus
    /// the pending-inactive portion, which keeps earning until its lockup
    /// cycle resolves. Settled inactive stake earns nothing.
    ///
    /// Returns whether a period was closed. Advances at most one step;
    /// callers catch up on a lagging clock by calling repeatedly.
    pub fn end_period(
        &mut self,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<bool> {
        let (_, active_current, _) = self.aggregate.active_renewed(&self.journal);
        let pending_inactive = self.aggregate.pending_inactive(&self.journal);
        let earning_stake = active_current
            .checked_add(pending_inactive)
            .ok_or(PoolError::Overflow)?;

        let advanced = self.journal.attempt_advance(
            clock.current_epoch(),
            clock.now(),
            ledger.lockup_expiry(),
            sink,
        );
        if !advanced {
            return Ok(false);
        }

        let increment = self
            .rewards
            .close_period(ledger.total_balance().total(), earning_stake)?;
        self.rewards
            .record_epoch(self.journal.reward_epoch(), increment)?;
        self.stats.record_period_closed();
        Ok(true)
    }

    // ─── Reward Settlement ──────────────────────────────────────────────

    /// Settle a delegator's outstanding rewards up to the current period.
    ///
    /// Runs `end_period` first so the counters and the ratio table are
    /// current. Calling twice in the same period is a no-op the second
    /// time: settlement stamps the delegator's active period of record.
    pub fn restake(
        &mut self,
        delegator: Address,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.end_period(ledger, clock, sink)?;
        self.settle(delegator)
    }

    /// The settlement core: credits reward earned since the delegator's
    /// last settlement to both the delegator's and the aggregate ledgers.
    fn settle(&mut self, delegator: Address) -> PoolResult<()> {
        let now_epoch = self.journal.reward_epoch();
        let now_cycle = self.journal.lockup_epoch();

        let delegation = match self.delegations.get(&delegator) {
            Some(d) => d,
            // no position yet: nothing to settle
            None => return Ok(()),
        };

        let (last_epoch, active_current, active_next) = delegation.active.read();
        if last_epoch == now_epoch {
            return Ok(());
        }

        // Active side, from the pre-renewal snapshot: `current` earned
        // through its period of record; the already-activated `next`
        // balance earned across the fully-elapsed periods since.
        let active_reward = self
            .rewards
            .reward_over_interval(active_current, last_epoch, last_epoch + 1)?
            .checked_add(self.rewards.reward_over_interval(
                active_next,
                last_epoch + 1,
                now_epoch,
            )?)
            .ok_or(PoolError::Overflow)?;

        // Pending-inactive side: the portion still in transit out of the
        // earning state keeps earning the active rate until the lockup
        // cycle it belongs to resolves. The raw slots are read on purpose:
        // a renewed view would already have folded a resolved cycle away.
        let (last_cycle, inactive_current, inactive_next) = delegation.inactive.read();
        let pending = inactive_next.saturating_sub(inactive_current);
        let mut pending_resolved = false;
        let mut pending_reward_settled: Amount = 0;
        let mut pending_reward_deferred: Amount = 0;
        if pending > 0 {
            match self.journal.resolution_epoch(last_cycle + 1) {
                Some(resolution) if resolution <= now_epoch => {
                    // earned until the cycle resolved, then stopped. The
                    // settlement itself may come later than that boundary,
                    // in which case the reward up to the resolution was
                    // already credited at an earlier settlement.
                    pending_resolved = true;
                    if last_epoch < resolution {
                        pending_reward_settled =
                            self.rewards
                                .reward_over_interval(pending, last_epoch, resolution)?;
                    }
                }
                _ => {
                    // cycle still open: earned through the current period
                    pending_reward_deferred =
                        self.rewards
                            .reward_over_interval(pending, last_epoch, now_epoch)?;
                }
            }
        }

        // Apply to the delegator and the aggregate in lock-step. The
        // active credit is applied even at zero so the period of record
        // is stamped to the current epoch; likewise the resolved inactive
        // credit, whose renewal folds the settled pending amount into the
        // current slot.
        if let Some(d) = self.delegations.get_mut(&delegator) {
            d.active.increase(now_epoch, active_reward)?;
            if pending_resolved {
                d.inactive.increase(now_cycle, pending_reward_settled)?;
            } else if pending_reward_deferred > 0 {
                d.inactive.increase_next(now_cycle, pending_reward_deferred)?;
            }
        }
        self.aggregate.active.increase(now_epoch, active_reward)?;
        if pending_resolved {
            self.aggregate.inactive.increase(now_cycle, pending_reward_settled)?;
        } else if pending_reward_deferred > 0 {
            self.aggregate
                .inactive
                .increase_next(now_cycle, pending_reward_deferred)?;
        }

        if active_reward > 0 || pending_reward_settled > 0 || pending_reward_deferred > 0 {
            tracing::debug!(
                "Delegation pool {:?}: settled {:?} up to epoch {} (active {}, inactive {}, pending {})",
                self.id,
                delegator,
                now_epoch,
                active_reward,
                pending_reward_settled,
                pending_reward_deferred
            );
        }
        Ok(())
    }

    // ─── Delegator Operations ───────────────────────────────────────────

    /// Add stake for a delegator.
    ///
    /// While the pool is earning, the new stake pends until the next
    /// epoch (deferred slot); when it is not, the stake is active
    /// immediately.
    pub fn add_stake(
        &mut self,
        delegator: Address,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.restake(delegator, ledger, clock, sink)?;

        let now_epoch = self.journal.reward_epoch();
        let earning = ledger.is_earning();

        let empty = Delegation::new(&self.journal);
        let delegation = self.delegations.entry(delegator).or_insert(empty);

        // all arithmetic checked before any value moves
        let (_, _, delegator_next) = delegation.active.read_renewed(now_epoch);
        let (_, _, aggregate_next) = self.aggregate.active.read_renewed(now_epoch);
        delegator_next
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        aggregate_next
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        self.rewards
            .observed_pool_balance()
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;

        ledger.add(amount)?;
        self.rewards.note_deposit(amount)?;

        if earning {
            delegation.active.increase_next(now_epoch, amount)?;
            self.aggregate.active.increase_next(now_epoch, amount)?;
        } else {
            delegation.active.increase(now_epoch, amount)?;
            self.aggregate.active.increase(now_epoch, amount)?;
        }

        self.stats.record_stake(amount);
        tracing::debug!(
            "Delegation pool {:?}: {:?} added {} stake ({})",
            self.id,
            delegator,
            amount,
            if earning { "pending" } else { "active" }
        );
        sink.emit(PoolEvent::StakeAdded {
            pool: self.id,
            delegator,
            amount,
        });
        Ok(())
    }

    /// Begin moving a delegator's active stake out of the earning state.
    ///
    /// The requested amount is clamped to the stake currently active for
    /// the delegator; an over-generous request is capped, never an error.
    /// The unlocked stake becomes withdrawable once its lockup cycle
    /// resolves, and keeps earning until then.
    pub fn unlock(
        &mut self,
        delegator: Address,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.restake(delegator, ledger, clock, sink)?;

        let now_epoch = self.journal.reward_epoch();
        let now_cycle = self.journal.lockup_epoch();

        let available = match self.delegations.get(&delegator) {
            Some(d) => d.active_renewed(&self.journal).1,
            None => return Ok(()),
        };
        let clamped = amount.min(available);
        if clamped < amount {
            tracing::warn!(
                "Delegation pool {:?}: unlock of {} clamped to {} for {:?}",
                self.id,
                amount,
                clamped,
                delegator
            );
        }
        if clamped == 0 {
            return Ok(());
        }

        let delegation = match self.delegations.get_mut(&delegator) {
            Some(d) => d,
            None => return Ok(()),
        };
        let (_, _, delegator_next) = delegation.inactive.read_renewed(now_cycle);
        let (_, _, aggregate_next) = self.aggregate.inactive.read_renewed(now_cycle);
        delegator_next
            .checked_add(clamped)
            .ok_or(PoolError::Overflow)?;
        aggregate_next
            .checked_add(clamped)
            .ok_or(PoolError::Overflow)?;

        ledger.unlock(clamped)?;

        delegation.active.decrease(now_epoch, clamped)?;
        delegation.inactive.increase_next(now_cycle, clamped)?;
        self.aggregate.active.decrease(now_epoch, clamped)?;
        self.aggregate.inactive.increase_next(now_cycle, clamped)?;

        self.stats.record_unlock(clamped);
        tracing::debug!(
            "Delegation pool {:?}: {:?} unlocked {}",
            self.id,
            delegator,
            clamped
        );
        sink.emit(PoolEvent::StakeUnlocked {
            pool: self.id,
            delegator,
            amount: clamped,
        });
        Ok(())
    }

    /// Move a delegator's pending-inactive stake back to active.
    ///
    /// Clamped to the amount still in transit; stake that already cleared
    /// its lockup cycle must re-enter through `add_stake`.
    pub fn reactivate_stake(
        &mut self,
        delegator: Address,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.restake(delegator, ledger, clock, sink)?;

        let now_epoch = self.journal.reward_epoch();
        let now_cycle = self.journal.lockup_epoch();

        let available = match self.delegations.get(&delegator) {
            Some(d) => d.pending_inactive(&self.journal),
            None => return Ok(()),
        };
        let clamped = amount.min(available);
        if clamped < amount {
            tracing::warn!(
                "Delegation pool {:?}: reactivate of {} clamped to {} for {:?}",
                self.id,
                amount,
                clamped,
                delegator
            );
        }
        if clamped == 0 {
            return Ok(());
        }

        let delegation = match self.delegations.get_mut(&delegator) {
            Some(d) => d,
            None => return Ok(()),
        };
        let (_, _, delegator_next) = delegation.active.read_renewed(now_epoch);
        let (_, _, aggregate_next) = self.aggregate.active.read_renewed(now_epoch);
        delegator_next
            .checked_add(clamped)
            .ok_or(PoolError::Overflow)?;
        aggregate_next
            .checked_add(clamped)
            .ok_or(PoolError::Overflow)?;

        ledger.reactivate(clamped)?;

        delegation.inactive.decrease_next(now_cycle, clamped)?;
        delegation.active.increase(now_epoch, clamped)?;
        self.aggregate.inactive.decrease_next(now_cycle, clamped)?;
        self.aggregate.active.increase(now_epoch, clamped)?;

        self.stats.record_reactivate(clamped);
        tracing::debug!(
            "Delegation pool {:?}: {:?} reactivated {}",
            self.id,
            delegator,
            clamped
        );
        sink.emit(PoolEvent::StakeReactivated {
            pool: self.id,
            delegator,
            amount: clamped,
        });
        Ok(())
    }

    /// Withdraw a delegator's settled inactive stake.
    ///
    /// The implicit settlement means the paid-out balance reflects reward
    /// accrued up to the withdrawal period, never a stale earlier view.
    /// Clamped to the settled inactive balance.
    pub fn withdraw(
        &mut self,
        delegator: Address,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.restake(delegator, ledger, clock, sink)?;

        let now_cycle = self.journal.lockup_epoch();

        let available = match self.delegations.get(&delegator) {
            Some(d) => d.inactive_renewed(&self.journal).1,
            None => return Ok(()),
        };
        let clamped = amount.min(available);
        if clamped < amount {
            tracing::warn!(
                "Delegation pool {:?}: withdraw of {} clamped to {} for {:?}",
                self.id,
                amount,
                clamped,
                delegator
            );
        }
        if clamped == 0 {
            return Ok(());
        }

        ledger.withdraw(clamped)?;
        self.rewards.note_withdrawal(clamped);

        if let Some(d) = self.delegations.get_mut(&delegator) {
            d.inactive.decrease(now_cycle, clamped)?;
        }
        self.aggregate.inactive.decrease(now_cycle, clamped)?;

        self.stats.record_withdraw(clamped);
        tracing::debug!(
            "Delegation pool {:?}: {:?} withdrew {}",
            self.id,
            delegator,
            clamped
        );
        sink.emit(PoolEvent::StakeWithdrawn {
            pool: self.id,
            delegator,
            amount: clamped,
        });
        Ok(())
    }

    // ─── Owner Operations ───────────────────────────────────────────────

    fn verify_owner(&self, caller: Address) -> PoolResult<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(PoolError::OwnershipNotFound(caller))
        }
    }

    /// Extend the custody account's lockup by one full duration.
    ///
    /// An extension taken while the current lockup is still running is
    /// reflected in the journal immediately; one taken after expiry is
    /// picked up when the cycle advances.
    pub fn increase_lockup(
        &mut self,
        caller: Address,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
    ) -> PoolResult<()> {
        self.verify_owner(caller)?;
        ledger.increase_lockup()?;
        self.journal
            .after_lockup_extended(clock.now(), ledger.lockup_expiry());
        tracing::debug!(
            "Delegation pool {:?}: lockup extended, expiry {}",
            self.id,
            self.journal.last_lock_expiry()
        );
        Ok(())
    }

    pub fn set_operator(&mut self, caller: Address, new_operator: Address) -> PoolResult<()> {
        self.verify_owner(caller)?;
        self.operator = new_operator;
        tracing::debug!(
            "Delegation pool {:?}: operator set to {:?}",
            self.id,
            new_operator
        );
        Ok(())
    }

    pub fn set_delegated_voter(&mut self, caller: Address, new_voter: Address) -> PoolResult<()> {
        self.verify_owner(caller)?;
        self.voter = new_voter;
        tracing::debug!(
            "Delegation pool {:?}: voter set to {:?}",
            self.id,
            new_voter
        );
        Ok(())
    }

    // ─── Invariant Checking ─────────────────────────────────────────────

    /// Verify that the aggregate position equals the sum of all delegator
    /// positions, slot by slot, on renewed views.
    pub fn check_conservation(&self) -> PoolResult<()> {
        let epoch = self.journal.period_for(false);
        let cycle = self.journal.period_for(true);

        let mut sums: [Amount; 4] = [0; 4];
        for delegation in self.delegations.values() {
            let (_, active_current, active_next) = delegation.active.read_renewed(epoch);
            let (_, inactive_current, inactive_next) = delegation.inactive.read_renewed(cycle);
            for (slot, value) in [active_current, active_next, inactive_current, inactive_next]
                .into_iter()
                .enumerate()
            {
                sums[slot] = sums[slot].checked_add(value).ok_or(PoolError::Overflow)?;
            }
        }

        let (_, active_current, active_next) = self.aggregate.active.read_renewed(epoch);
        let (_, inactive_current, inactive_next) = self.aggregate.inactive.read_renewed(cycle);
        let aggregate = [active_current, active_next, inactive_current, inactive_next];
        let labels = ["active.current", "active.next", "inactive.current", "inactive.next"];

        for slot in 0..4 {
            if sums[slot] != aggregate[slot] {
                return Err(PoolError::ConservationViolated(format!(
                    "{}: aggregate {} != delegator sum {}",
                    labels[slot], aggregate[slot], sums[slot]
                )));
            }
        }
        Ok(())
    }
}
