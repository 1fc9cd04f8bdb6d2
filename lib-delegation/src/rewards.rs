//! Cumulative reward-ratio ledger.
//!
//! One entry per reward epoch: `cumulative_ratio[e]` is the total yield
//! earned by one unit of earning stake from genesis through the end of
//! epoch `e`. The table is append-only and monotone non-decreasing, so the
//! reward earned over any interval `[begin, end)` is exactly
//! `cumulative_ratio[end] - cumulative_ratio[begin]`, independent of what
//! happened inside the interval.
//!
//! # Key Invariant
//!
//! Yield is never lost and never counted twice. A period that closes with
//! zero earning stake leaves `observed_pool_balance` untouched, so the
//! unattributed growth carries forward and is captured by the next close
//! that has stake to attribute it to. Principal movements are reported via
//! `note_deposit`/`note_withdrawal` so they are never mistaken for yield.

use crate::errors::{PoolError, PoolResult};
use crate::ratio::FixedRatio;
use crate::types::{Amount, PeriodId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monotone table of cumulative reward ratios per epoch.
///
/// Uses BTreeMap for deterministic serialization (consensus-critical).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLedger {
    /// reward epoch -> cumulative yield per unit of stake (append-only)
    cumulative_ratio: BTreeMap<PeriodId, FixedRatio>,
    /// Last externally-observed total pool value; the delta against it at
    /// a period close is the yield attributable to that period
    observed_pool_balance: Amount,
}

impl RewardLedger {
    /// Create a ledger seeded with a zero ratio at epoch 1, anchored on
    /// the pool's initial externally-observed balance.
    pub fn new(initial_balance: Amount) -> Self {
        let mut cumulative_ratio = BTreeMap::new();
        cumulative_ratio.insert(1, FixedRatio::ZERO);
        Self {
            cumulative_ratio,
            observed_pool_balance: initial_balance,
        }
    }

    pub fn observed_pool_balance(&self) -> Amount {
        self.observed_pool_balance
    }

    /// Cumulative ratio recorded for `period`.
    pub fn cumulative(&self, period: PeriodId) -> PoolResult<FixedRatio> {
        self.cumulative_ratio
            .get(&period)
            .copied()
            .ok_or(PoolError::PeriodNotRecorded(period))
    }

    /// Reward earned by `balance` units of stake over `[begin, end)`.
    ///
    /// Exact because the table is an additive running total; fixed-point
    /// multiplication truncates toward zero.
    ///
    /// # Errors
    /// - `InvalidInterval` if `begin > end` (caller bug)
    /// - `PeriodNotRecorded` if either endpoint has no table entry
    pub fn reward_over_interval(
        &self,
        balance: Amount,
        begin: PeriodId,
        end: PeriodId,
    ) -> PoolResult<Amount> {
        if begin > end {
            return Err(PoolError::InvalidInterval { begin, end });
        }
        if balance == 0 || begin == end {
            return Ok(0);
        }
        let from = self.cumulative(begin)?;
        let to = self.cumulative(end)?;
        // the table is monotone; a failing subtraction is a logic defect
        let delta = to.checked_sub(from).ok_or(PoolError::Overflow)?;
        delta.apply(balance)
    }

    /// Close the current period against the externally-observed total.
    ///
    /// Computes the yield accrued since the last close and converts it to
    /// a per-unit ratio increment over `earning_stake`. With zero earning
    /// stake the increment is zero and the observation anchor is left
    /// untouched: the unattributed yield carries forward instead of being
    /// discarded.
    pub fn close_period(
        &mut self,
        total_pool_balance: Amount,
        earning_stake: Amount,
    ) -> PoolResult<FixedRatio> {
        let epoch_yield = total_pool_balance.saturating_sub(self.observed_pool_balance);
        if earning_stake == 0 {
            return Ok(FixedRatio::ZERO);
        }
        self.observed_pool_balance = total_pool_balance;
        FixedRatio::from_fraction(epoch_yield, earning_stake)
    }

    /// Append the cumulative entry for a freshly-advanced epoch.
    ///
    /// # Errors
    /// - `PeriodAlreadyRecorded` on a duplicate append
    /// - `PeriodNotRecorded` if the predecessor entry is missing
    pub fn record_epoch(&mut self, new_epoch: PeriodId, increment: FixedRatio) -> PoolResult<()> {
        if self.cumulative_ratio.contains_key(&new_epoch) {
            return Err(PoolError::PeriodAlreadyRecorded(new_epoch));
        }
        let prev = self.cumulative(new_epoch.saturating_sub(1))?;
        let cumulative = prev.checked_add(increment).ok_or(PoolError::Overflow)?;
        self.cumulative_ratio.insert(new_epoch, cumulative);
        Ok(())
    }

    /// Fold a principal deposit into the observation anchor so it is not
    /// misread as yield at the next close.
    pub fn note_deposit(&mut self, amount: Amount) -> PoolResult<()> {
        self.observed_pool_balance = self
            .observed_pool_balance
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        Ok(())
    }

    /// Fold a principal withdrawal into the observation anchor.
    pub fn note_withdrawal(&mut self, amount: Amount) {
        self.observed_pool_balance = self.observed_pool_balance.saturating_sub(amount);
    }
}
