//! Deferred two-slot balance.
//!
//! A `DeferredDeposit` holds one actor's stake in one state (active or
//! inactive) as a pair of slots: `current` is authoritative for the period
//! of record, `next` becomes authoritative once the period advances.
//! Renewal is lazy: nothing happens at the period boundary itself; instead
//! every mutator (and the renewed read) first folds `next` into `current`
//! if the externally supplied "now" period has moved past the period of
//! record.
//!
//! # Invariants
//!
//! - `period_of_record` only advances.
//! - `increase`/`decrease` adjust both slots (an immediately-effective
//!   change); `increase_next`/`decrease_next` adjust only the deferred slot.
//! - A decrease that would drive a slot negative is a logic defect
//!   (`InsufficientBalance`), not a user-input error: callers settle and
//!   clamp before mutating.

use crate::errors::{PoolError, PoolResult};
use crate::types::{Amount, PeriodId};
use serde::{Deserialize, Serialize};

/// A lazily-renewing two-slot balance (current period, next period).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredDeposit {
    /// Period at which `current` was last made authoritative
    period_of_record: PeriodId,
    /// Balance effective in `period_of_record`
    current: Amount,
    /// Balance that becomes `current` once the period advances
    next: Amount,
    /// Whether "period" means lockup-cycle (true) or reward-epoch (false)
    /// for this ledger's renewal policy
    renews_on_lockup_cycle: bool,
}

impl DeferredDeposit {
    /// Create an empty deposit anchored at `period`.
    pub fn new(renews_on_lockup_cycle: bool, period: PeriodId) -> Self {
        Self {
            period_of_record: period,
            current: 0,
            next: 0,
            renews_on_lockup_cycle,
        }
    }

    pub fn renews_on_lockup_cycle(&self) -> bool {
        self.renews_on_lockup_cycle
    }

    pub fn period_of_record(&self) -> PeriodId {
        self.period_of_record
    }

    /// Raw view: `(period_of_record, current, next)`, no renewal applied.
    pub fn read(&self) -> (PeriodId, Amount, Amount) {
        (self.period_of_record, self.current, self.next)
    }

    /// Renewed view as of `now`, without mutating the stored ledger.
    pub fn read_renewed(&self, now: PeriodId) -> (PeriodId, Amount, Amount) {
        let mut copy = self.clone();
        copy.renew(now);
        copy.read()
    }

    fn renew(&mut self, now: PeriodId) {
        if now > self.period_of_record {
            self.current = self.next;
            self.period_of_record = now;
        }
    }

    /// Immediately-effective increase: adjusts both slots.
    pub fn increase(&mut self, now: PeriodId, amount: Amount) -> PoolResult<()> {
        self.renew(now);
        let current = self.current.checked_add(amount).ok_or(PoolError::Overflow)?;
        let next = self.next.checked_add(amount).ok_or(PoolError::Overflow)?;
        self.current = current;
        self.next = next;
        Ok(())
    }

    /// Immediately-effective decrease: adjusts both slots.
    pub fn decrease(&mut self, now: PeriodId, amount: Amount) -> PoolResult<()> {
        self.renew(now);
        if self.current < amount {
            return Err(PoolError::InsufficientBalance {
                have: self.current,
                need: amount,
            });
        }
        if self.next < amount {
            return Err(PoolError::InsufficientBalance {
                have: self.next,
                need: amount,
            });
        }
        self.current -= amount;
        self.next -= amount;
        Ok(())
    }

    /// Deferred increase: takes effect when the period next advances.
    pub fn increase_next(&mut self, now: PeriodId, amount: Amount) -> PoolResult<()> {
        self.renew(now);
        self.next = self.next.checked_add(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    /// Deferred decrease: removes value that had not yet become effective.
    pub fn decrease_next(&mut self, now: PeriodId, amount: Amount) -> PoolResult<()> {
        self.renew(now);
        if self.next < amount {
            return Err(PoolError::InsufficientBalance {
                have: self.next,
                need: amount,
            });
        }
        self.next -= amount;
        Ok(())
    }
}
