//! Collaborator interfaces at the custody and clock boundaries.
//!
//! The accounting core never holds funds and never reads a wall clock of
//! its own. Each pool drives one [`StakeLedger`], the external native
//! ledger that physically holds its stake, and observes one
//! [`EpochClock`]. Both are passed into operations as explicit
//! parameters, so the pool object remains pure serializable state.
//!
//! `MemStakeLedger` and `ManualClock` are deterministic in-memory
//! implementations for tests and development.

use crate::errors::{PoolError, PoolResult};
use crate::types::{Amount, PeriodId, StakeBalances, Timestamp};

/// External native stake ledger for one pool's custody account.
///
/// Implementations report the externally-settled balance breakdown; the
/// accounting core owns the attribution of that value to delegators.
pub trait StakeLedger {
    /// Deposit new stake into the custody account.
    fn add(&mut self, amount: Amount) -> PoolResult<()>;

    /// Begin moving active stake out of the earning state.
    fn unlock(&mut self, amount: Amount) -> PoolResult<()>;

    /// Move pending-inactive stake back into the earning state.
    fn reactivate(&mut self, amount: Amount) -> PoolResult<()>;

    /// Pay out settled inactive stake.
    fn withdraw(&mut self, amount: Amount) -> PoolResult<()>;

    /// Current externally-settled balance breakdown.
    fn total_balance(&self) -> StakeBalances;

    /// Whether the pool's stake is currently earning yield.
    fn is_earning(&self) -> bool;

    /// When the current lockup is expected to end.
    fn lockup_expiry(&self) -> Timestamp;

    /// Extend the custody account's lockup by one full duration.
    fn increase_lockup(&mut self) -> PoolResult<()>;
}

/// External epoch clock, observed less often than it ticks.
pub trait EpochClock {
    fn current_epoch(&self) -> PeriodId;
    fn now(&self) -> Timestamp;
}

// ============================================================================
// IN-MEMORY IMPLEMENTATIONS (tests/development)
// ============================================================================

/// In-memory stake ledger.
///
/// Epoch-boundary settlement (pending-active becoming active, yield
/// arriving, pending-inactive becoming inactive at lockup end) does not
/// happen by itself: tests drive it explicitly with `settle_epoch`,
/// `accrue_yield` and `settle_lockup`, mirroring what the external system
/// would do between observations.
#[derive(Debug, Clone)]
pub struct MemStakeLedger {
    balances: StakeBalances,
    earning: bool,
    lockup_expiry: Timestamp,
    lockup_duration: Timestamp,
}

impl MemStakeLedger {
    pub fn new(lockup_expiry: Timestamp, lockup_duration: Timestamp) -> Self {
        Self {
            balances: StakeBalances::default(),
            earning: true,
            lockup_expiry,
            lockup_duration,
        }
    }

    pub fn set_earning(&mut self, earning: bool) {
        self.earning = earning;
    }

    /// Yield paid by the external system onto the earning active stake.
    pub fn accrue_yield(&mut self, amount: Amount) {
        self.balances.active = self.balances.active.saturating_add(amount);
    }

    /// Yield paid onto stake that is exiting but still earning.
    pub fn accrue_pending_inactive_yield(&mut self, amount: Amount) {
        self.balances.pending_inactive = self.balances.pending_inactive.saturating_add(amount);
    }

    /// External epoch boundary: pending-active starts earning.
    pub fn settle_epoch(&mut self) {
        self.balances.active = self
            .balances
            .active
            .saturating_add(self.balances.pending_active);
        self.balances.pending_active = 0;
    }

    /// External lockup boundary: pending-inactive becomes withdrawable.
    pub fn settle_lockup(&mut self) {
        self.balances.inactive = self
            .balances
            .inactive
            .saturating_add(self.balances.pending_inactive);
        self.balances.pending_inactive = 0;
        self.lockup_expiry += self.lockup_duration;
    }
}

impl StakeLedger for MemStakeLedger {
    fn add(&mut self, amount: Amount) -> PoolResult<()> {
        if self.earning {
            self.balances.pending_active = self
                .balances
                .pending_active
                .checked_add(amount)
                .ok_or(PoolError::Overflow)?;
        } else {
            self.balances.active = self
                .balances
                .active
                .checked_add(amount)
                .ok_or(PoolError::Overflow)?;
        }
        Ok(())
    }

    fn unlock(&mut self, amount: Amount) -> PoolResult<()> {
        if self.balances.active < amount {
            return Err(PoolError::InsufficientBalance {
                have: self.balances.active,
                need: amount,
            });
        }
        self.balances.active -= amount;
        self.balances.pending_inactive += amount;
        Ok(())
    }

    fn reactivate(&mut self, amount: Amount) -> PoolResult<()> {
        if self.balances.pending_inactive < amount {
            return Err(PoolError::InsufficientBalance {
                have: self.balances.pending_inactive,
                need: amount,
            });
        }
        self.balances.pending_inactive -= amount;
        self.balances.active += amount;
        Ok(())
    }

    fn withdraw(&mut self, amount: Amount) -> PoolResult<()> {
        if self.balances.inactive < amount {
            return Err(PoolError::InsufficientBalance {
                have: self.balances.inactive,
                need: amount,
            });
        }
        self.balances.inactive -= amount;
        Ok(())
    }

    fn total_balance(&self) -> StakeBalances {
        self.balances
    }

    fn is_earning(&self) -> bool {
        self.earning
    }

    fn lockup_expiry(&self) -> Timestamp {
        self.lockup_expiry
    }

    fn increase_lockup(&mut self) -> PoolResult<()> {
        self.lockup_expiry += self.lockup_duration;
        Ok(())
    }
}

/// Manually-driven epoch clock
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    epoch: PeriodId,
    time: Timestamp,
}

impl ManualClock {
    pub fn new(epoch: PeriodId, time: Timestamp) -> Self {
        Self { epoch, time }
    }

    pub fn advance_epoch(&mut self) {
        self.epoch += 1;
    }

    pub fn advance_time(&mut self, seconds: Timestamp) {
        self.time += seconds;
    }
}

impl EpochClock for ManualClock {
    fn current_epoch(&self) -> PeriodId {
        self.epoch
    }

    fn now(&self) -> Timestamp {
        self.time
    }
}
