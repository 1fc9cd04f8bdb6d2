//! Delegation pool event system.
//!
//! Events are handed to an [`EventSink`] injected into each operation; the
//! crate never writes to global state. Consumers persist or index the
//! events as their audit trail.

use crate::types::{Address, Amount, PeriodId, PoolId, Timestamp};
use serde::{Deserialize, Serialize};

/// Observability events emitted by pool operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    /// A local accounting period advanced. Emitted once per transition:
    /// once when the reward epoch steps, and again (with updated fields)
    /// when the lockup cycle steps in the same call.
    EpochAdvanced {
        reward_epoch: PeriodId,
        lockup_epoch: PeriodId,
        observed_clock: PeriodId,
        lock_expiry: Timestamp,
    },
    /// Stake entered the pool (amount post-clamp)
    StakeAdded {
        pool: PoolId,
        delegator: Address,
        amount: Amount,
    },
    /// Active stake began its exit through the lockup cycle
    StakeUnlocked {
        pool: PoolId,
        delegator: Address,
        amount: Amount,
    },
    /// Pending-inactive stake returned to active
    StakeReactivated {
        pool: PoolId,
        delegator: Address,
        amount: Amount,
    },
    /// Settled inactive stake left the pool
    StakeWithdrawn {
        pool: PoolId,
        delegator: Address,
        amount: Amount,
    },
}

/// Observer for pool events, injected per operation
pub trait EventSink {
    fn emit(&mut self, event: PoolEvent);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: PoolEvent) {}
}

/// Sink that records every event, for tests and development
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<PoolEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of the period-advance kind, in emission order.
    pub fn epoch_advances(&self) -> Vec<&PoolEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, PoolEvent::EpochAdvanced { .. }))
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: PoolEvent) {
        self.events.push(event);
    }
}
