//! Pool registry: explicit ownership of per-owner delegation pools.
//!
//! Pools are held in an explicit map indexed by pool id, with a second
//! index from owner to pool; there is no implicit storage-at-an-address
//! primitive. Each owner holds at most one pool, and the pool object is
//! the exclusive handle that drives its custody ledger.

use crate::errors::{PoolError, PoolResult};
use crate::events::EventSink;
use crate::interface::{EpochClock, StakeLedger};
use crate::pool::DelegationPool;
use crate::types::{Address, Amount, PoolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry of delegation pools.
///
/// Uses BTreeMap for deterministic serialization (consensus-critical).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRegistry {
    /// All pools indexed by id
    pools: BTreeMap<PoolId, DelegationPool>,
    /// Index: owner -> their pool (at most one per owner)
    owners: BTreeMap<Address, PoolId>,
    /// Counter for deterministic pool id derivation (monotone)
    next_seq: u64,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
            owners: BTreeMap::new(),
            next_seq: 1,
        }
    }

    /// Create a pool for `owner`, anchored on the custody account the
    /// caller established externally.
    ///
    /// # Errors
    /// `AlreadyExists` if the owner already has a pool.
    pub fn init_pool(
        &mut self,
        owner: Address,
        ledger: &dyn StakeLedger,
        clock: &dyn EpochClock,
    ) -> PoolResult<PoolId> {
        if self.owners.contains_key(&owner) {
            return Err(PoolError::AlreadyExists(owner));
        }

        let id = PoolId::derive(&owner, self.next_seq);
        self.next_seq += 1;

        let pool = DelegationPool::new(
            id,
            owner,
            clock.current_epoch(),
            ledger.lockup_expiry(),
            ledger.total_balance().total(),
        );
        self.pools.insert(id, pool);
        self.owners.insert(owner, id);

        tracing::info!("Pool registry: created pool {:?} for owner {:?}", id, owner);
        Ok(id)
    }

    pub fn pool(&self, id: PoolId) -> PoolResult<&DelegationPool> {
        self.pools.get(&id).ok_or(PoolError::PoolNotFound(id))
    }

    pub fn pool_mut(&mut self, id: PoolId) -> PoolResult<&mut DelegationPool> {
        self.pools.get_mut(&id).ok_or(PoolError::PoolNotFound(id))
    }

    /// The pool owned by `owner`.
    ///
    /// # Errors
    /// `OwnershipNotFound` if the owner holds no pool.
    pub fn pool_of_owner(&self, owner: Address) -> PoolResult<PoolId> {
        self.owners
            .get(&owner)
            .copied()
            .ok_or(PoolError::OwnershipNotFound(owner))
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    // ─── Delegator-Facing Operations ────────────────────────────────────

    pub fn add_stake(
        &mut self,
        delegator: Address,
        pool: PoolId,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?
            .add_stake(delegator, amount, ledger, clock, sink)
    }

    pub fn unlock(
        &mut self,
        delegator: Address,
        pool: PoolId,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?
            .unlock(delegator, amount, ledger, clock, sink)
    }

    pub fn reactivate_stake(
        &mut self,
        delegator: Address,
        pool: PoolId,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?
            .reactivate_stake(delegator, amount, ledger, clock, sink)
    }

    pub fn withdraw(
        &mut self,
        delegator: Address,
        pool: PoolId,
        amount: Amount,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?
            .withdraw(delegator, amount, ledger, clock, sink)
    }

    pub fn restake(
        &mut self,
        delegator: Address,
        pool: PoolId,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?.restake(delegator, ledger, clock, sink)
    }

    pub fn end_period(
        &mut self,
        pool: PoolId,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
        sink: &mut dyn EventSink,
    ) -> PoolResult<bool> {
        self.pool_mut(pool)?.end_period(ledger, clock, sink)
    }

    // ─── Owner Operations ───────────────────────────────────────────────

    pub fn increase_lockup(
        &mut self,
        owner: Address,
        pool: PoolId,
        ledger: &mut dyn StakeLedger,
        clock: &dyn EpochClock,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?.increase_lockup(owner, ledger, clock)
    }

    pub fn set_operator(
        &mut self,
        owner: Address,
        pool: PoolId,
        new_operator: Address,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?.set_operator(owner, new_operator)
    }

    pub fn set_delegated_voter(
        &mut self,
        owner: Address,
        pool: PoolId,
        new_voter: Address,
    ) -> PoolResult<()> {
        self.pool_mut(pool)?.set_delegated_voter(owner, new_voter)
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
