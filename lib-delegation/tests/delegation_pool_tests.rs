//! Delegation Pool Lifecycle Tests
//!
//! End-to-end coverage of the public pool operations through the registry:
//! - Pending stake activates at the next period
//! - Over-generous requests clamp instead of erroring
//! - Withdrawal pays out reward settled up to the withdrawal period
//! - Settlement is idempotent within a period
//! - Local counters advance one step per observation, whatever the clock did
//! - Aggregate and per-delegator ledgers conserve exactly

use lib_delegation::{
    Address, ManualClock, MemStakeLedger, NullSink, PoolError, PoolEvent, PoolId, PoolRegistry,
    RecordingSink, StakeLedger,
};

// =============================================================================
// Test Helpers
// =============================================================================

const LOCKUP_DURATION: u64 = 1_000;

fn addr(n: u8) -> Address {
    Address::new([n; 32])
}

fn setup() -> (PoolRegistry, PoolId, MemStakeLedger, ManualClock) {
    let ledger = MemStakeLedger::new(LOCKUP_DURATION, LOCKUP_DURATION);
    let clock = ManualClock::new(100, 0);
    let mut registry = PoolRegistry::new();
    let pool = registry.init_pool(addr(1), &ledger, &clock).unwrap();
    (registry, pool, ledger, clock)
}

// =============================================================================
// Stake Lifecycle
// =============================================================================

#[test]
fn test_pending_stake_activates_after_one_period() {
    let (mut registry, pool, mut ledger, mut clock) = setup();

    registry
        .add_stake(addr(2), pool, 100, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    // mid-period: the stake pends
    let stake = registry.pool(pool).unwrap().delegator_stake(&addr(2));
    assert_eq!(stake.active, 0);
    assert_eq!(stake.pending_active, 100);

    // one external tick + settlement: the stake is active
    clock.advance_epoch();
    ledger.settle_epoch();
    registry
        .restake(addr(2), pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    let stake = registry.pool(pool).unwrap().delegator_stake(&addr(2));
    assert_eq!(stake.active, 100);
    assert_eq!(stake.pending_active, 0);
}

#[test]
fn test_unlock_clamps_to_active_stake() {
    let (mut registry, pool, mut ledger, mut clock) = setup();

    registry
        .add_stake(addr(2), pool, 100, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    clock.advance_epoch();
    ledger.settle_epoch();

    // only 100 is active; the request for 150 caps silently
    registry
        .unlock(addr(2), pool, 150, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    let stake = registry.pool(pool).unwrap().delegator_stake(&addr(2));
    assert_eq!(stake.active, 0);
    assert_eq!(stake.pending_inactive, 100);
    registry.pool(pool).unwrap().check_conservation().unwrap();
}

#[test]
fn test_full_exit_pays_reward_through_resolution() {
    let (mut registry, pool, mut ledger, mut clock) = setup();
    let delegator = addr(2);

    // epoch 1: stake 1000, pending
    registry
        .add_stake(delegator, pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    // epoch 2: stake activates; yield lands but nothing was earning in
    // period 1, so it carries forward
    clock.advance_epoch();
    ledger.settle_epoch();
    ledger.accrue_yield(100);
    registry
        .restake(delegator, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    // epoch 3: 110 more yield; the carried 100 and the new 110 are
    // attributed together over the 1000 earning: ratio 0.21
    clock.advance_epoch();
    ledger.accrue_yield(110);
    registry
        .unlock(delegator, pool, 400, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    let stake = registry.pool(pool).unwrap().delegator_stake(&delegator);
    assert_eq!(stake.active, 810); // 1210 settled - 400 unlocked
    assert_eq!(stake.pending_inactive, 400);

    // epoch 4: 10% yield on both sides; the lockup expires, so the
    // pending 400 earns its last 40 and becomes withdrawable
    ledger.accrue_yield(81);
    ledger.accrue_pending_inactive_yield(40);
    ledger.settle_lockup();
    clock.advance_epoch();
    clock.advance_time(LOCKUP_DURATION);
    registry
        .restake(delegator, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    let stake = registry.pool(pool).unwrap().delegator_stake(&delegator);
    assert_eq!(stake.active, 891); // 810 + 81
    assert_eq!(stake.inactive, 440); // 400 + 40, settled
    assert_eq!(stake.pending_inactive, 0);

    // withdraw everything: the payout includes the reward settled up to
    // the resolution epoch, not a stale earlier view
    registry
        .withdraw(delegator, pool, u128::MAX, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    let stake = registry.pool(pool).unwrap().delegator_stake(&delegator);
    assert_eq!(stake.inactive, 0);
    assert_eq!(ledger.total_balance().inactive, 0);
    assert_eq!(
        registry.pool(pool).unwrap().stats().total_withdrawn,
        440
    );
    registry.pool(pool).unwrap().check_conservation().unwrap();
}

#[test]
fn test_settled_inactive_stops_earning() {
    let (mut registry, pool, mut ledger, mut clock) = setup();
    let delegator = addr(2);

    registry
        .add_stake(delegator, pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    clock.advance_epoch();
    ledger.settle_epoch();
    registry
        .unlock(delegator, pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    // cycle resolves with no yield
    ledger.settle_lockup();
    clock.advance_epoch();
    clock.advance_time(LOCKUP_DURATION);
    registry
        .restake(delegator, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    assert_eq!(
        registry.pool(pool).unwrap().delegator_stake(&delegator).inactive,
        1_000
    );

    // later epochs pay yield to other (active) stake only; the settled
    // inactive balance must not grow
    ledger.accrue_yield(500);
    clock.advance_epoch();
    registry
        .restake(delegator, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    assert_eq!(
        registry.pool(pool).unwrap().delegator_stake(&delegator).inactive,
        1_000
    );
}

// =============================================================================
// Settlement Semantics
// =============================================================================

#[test]
fn test_restake_twice_is_noop_second_time() {
    let (mut registry, pool, mut ledger, mut clock) = setup();

    registry
        .add_stake(addr(2), pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    clock.advance_epoch();
    ledger.settle_epoch();
    ledger.accrue_yield(100);

    registry
        .restake(addr(2), pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    let first = registry.pool(pool).unwrap().delegator_stake(&addr(2));

    registry
        .restake(addr(2), pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    let second = registry.pool(pool).unwrap().delegator_stake(&addr(2));

    assert_eq!(first, second);
}

#[test]
fn test_delayed_delegator_settles_to_same_answer() {
    let (mut registry, pool, mut ledger, mut clock) = setup();
    let (prompt, lazy) = (addr(2), addr(3));

    registry
        .add_stake(prompt, pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    registry
        .add_stake(lazy, pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    clock.advance_epoch();
    ledger.settle_epoch();

    // two epochs of 10% yield on the 2000 earning; `prompt` settles each
    // period, `lazy` not at all
    clock.advance_epoch();
    ledger.accrue_yield(200);
    registry
        .restake(prompt, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    clock.advance_epoch();
    ledger.accrue_yield(220);
    registry
        .restake(prompt, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    // the delayed settlement reconciles to the same balance
    registry
        .restake(lazy, pool, &mut ledger, &clock, &mut NullSink)
        .unwrap();

    let prompt_stake = registry.pool(pool).unwrap().delegator_stake(&prompt);
    let lazy_stake = registry.pool(pool).unwrap().delegator_stake(&lazy);
    assert_eq!(prompt_stake.active, lazy_stake.active);
    registry.pool(pool).unwrap().check_conservation().unwrap();
}

// =============================================================================
// Period Advance
// =============================================================================

#[test]
fn test_one_step_per_observation_despite_clock_jump() {
    let (mut registry, pool, mut ledger, mut clock) = setup();

    // external clock jumps five ticks at once
    for _ in 0..5 {
        clock.advance_epoch();
    }

    assert!(registry
        .end_period(pool, &mut ledger, &clock, &mut NullSink)
        .unwrap());
    assert_eq!(registry.pool(pool).unwrap().journal().reward_epoch(), 2);

    // same observation: no further advance
    assert!(!registry
        .end_period(pool, &mut ledger, &clock, &mut NullSink)
        .unwrap());
    assert_eq!(registry.pool(pool).unwrap().journal().reward_epoch(), 2);

    // the next tick advances one more step
    clock.advance_epoch();
    assert!(registry
        .end_period(pool, &mut ledger, &clock, &mut NullSink)
        .unwrap());
    assert_eq!(registry.pool(pool).unwrap().journal().reward_epoch(), 3);
}

#[test]
fn test_epoch_advance_events() {
    let (mut registry, pool, mut ledger, mut clock) = setup();
    let mut sink = RecordingSink::new();

    registry
        .add_stake(addr(2), pool, 100, &mut ledger, &clock, &mut sink)
        .unwrap();
    clock.advance_epoch();
    registry
        .end_period(pool, &mut ledger, &clock, &mut sink)
        .unwrap();

    assert!(sink.events.iter().any(|e| matches!(
        e,
        PoolEvent::StakeAdded { amount: 100, .. }
    )));
    match sink.epoch_advances().first() {
        Some(PoolEvent::EpochAdvanced {
            reward_epoch,
            lockup_epoch,
            observed_clock,
            ..
        }) => {
            assert_eq!(*reward_epoch, 2);
            assert_eq!(*lockup_epoch, 1);
            assert_eq!(*observed_clock, 101);
        }
        other => panic!("expected an EpochAdvanced event, got {:?}", other),
    }
}

// =============================================================================
// Owner Operations
// =============================================================================

#[test]
fn test_increase_lockup_refreshes_running_lockup() {
    let (mut registry, pool, mut ledger, clock) = setup();

    registry
        .increase_lockup(addr(1), pool, &mut ledger, &clock)
        .unwrap();
    assert_eq!(
        registry.pool(pool).unwrap().journal().last_lock_expiry(),
        2 * LOCKUP_DURATION
    );
}

#[test]
fn test_increase_lockup_after_expiry_leaves_journal() {
    let (mut registry, pool, mut ledger, mut clock) = setup();

    // wall clock already past the recorded expiry
    clock.advance_time(LOCKUP_DURATION);
    registry
        .increase_lockup(addr(1), pool, &mut ledger, &clock)
        .unwrap();
    assert_eq!(
        registry.pool(pool).unwrap().journal().last_lock_expiry(),
        LOCKUP_DURATION
    );
}

#[test]
fn test_owner_gated_operations_reject_non_owner() {
    let (mut registry, pool, mut ledger, clock) = setup();

    assert_eq!(
        registry.set_operator(addr(9), pool, addr(9)),
        Err(PoolError::OwnershipNotFound(addr(9)))
    );
    assert_eq!(
        registry.increase_lockup(addr(9), pool, &mut ledger, &clock),
        Err(PoolError::OwnershipNotFound(addr(9)))
    );

    registry.set_operator(addr(1), pool, addr(5)).unwrap();
    assert_eq!(registry.pool(pool).unwrap().operator(), addr(5));
    registry.set_delegated_voter(addr(1), pool, addr(6)).unwrap();
    assert_eq!(registry.pool(pool).unwrap().voter(), addr(6));
}

#[test]
fn test_operations_on_unknown_pool_fail() {
    let (mut registry, _, mut ledger, clock) = setup();
    let missing = PoolId::new([42u8; 32]);

    assert_eq!(
        registry.add_stake(addr(2), missing, 100, &mut ledger, &clock, &mut NullSink),
        Err(PoolError::PoolNotFound(missing))
    );
}

// =============================================================================
// Conservation
// =============================================================================

#[test]
fn test_conservation_across_mixed_sequences() {
    let (mut registry, pool, mut ledger, mut clock) = setup();
    let delegators = [addr(2), addr(3), addr(4)];

    registry
        .add_stake(delegators[0], pool, 1_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    registry
        .add_stake(delegators[1], pool, 2_000, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    clock.advance_epoch();
    ledger.settle_epoch();
    registry.pool(pool).unwrap().check_conservation().unwrap();

    clock.advance_epoch();
    ledger.accrue_yield(300);
    registry
        .unlock(delegators[0], pool, 500, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    registry
        .add_stake(delegators[2], pool, 750, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    registry.pool(pool).unwrap().check_conservation().unwrap();

    clock.advance_epoch();
    ledger.accrue_yield(275);
    registry
        .reactivate_stake(delegators[0], pool, 200, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    registry
        .unlock(delegators[1], pool, 2_500, &mut ledger, &clock, &mut NullSink)
        .unwrap();
    registry.pool(pool).unwrap().check_conservation().unwrap();

    // resolve the lockup cycle and settle everyone
    ledger.settle_lockup();
    clock.advance_epoch();
    clock.advance_time(LOCKUP_DURATION);
    for delegator in delegators {
        registry
            .restake(delegator, pool, &mut ledger, &clock, &mut NullSink)
            .unwrap();
    }
    registry.pool(pool).unwrap().check_conservation().unwrap();

    // the aggregate view is the slot-by-slot sum of the delegator views
    let pool_ref = registry.pool(pool).unwrap();
    assert_eq!(pool_ref.delegator_count(), 3);
    let total = pool_ref.total_stake();
    let mut summed = [0u128; 4];
    for delegator in delegators {
        let stake = pool_ref.delegator_stake(&delegator);
        summed[0] += stake.active;
        summed[1] += stake.inactive;
        summed[2] += stake.pending_active;
        summed[3] += stake.pending_inactive;
    }
    assert_eq!(
        [total.active, total.inactive, total.pending_active, total.pending_inactive],
        summed
    );
}
