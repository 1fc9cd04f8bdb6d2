//! Delegated-Staking Accounting Core
//!
//! This crate tracks how much value each delegator has committed to a
//! shared stake pool, how that value migrates between earning and exiting
//! states across epochs and lockup cycles, and how externally-produced
//! yield is attributed back to delegators in proportion to their
//! time-weighted contribution.
//!
//! Custody, token transfer, and the epoch clock itself live behind the
//! collaborator traits in [`interface`]; this crate is pure accounting
//! state, strictly serial and atomic per operation.
//!
//! # Key Types
//!
//! - [`DelegationPool`]: per-pool orchestrator implementing the public
//!   staking operations
//! - [`PoolRegistry`]: owner-indexed pool creation and lookup
//! - [`DeferredDeposit`]: two-slot lazily-renewing balance
//! - [`EpochJournal`]: epoch/lockup-cycle state machine
//! - [`RewardLedger`]: cumulative reward-ratio table
//!
//! # Execution
//!
//! Every mutating operation settles outstanding rewards (`restake`) before
//! applying its own balance delta; the per-delegator ledgers and the
//! pool-wide aggregate ledger stay in exact lock-step at all times.

pub mod delegation;
pub mod deposit;
pub mod errors;
pub mod events;
pub mod interface;
pub mod journal;
pub mod pool;
pub mod ratio;
pub mod registry;
pub mod rewards;
pub mod types;

pub use delegation::Delegation;
pub use deposit::DeferredDeposit;
pub use errors::{PoolError, PoolResult};
pub use events::{EventSink, NullSink, PoolEvent, RecordingSink};
pub use interface::{EpochClock, ManualClock, MemStakeLedger, StakeLedger};
pub use journal::EpochJournal;
pub use pool::DelegationPool;
pub use ratio::{FixedRatio, RATIO_SCALE};
pub use registry::PoolRegistry;
pub use rewards::RewardLedger;
pub use types::{Address, Amount, PeriodId, PoolId, PoolStats, StakeBalances, Timestamp};
