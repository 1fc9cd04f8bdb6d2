//! Delegation Pool Errors

use crate::types::{Address, Amount, PeriodId, PoolId};
use thiserror::Error;

/// Error during delegation pool operations
///
/// Two classes share this enum. The arithmetic/ledger variants
/// (`InsufficientBalance`, `InvalidInterval`, `PeriodNotRecorded`,
/// `Overflow`, `ConservationViolated`) signal logic defects: with the
/// settle-before-mutate protocol they are never produced by valid external
/// input, and callers should treat them as aborting. The lookup variants
/// (`PoolNotFound`, `OwnershipNotFound`, `AlreadyExists`) are ordinary
/// recoverable failures surfaced to the caller with no state mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Invalid reward interval: begin {begin} > end {end}")]
    InvalidInterval { begin: PeriodId, end: PeriodId },

    #[error("No cumulative ratio recorded for period {0}")]
    PeriodNotRecorded(PeriodId),

    #[error("Cumulative ratio already recorded for period {0}")]
    PeriodAlreadyRecorded(PeriodId),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Conservation invariant violated: {0}")]
    ConservationViolated(String),

    #[error("Pool not found: {0:?}")]
    PoolNotFound(PoolId),

    #[error("No pool ownership recorded for {0:?}")]
    OwnershipNotFound(Address),

    #[error("Pool already exists for owner {0:?}")]
    AlreadyExists(Address),
}

/// Result type for delegation pool operations
pub type PoolResult<T> = Result<T, PoolError>;
