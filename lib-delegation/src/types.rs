//! Canonical primitive types for delegation accounting state.
//!
//! Rule: No String identifiers in consensus state. Ever.
//!
//! All state that crosses a serialization boundary is built from these
//! types. They are fixed-size, deterministically serializable, and cheap
//! to copy and compare.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Token amounts in minimal units (supports up to ~340 undecillion units)
pub type Amount = u128;

/// Accounting period index: a reward-epoch or a lockup-cycle counter.
/// Both counters start at 1.
pub type PeriodId = u64;

/// External wall-clock time in seconds
pub type Timestamp = u64;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 32-byte delegator/owner address
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// 32-byte pool identifier, derived deterministically from the owner
/// address and a registry sequence number at pool creation.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct PoolId(pub [u8; 32]);

impl PoolId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a pool id from its owner and a monotone registry sequence.
    ///
    /// The first 8 bytes carry the sequence (big-endian), the remainder is
    /// taken from the owner address. An owner holds at most one pool, so
    /// the pair is unique.
    pub fn derive(owner: &Address, seq: u64) -> Self {
        let mut id = [0u8; 32];
        id[..8].copy_from_slice(&seq.to_be_bytes());
        id[8..].copy_from_slice(&owner.0[..24]);
        Self(id)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ============================================================================
// EXTERNAL BALANCE BREAKDOWN
// ============================================================================

/// Balance breakdown reported by the external stake ledger.
///
/// `pending_active` is stake deposited but not yet earning;
/// `pending_inactive` is stake unlocked but not yet past its lockup cycle
/// (still earning until the cycle resolves).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeBalances {
    pub active: Amount,
    pub inactive: Amount,
    pub pending_active: Amount,
    pub pending_inactive: Amount,
}

impl StakeBalances {
    /// Total value held by the custody account across all four states.
    pub fn total(&self) -> Amount {
        self.active
            .saturating_add(self.inactive)
            .saturating_add(self.pending_active)
            .saturating_add(self.pending_inactive)
    }
}

// ============================================================================
// POOL STATISTICS
// ============================================================================

/// Operation counters tracked per pool for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Total value ever added through `add_stake`
    pub total_staked: Amount,
    /// Total value ever moved out of active through `unlock`
    pub total_unlocked: Amount,
    /// Total value ever moved back to active through `reactivate_stake`
    pub total_reactivated: Amount,
    /// Total value ever withdrawn
    pub total_withdrawn: Amount,
    /// Number of reward epochs closed by this pool
    pub periods_closed: u64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stake(&mut self, amount: Amount) {
        self.total_staked = self.total_staked.saturating_add(amount);
    }

    pub fn record_unlock(&mut self, amount: Amount) {
        self.total_unlocked = self.total_unlocked.saturating_add(amount);
    }

    pub fn record_reactivate(&mut self, amount: Amount) {
        self.total_reactivated = self.total_reactivated.saturating_add(amount);
    }

    pub fn record_withdraw(&mut self, amount: Amount) {
        self.total_withdrawn = self.total_withdrawn.saturating_add(amount);
    }

    pub fn record_period_closed(&mut self) {
        self.periods_closed += 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================
