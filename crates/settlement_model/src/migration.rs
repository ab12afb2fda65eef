//! Proportional migration formulas
//!
//! # Properties
//! - **M1**: ETH moved by a REP migration is `amount * eth / outstanding`
//!   with the denominator read before the burn
//! - **M2**: Sequential migrations never move more than the parent holds
//! - **M3**: Cash-in pays the same pro-rata share as migration would

use crate::math::mul_div_floor;
use crate::ModelError;

/// Migration window state relative to the parent's fork
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    Open,
    Closed,
}

/// Window end (exclusive) for REP migration
#[inline]
pub fn migration_deadline(forked_at: u64, migration_period: u64) -> u64 {
    forked_at.saturating_add(migration_period)
}

pub fn migration_phase(forked_at: u64, migration_period: u64, now: u64) -> MigrationPhase {
    if now < migration_deadline(forked_at, migration_period) {
        MigrationPhase::Open
    } else {
        MigrationPhase::Closed
    }
}

pub fn check_migration_open(phase: MigrationPhase) -> Result<(), ModelError> {
    match phase {
        MigrationPhase::Open => Ok(()),
        MigrationPhase::Closed => Err(ModelError::MigrationWindowClosed),
    }
}

pub fn check_migration_closed(phase: MigrationPhase) -> Result<(), ModelError> {
    match phase {
        MigrationPhase::Open => Err(ModelError::MigrationWindowStillOpen),
        MigrationPhase::Closed => Ok(()),
    }
}

/// REP not yet burned: `supply - burned`
#[inline]
pub fn outstanding_rep(total_supply: u128, burned: u128) -> Result<u128, ModelError> {
    total_supply.checked_sub(burned).ok_or(ModelError::Overflow)
}

/// Parent ETH that follows `amount` REP into a child universe
///
/// `outstanding` is `supply - burned` as of the instant of the call, before
/// this migration's own burn.
pub fn rep_migration_eth(amount: u128, parent_eth: u128, outstanding: u128) -> Result<u128, ModelError> {
    if amount > outstanding {
        return Err(ModelError::Overflow);
    }
    mul_div_floor(amount, parent_eth, outstanding)
}

/// Parent ETH paid out for `balance` REP once the window is closed
#[inline]
pub fn cash_in_payout(balance: u128, parent_eth: u128, outstanding: u128) -> Result<u128, ModelError> {
    rep_migration_eth(balance, parent_eth, outstanding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const E18: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_window_boundary() {
        assert_eq!(migration_phase(100, 50, 149), MigrationPhase::Open);
        assert_eq!(migration_phase(100, 50, 150), MigrationPhase::Closed);
        assert_eq!(check_migration_open(MigrationPhase::Closed), Err(ModelError::MigrationWindowClosed));
        assert_eq!(check_migration_closed(MigrationPhase::Open), Err(ModelError::MigrationWindowStillOpen));
    }

    #[test]
    fn test_half_supply_moves_half_eth() {
        let eth = 3_000 * E18;
        let supply = 1_000_000 * E18;
        assert_eq!(rep_migration_eth(supply / 2, eth, supply).unwrap(), eth / 2);
    }

    #[test]
    fn test_denominator_excludes_prior_burns() {
        // 400 of 1000 already burned; migrating 300 of the remaining 600
        // with 600 ETH left moves 300 ETH.
        let outstanding = outstanding_rep(1_000, 400).unwrap();
        assert_eq!(rep_migration_eth(300, 600, outstanding).unwrap(), 300);
    }

    #[test]
    fn test_rejects_more_than_outstanding() {
        assert_eq!(rep_migration_eth(11, 100, 10), Err(ModelError::Overflow));
        assert_eq!(outstanding_rep(5, 6), Err(ModelError::Overflow));
    }

    proptest! {
        /// Draining the whole outstanding supply in arbitrary chunks
        /// never moves more ETH than the parent held.
        #[test]
        fn prop_sequential_migration_conserves(
            eth in 0u128..1_000_000 * E18,
            chunks in proptest::collection::vec(1u128..1_000 * E18, 1..12),
        ) {
            let supply: u128 = chunks.iter().sum();
            let mut outstanding = supply;
            let mut parent_eth = eth;
            let mut moved = 0u128;
            for c in chunks {
                let out = rep_migration_eth(c, parent_eth, outstanding).unwrap();
                prop_assert!(out <= parent_eth);
                parent_eth -= out;
                outstanding -= c;
                moved += out;
            }
            prop_assert!(moved <= eth);
            prop_assert_eq!(moved + parent_eth, eth);
        }
    }
}

// ============================================================================
// Kani Formal Verification Proofs
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Migrating part of the outstanding REP never moves more than the parent holds
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_rep_migration_bounded_by_parent_eth() {
        let amount: u64 = kani::any();
        let parent_eth: u64 = kani::any();
        let outstanding: u64 = kani::any();
        kani::assume(outstanding > 0);
        kani::assume(amount <= outstanding);

        let eth = rep_migration_eth(amount as u128, parent_eth as u128, outstanding as u128).unwrap();
        assert!(eth <= parent_eth as u128);
        if amount == outstanding {
            assert!(eth == parent_eth as u128);
        }
    }

    /// Asking for more than is outstanding fails instead of overdrawing
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_rep_migration_rejects_excess() {
        let amount: u64 = kani::any();
        let parent_eth: u64 = kani::any();
        let outstanding: u64 = kani::any();
        kani::assume(amount as u128 > outstanding as u128);

        assert!(rep_migration_eth(amount as u128, parent_eth as u128, outstanding as u128).is_err());
    }
}
