//! Dutch re-capitalization auction curve
//!
//! After the migration window closes, a child universe sells freshly minted
//! REP for ETH until its deficit `D` is raised. The REP offered for the whole
//! deficit rises linearly with elapsed seconds:
//!
//! ```text
//! offered(t) = R/s + (R*s - R/s) * t / duration
//! ```
//!
//! where `R` is the REP basis and `s` the scale factor (1e6 in the reference
//! protocol). A bid of `e` ETH receives `offered(t) * e / D` REP.
//!
//! # Properties
//! - **A1**: `offered` is monotonically non-decreasing in `t`
//! - **A2**: `offered(0) = R/s`, `offered(duration) = R*s`
//! - **A3**: Devalued price never exceeds the pre-settlement price

use crate::math::{add, mul, mul_div_floor, sub};
use crate::ModelError;

/// Auction window state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionPhase {
    /// Migration window still open
    NotStarted,
    /// Running, `elapsed` seconds since start
    Running { elapsed: u64 },
    /// Past the maximum duration
    Expired,
}

pub fn auction_phase(start: u64, duration: u64, now: u64) -> AuctionPhase {
    if now < start {
        AuctionPhase::NotStarted
    } else {
        let elapsed = now - start;
        if elapsed >= duration {
            AuctionPhase::Expired
        } else {
            AuctionPhase::Running { elapsed }
        }
    }
}

/// Elapsed seconds if bids are accepted
pub fn check_bidding(phase: AuctionPhase) -> Result<u64, ModelError> {
    match phase {
        AuctionPhase::NotStarted => Err(ModelError::AuctionNotStarted),
        AuctionPhase::Running { elapsed } => Ok(elapsed),
        AuctionPhase::Expired => Err(ModelError::AuctionExpired),
    }
}

/// REP offered for the full deficit at `elapsed` seconds
pub fn rep_offered(basis: u128, scale: u128, elapsed: u64, duration: u64) -> Result<u128, ModelError> {
    if scale == 0 || duration == 0 {
        return Err(ModelError::DivisionByZero);
    }
    let floor = basis / scale;
    let ceiling = mul(basis, scale)?;
    let span = sub(ceiling, floor)?;
    let elapsed = elapsed.min(duration);
    add(floor, mul_div_floor(span, elapsed as u128, duration as u128)?)
}

/// REP minted for `eth` of a `deficit` at the current offer
pub fn rep_for_eth(offered: u128, eth: u128, deficit: u128) -> Result<u128, ModelError> {
    mul_div_floor(offered, eth, deficit)
}

/// REP-equivalent of an ETH amount at the parent's exchange rate at fork
///
/// Used as the REP basis when no REP migrated into the child.
pub fn rep_equivalent(eth: u128, rep_at_fork: u128, eth_at_fork: u128) -> Result<u128, ModelError> {
    if eth_at_fork == 0 {
        return Ok(eth);
    }
    mul_div_floor(eth, rep_at_fork, eth_at_fork)
}

/// Redemption price after an under-filled auction
///
/// `liabilities` is the ETH value of the universe's Cash at `price`; the
/// unfilled part of the deficit is written off proportionally. With the
/// deficit `D = liabilities - eth_held` and `unfilled = D - raised` this is
/// `price * (liabilities - D + raised) / liabilities`, which is
/// `price * raised / D` when the universe held no ETH of its own.
pub fn devalued_price(price: u128, liabilities: u128, unfilled: u128) -> Result<u128, ModelError> {
    if liabilities == 0 || unfilled == 0 {
        return Ok(price);
    }
    let covered = liabilities.saturating_sub(unfilled);
    mul_div_floor(price, covered, liabilities)
}


// ============================================================================
// Kani Formal Verification Proofs
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;

    fn bounded_curve() -> (u128, u128, u64) {
        let basis: u64 = kani::any();
        let scale: u32 = kani::any();
        let duration: u32 = kani::any();
        kani::assume(scale > 0);
        kani::assume(duration > 0);
        (basis as u128, scale as u128, duration as u64)
    }

    /// The offer starts at `basis / scale` and ends at `basis * scale`
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_rep_offered_endpoints() {
        let (basis, scale, duration) = bounded_curve();
        assert!(rep_offered(basis, scale, 0, duration) == Ok(basis / scale));
        assert!(rep_offered(basis, scale, duration, duration) == Ok(basis * scale));

        let late: u64 = kani::any();
        kani::assume(late >= duration);
        assert!(rep_offered(basis, scale, late, duration) == Ok(basis * scale));
    }

    /// The offer never shrinks as the auction runs
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_rep_offered_monotone() {
        let (basis, scale, duration) = bounded_curve();
        let earlier: u64 = kani::any();
        let later: u64 = kani::any();
        kani::assume(earlier <= later);

        let a = rep_offered(basis, scale, earlier, duration).unwrap();
        let b = rep_offered(basis, scale, later, duration).unwrap();
        assert!(a <= b);
    }

    /// Devaluation never raises the price
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_devalued_price_never_above_price() {
        let price: u64 = kani::any();
        let liabilities: u64 = kani::any();
        let unfilled: u64 = kani::any();

        let devalued = devalued_price(price as u128, liabilities as u128, unfilled as u128).unwrap();
        assert!(devalued <= price as u128);
        if unfilled >= liabilities && liabilities > 0 {
            assert!(devalued == 0);
        }
    }
}
