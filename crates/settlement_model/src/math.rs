//! Fixed-point and wide-product math
//!
//! Migration and auction formulas multiply two 18-decimal quantities before
//! dividing, which overflows u128 long before the quotient does. Products are
//! therefore formed in 256 bits and divided back down.

use crate::ModelError;

/// Redemption price at par (1e18 fixed point)
pub const PRICE_ONE: u128 = 1_000_000_000_000_000_000;

/// 256-bit unsigned value as (hi, lo) halves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Wide {
    hi: u128,
    lo: u128,
}

/// Full 256-bit product of two u128 values
fn widening_mul(a: u128, b: u128) -> Wide {
    let a_lo = a as u64 as u128;
    let a_hi = a >> 64;
    let b_lo = b as u64 as u128;
    let b_hi = b >> 64;

    let p0 = a_lo * b_lo;
    let p1 = a_lo * b_hi;
    let p2 = a_hi * b_lo;
    let p3 = a_hi * b_hi;

    // Carries out of the middle limb land in `hi`
    let mid = (p0 >> 64) + (p1 as u64 as u128) + (p2 as u64 as u128);
    let lo = (p0 as u64 as u128) | (mid << 64);
    let hi = p3 + (p1 >> 64) + (p2 >> 64) + (mid >> 64);

    Wide { hi, lo }
}

/// Divide a 256-bit value by a u128, returning (quotient, remainder)
///
/// Fails with `Overflow` when the quotient does not fit in u128.
fn div_rem_wide(n: Wide, d: u128) -> Result<(u128, u128), ModelError> {
    if d == 0 {
        return Err(ModelError::DivisionByZero);
    }
    if n.hi == 0 {
        return Ok((n.lo / d, n.lo % d));
    }
    if n.hi >= d {
        return Err(ModelError::Overflow);
    }

    // Restoring long division over the low limb; rem < d holds between steps
    let mut rem = n.hi;
    let mut quot = 0u128;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((n.lo >> bit) & 1);
        quot <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1;
        }
    }
    Ok((quot, rem))
}

/// floor(a * b / d) without intermediate overflow
#[inline]
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128, ModelError> {
    div_rem_wide(widening_mul(a, b), d).map(|(q, _)| q)
}

/// ceil(a * b / d) without intermediate overflow
#[inline]
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Result<u128, ModelError> {
    let (q, r) = div_rem_wide(widening_mul(a, b), d)?;
    if r == 0 {
        Ok(q)
    } else {
        q.checked_add(1).ok_or(ModelError::Overflow)
    }
}

#[inline]
pub fn add(a: u128, b: u128) -> Result<u128, ModelError> {
    a.checked_add(b).ok_or(ModelError::Overflow)
}

#[inline]
pub fn sub(a: u128, b: u128) -> Result<u128, ModelError> {
    a.checked_sub(b).ok_or(ModelError::Overflow)
}

#[inline]
pub fn mul(a: u128, b: u128) -> Result<u128, ModelError> {
    a.checked_mul(b).ok_or(ModelError::Overflow)
}

/// Value of `amount` units at a fixed-point `price`, rounded down
#[inline]
pub fn value_at_price(amount: u128, price: u128) -> Result<u128, ModelError> {
    mul_div_floor(amount, price, PRICE_ONE)
}

/// Value of `amount` units at a fixed-point `price`, rounded up
#[inline]
pub fn value_at_price_ceil(amount: u128, price: u128) -> Result<u128, ModelError> {
    mul_div_ceil(amount, price, PRICE_ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_widening_mul_max() {
        let w = widening_mul(u128::MAX, u128::MAX);
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        assert_eq!(w.lo, 1);
        assert_eq!(w.hi, u128::MAX - 1);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e21 overflows u128 but the quotient does not
        let a = 1_000_000_000_000_000_000_000_000_000_000u128;
        let b = 1_000_000_000_000_000_000_000u128;
        let d = 1_000_000_000_000_000_000_000_000u128;
        assert_eq!(mul_div_floor(a, b, d).unwrap(), 1_000_000_000_000_000_000_000_000_000);
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_floor(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div_ceil(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_ceil(9, 10, 3).unwrap(), 30);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(ModelError::DivisionByZero));
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, 1), Err(ModelError::Overflow));
        assert_eq!(mul_div_ceil(u128::MAX, 2, 2).unwrap(), u128::MAX);
    }

    #[test]
    fn test_value_at_price() {
        assert_eq!(value_at_price(1_000, PRICE_ONE).unwrap(), 1_000);
        assert_eq!(value_at_price(1_000, PRICE_ONE / 2).unwrap(), 500);
        assert_eq!(value_at_price_ceil(3, PRICE_ONE / 2).unwrap(), 2);
    }

    proptest! {
        #[test]
        fn prop_matches_narrow_math(a in 0u128..u64::MAX as u128, b in 0u128..u64::MAX as u128, d in 1u128..u64::MAX as u128) {
            prop_assert_eq!(mul_div_floor(a, b, d).unwrap(), a * b / d);
            prop_assert_eq!(mul_div_ceil(a, b, d).unwrap(), (a * b + d - 1) / d);
        }

        #[test]
        fn prop_identity_division(a in any::<u128>(), b in 1u128..) {
            prop_assert_eq!(mul_div_floor(a, b, b).unwrap(), a);
        }

        #[test]
        fn prop_floor_le_ceil(a in any::<u64>(), b in any::<u128>(), d in 1u128..) {
            if let (Ok(f), Ok(c)) = (mul_div_floor(a as u128, b, d), mul_div_ceil(a as u128, b, d)) {
                prop_assert!(f <= c);
                prop_assert!(c - f <= 1);
            }
        }
    }
}

// ============================================================================
// Kani Formal Verification Proofs
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Operands narrow enough that `a * b` fits in u128
    fn narrow_operands() -> (u128, u128, u128) {
        let a: u64 = kani::any();
        let b: u64 = kani::any();
        let d: u128 = kani::any();
        kani::assume(d > 0);
        (a as u128, b as u128, d)
    }

    /// Wide mul_div agrees with plain u128 arithmetic when nothing overflows
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_mul_div_floor_matches_narrow() {
        let (a, b, d) = narrow_operands();
        assert!(mul_div_floor(a, b, d) == Ok(a * b / d));
    }

    /// Rounding up never adds more than one unit
    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_ceil_within_one_of_floor() {
        let (a, b, d) = narrow_operands();
        let floor = mul_div_floor(a, b, d).unwrap();
        let ceil = mul_div_ceil(a, b, d).unwrap();
        assert!(floor <= ceil);
        assert!(ceil <= floor + 1);
        assert!((ceil == floor) == (a * b % d == 0));
    }

    #[kani::proof]
    #[kani::unwind(129)]
    fn proof_zero_divisor_rejected() {
        let a: u128 = kani::any();
        let b: u128 = kani::any();
        assert!(mul_div_floor(a, b, 0) == Err(ModelError::DivisionByZero));
        assert!(mul_div_ceil(a, b, 0) == Err(ModelError::DivisionByZero));
    }
}
