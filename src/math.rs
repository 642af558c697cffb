// 2.0: fraction math. every rate and ratio crosses module boundaries as a Fraction,
// never as a float. 2.1 has checked arithmetic, 2.2 square roots, 2.3 ratio reduction.

use crate::types::U256;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MAX_U128: U256 = U256([u64::MAX, u64::MAX, 0, 0]);
pub const MAX_U256: U256 = U256::MAX;
const TWO: U256 = U256([2, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Fraction with zero denominator")]
    ZeroDenominator,
}

/// A non-negative rational `n / d` with `d != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    #[serde(with = "crate::types::serde_u256")]
    pub n: U256,
    #[serde(with = "crate::types::serde_u256")]
    pub d: U256,
}

impl Fraction {
    pub fn new(n: U256, d: U256) -> Result<Self, MathError> {
        if d.is_zero() {
            return Err(MathError::ZeroDenominator);
        }
        Ok(Self { n, d })
    }

    pub fn zero() -> Self {
        Self {
            n: U256::zero(),
            d: U256::one(),
        }
    }

    pub fn one() -> Self {
        Self {
            n: U256::one(),
            d: U256::one(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.n.is_zero()
    }

    pub fn inverse(&self) -> Result<Self, MathError> {
        Self::new(self.d, self.n)
    }

    // n * other.d == other.n * d, without overflowing
    pub fn same_value(&self, other: &Fraction) -> bool {
        match (self.n.checked_mul(other.d), other.n.checked_mul(self.d)) {
            (Some(a), Some(b)) => a == b,
            _ => {
                let (a_n, a_d) = reduced_ratio(self.n, self.d, MAX_U128);
                let (b_n, b_d) = reduced_ratio(other.n, other.d, MAX_U128);
                a_n * b_d == b_n * a_d
            }
        }
    }

    /// Lossy view for reports and logs. None when the value does not fit a Decimal.
    pub fn to_decimal(&self) -> Option<Decimal> {
        // Decimal holds 96 bits of mantissa; 10^27 keeps both sides well inside it
        let cap = U256::exp10(27);
        let (n, d) = reduced_ratio(self.n, self.d, cap);
        if d.is_zero() {
            return None;
        }
        let n = Decimal::from_u128(n.low_u128())?;
        let d = Decimal::from_u128(d.low_u128())?;
        n.checked_div(d)
    }
}

// 2.1: checked arithmetic. an overflow is a failed operation, never a wrapped value.
pub fn mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

pub fn add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn sub(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

pub fn div(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

// a * b / c, floor
pub fn mul_div(a: U256, b: U256, c: U256) -> Result<U256, MathError> {
    div(mul(a, b)?, c)
}

pub fn max(a: U256, b: U256) -> U256 {
    if a > b {
        a
    } else {
        b
    }
}

pub fn min(a: U256, b: U256) -> U256 {
    if a < b {
        a
    } else {
        b
    }
}

// 2.2: newton iteration. starting at num/2 + 1 keeps the first step from overflowing
pub fn floor_sqrt(num: U256) -> U256 {
    if num.is_zero() {
        return U256::zero();
    }
    let mut x = num / TWO + U256::one();
    let mut y = (x + num / x) / TWO;
    while x > y {
        x = y;
        y = (x + num / x) / TWO;
    }
    x
}

pub fn ceil_sqrt(num: U256) -> U256 {
    let x = floor_sqrt(num);
    // x <= 2^128 - 1 so x * x cannot overflow
    if x * x == num {
        x
    } else {
        x + U256::one()
    }
}

// 2.3: scale n/d down until neither side exceeds max_value.
// returns (0, 0) when the scaled denominator vanishes.
pub fn reduced_ratio(n: U256, d: U256, max_value: U256) -> (U256, U256) {
    if n <= max_value && d <= max_value {
        return (n, d);
    }
    if max_value.is_zero() {
        return (U256::zero(), U256::zero());
    }

    let larger = max(n, d);
    let mut factor = larger / max_value;
    if !(larger % max_value).is_zero() {
        factor = factor + U256::one();
    }

    let (new_n, new_d) = (n / factor, d / factor);
    if new_d.is_zero() {
        return (U256::zero(), U256::zero());
    }
    (new_n, new_d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    #[test]
    fn floor_sqrt_small_values() {
        let expected = [0u64, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (x, root) in expected.iter().enumerate() {
            assert_eq!(floor_sqrt(u(x as u64)), u(*root), "floor_sqrt({x})");
        }
    }

    #[test]
    fn ceil_sqrt_small_values() {
        let expected = [0u64, 1, 2, 2, 2, 3, 3, 3, 3, 3, 4];
        for (x, root) in expected.iter().enumerate() {
            assert_eq!(ceil_sqrt(u(x as u64)), u(*root), "ceil_sqrt({x})");
        }
    }

    #[test]
    fn sqrt_of_perfect_squares_is_exact() {
        for root in [1u64, 7, 1_000, 4_294_967_295, u64::MAX] {
            let square = u(root) * u(root);
            assert_eq!(floor_sqrt(square), u(root));
            assert_eq!(ceil_sqrt(square), u(root));
        }
    }

    #[test]
    fn sqrt_of_max_u256() {
        let root = floor_sqrt(MAX_U256);
        assert_eq!(root, MAX_U128);
        assert_eq!(ceil_sqrt(MAX_U256), MAX_U128 + U256::one());
    }

    #[test]
    fn reduced_ratio_passthrough_when_small() {
        assert_eq!(reduced_ratio(u(3), u(7), u(10)), (u(3), u(7)));
        assert_eq!(reduced_ratio(u(10), u(10), u(10)), (u(10), u(10)));
    }

    #[test]
    fn reduced_ratio_scales_by_common_factor() {
        // factor = ceil(1000 / 100) = 10
        assert_eq!(reduced_ratio(u(1000), u(500), u(100)), (u(100), u(50)));
        // factor = ceil(150 / 100) = 2
        assert_eq!(reduced_ratio(u(150), u(30), u(100)), (u(75), u(15)));
    }

    #[test]
    fn reduced_ratio_degenerate_denominator() {
        // denominator disappears after scaling
        assert_eq!(reduced_ratio(u(1_000_000), u(3), u(100)), (U256::zero(), U256::zero()));
        // numerator disappearing is fine, the ratio is just zero
        assert_eq!(reduced_ratio(u(3), u(1_000_000), u(100)), (U256::zero(), u(100)));
        assert_eq!(reduced_ratio(u(5), u(500), U256::zero()), (U256::zero(), U256::zero()));
    }

    #[test]
    fn checked_ops_report_errors() {
        assert_eq!(mul(MAX_U256, u(2)), Err(MathError::Overflow));
        assert_eq!(add(MAX_U256, u(1)), Err(MathError::Overflow));
        assert_eq!(sub(u(1), u(2)), Err(MathError::Underflow));
        assert_eq!(div(u(1), U256::zero()), Err(MathError::DivisionByZero));
        assert_eq!(mul_div(u(10), u(3), u(4)), Ok(u(7)));
    }

    #[test]
    fn fraction_rejects_zero_denominator() {
        assert_eq!(Fraction::new(u(1), U256::zero()), Err(MathError::ZeroDenominator));
        assert!(Fraction::zero().is_zero());
        assert_eq!(Fraction::new(u(2), u(3)).unwrap().inverse().unwrap(), Fraction::new(u(3), u(2)).unwrap());
    }

    #[test]
    fn fraction_same_value() {
        let a = Fraction::new(u(1), u(2)).unwrap();
        let b = Fraction::new(u(500), u(1000)).unwrap();
        assert!(a.same_value(&b));
        assert!(!a.same_value(&Fraction::one()));
    }

    #[test]
    fn fraction_to_decimal() {
        let half = Fraction::new(u(1), u(2)).unwrap();
        assert_eq!(half.to_decimal(), Some(dec!(0.5)));

        let huge = Fraction::new(MAX_U256, MAX_U256 / 4).unwrap();
        let value = huge.to_decimal().unwrap();
        assert!(value > dec!(3.99) && value < dec!(4.01));
    }
}
