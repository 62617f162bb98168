//! Deterministic fixed-point arithmetic.
//!
//! [`Fixed`] is a Q48.16 signed fixed-point scalar backed by `i64`.
//! All game-state math runs on it so that every peer, regardless of
//! platform or compiler flags, computes bit-identical results. The
//! per-tick delta time handed to systems is a `Fixed` constant derived
//! from the configured tick interval, never a wall-clock float.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// Raw representation of 1.0.
const ONE_RAW: i64 = 1 << FRAC_BITS;

/// Q48.16 fixed-point scalar.
///
/// Multiplication and division widen to `i128` internally, so products
/// of in-range values never wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fixed(i64);

impl Fixed {
    /// Zero.
    pub const ZERO: Fixed = Fixed(0);
    /// One.
    pub const ONE: Fixed = Fixed(ONE_RAW);

    /// Construct from an integer value.
    pub const fn from_int(v: i64) -> Fixed {
        Fixed(v << FRAC_BITS)
    }

    /// Construct from a raw Q48.16 bit pattern.
    pub const fn from_raw(raw: i64) -> Fixed {
        Fixed(raw)
    }

    /// Construct the fractional value `num / den`.
    pub const fn from_ratio(num: i64, den: i64) -> Fixed {
        Fixed((num << FRAC_BITS) / den)
    }

    /// A duration in milliseconds expressed in seconds.
    pub const fn from_millis(ms: u64) -> Fixed {
        Fixed::from_ratio(ms as i64, 1000)
    }

    /// The raw Q48.16 bit pattern. Stable across platforms, suitable
    /// for hashing and serialization.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Truncate toward zero to an integer.
    pub const fn to_int(self) -> i64 {
        self.0 / ONE_RAW
    }

    /// Absolute value.
    pub const fn abs(self) -> Fixed {
        Fixed(self.0.abs())
    }
}

impl Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 += rhs.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Fixed) {
        self.0 -= rhs.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i128 * rhs.0 as i128) >> FRAC_BITS) as i64)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    fn div(self, rhs: Fixed) -> Fixed {
        Fixed((((self.0 as i128) << FRAC_BITS) / rhs.0 as i128) as i64)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render with 4 decimal places, enough to distinguish any
        // two raw values in logs without implying float precision.
        let int = self.0 >> FRAC_BITS;
        let frac = (self.0 & (ONE_RAW - 1)) as u64 * 10_000 / ONE_RAW as u64;
        write!(f, "{int}.{frac:04}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integer_roundtrip() {
        assert_eq!(Fixed::from_int(10).to_int(), 10);
        assert_eq!(Fixed::from_int(-3).to_int(), -3);
        assert_eq!(Fixed::ZERO.to_int(), 0);
    }

    #[test]
    fn mul_and_div() {
        assert_eq!(Fixed::from_int(3) * Fixed::from_int(4), Fixed::from_int(12));
        assert_eq!(Fixed::from_int(10) / Fixed::from_int(2), Fixed::from_int(5));
        assert_eq!(Fixed::from_ratio(1, 2) * Fixed::from_int(8), Fixed::from_int(4));
    }

    #[test]
    fn from_millis_is_seconds() {
        // 33 ms -> 0.033 s, truncated in Q48.16.
        let dt = Fixed::from_millis(33);
        assert_eq!(dt.raw(), (33 << FRAC_BITS) / 1000);
        assert_eq!(Fixed::from_millis(1000), Fixed::ONE);
    }

    #[test]
    fn display_renders_fraction() {
        assert_eq!(Fixed::from_ratio(1, 2).to_string(), "0.5000");
        assert_eq!(Fixed::from_int(2).to_string(), "2.0000");
    }

    proptest! {
        #[test]
        fn add_commutes(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let (a, b) = (Fixed::from_raw(a), Fixed::from_raw(b));
            prop_assert_eq!(a + b, b + a);
        }

        #[test]
        fn mul_by_one_is_identity(raw in -1_000_000_000i64..1_000_000_000) {
            let v = Fixed::from_raw(raw);
            prop_assert_eq!(v * Fixed::ONE, v);
        }

        #[test]
        fn sub_is_add_neg(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let (a, b) = (Fixed::from_raw(a), Fixed::from_raw(b));
            prop_assert_eq!(a - b, a + (-b));
        }
    }
}
