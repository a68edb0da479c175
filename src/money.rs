//! Fixed-precision monetary amounts.
//!
//! All amounts in this system are non-negative integers in the
//! smallest indivisible unit of the national currency.
//! There is no fractional-unit arithmetic and no multi-currency
//! support — both are explicit non-goals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A non-negative amount in the smallest indivisible currency unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Constructs a `Money` value, rejecting negative input.
    pub fn new(value: i64) -> Option<Money> {
        if value < 0 {
            None
        } else {
            Some(Money(value))
        }
    }

    /// Constructs a `Money` value from a trusted raw column, without
    /// rejecting negative input.
    ///
    /// Every monetary domain field is non-negative by construction
    /// (amounts go through `new` at the trust boundary instead), with
    /// one exception: a fund's `current_balance`/`balance_after` can
    /// go negative when a post is flagged `allow_overdraw`, and must
    /// round-trip through storage as the true signed value rather than
    /// being clamped back to zero. Prefer `new` at trust boundaries;
    /// use `from_raw` only to reload a value this crate already wrote.
    pub fn from_raw(value: i64) -> Money {
        Money(value)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        let diff = self.0 - rhs.0;
        Money::new(diff)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

/// Banker's rounding (round-half-to-even) for the statutory 10% tithe
/// calculation.
///
/// `numerator` and `denominator` describe the fraction to round to the
/// nearest whole unit; for the tithe this is called as
/// `round_half_even(diezmos * 10, 100)`.
pub fn round_half_even(numerator: i64, denominator: i64) -> i64 {
    assert!(denominator > 0, "denominator must be positive");
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice_remainder = remainder * 2;

    if twice_remainder.abs() < denominator {
        quotient
    } else if twice_remainder.abs() > denominator {
        quotient + remainder.signum()
    } else {
        // Exactly halfway: round to even.
        if quotient % 2 == 0 {
            quotient
        } else {
            quotient + remainder.signum()
        }
    }
}

/// `round(0.10 * diezmos)` using banker's rounding, per the
/// `fondo_nacional` formula.
pub fn tithe(diezmos: Money) -> Money {
    Money::from_raw(round_half_even(diezmos.as_i64(), 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_construction() {
        assert!(Money::new(-1).is_none());
        assert_eq!(Money::new(0), Some(Money::ZERO));
    }

    #[test]
    fn sub_trait_is_signed_while_checked_sub_enforces_the_floor() {
        let a = Money::new(50).unwrap();
        let b = Money::new(80).unwrap();
        assert_eq!((a - b).as_i64(), -30);
        assert!((a - b).is_negative());
        assert_eq!(a.checked_sub(b), None);
    }

    #[test]
    fn tithe_uses_banker_rounding() {
        // 1_000_000 / 10 = 100_000 exactly, no rounding ambiguity.
        assert_eq!(tithe(Money::new(1_000_000).unwrap()).as_i64(), 100_000);
        // 25 / 10 = 2.5 -> rounds to even (2).
        assert_eq!(round_half_even(25, 10), 2);
        // 15 / 10 = 1.5 -> rounds to even (2).
        assert_eq!(round_half_even(15, 10), 2);
        // 5 / 10 = 0.5 -> rounds to even (0).
        assert_eq!(round_half_even(5, 10), 0);
    }

    #[test]
    fn sum_over_iterator() {
        let values = vec![
            Money::new(100).unwrap(),
            Money::new(200).unwrap(),
            Money::new(300).unwrap(),
        ];
        let total: Money = values.into_iter().sum();
        assert_eq!(total.as_i64(), 600);
    }
}
