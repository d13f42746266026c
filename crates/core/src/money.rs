//! Fixed-point monetary amounts.
//!
//! Amounts are stored in minor currency units (e.g. cents). Floating point is
//! never used for money.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A monetary amount in minor currency units.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Amount from minor units (cents).
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Amount from whole major units (e.g. `from_major(10)` is 10.00).
    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Line-item subtotal: unit price times quantity.
    ///
    /// Plain `i64` arithmetic. The validation layer bounds unit prices
    /// (catalog ceiling) and quantities (cart ceiling), so the product stays
    /// orders of magnitude below `i64::MAX`.
    pub const fn times(self, quantity: u32) -> Money {
        Money(self.0 * quantity as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_is_unit_price_times_quantity() {
        let price = Money::from_major(10);
        assert_eq!(price.times(2), Money::from_minor(2000));
    }

    #[test]
    fn sum_over_items() {
        let total: Money = [Money::from_minor(150), Money::from_minor(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_major(4));
    }

    #[test]
    fn display_is_fixed_point() {
        assert_eq!(Money::from_minor(2000).to_string(), "20.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-130).to_string(), "-1.30");
    }
}
