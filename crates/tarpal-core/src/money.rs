//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A balance of 0.000000001 would read as "Partially Paid" forever.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer paise                                            │
//! │    ₹300.00 = 30000 paise, balances compare exactly against zero         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Order math only ever adds, subtracts, and multiplies by a quantity, so
//! no rounding step exists anywhere in totals, discounts, or payments.
//!
//! ## Usage
//! ```rust
//! use tarpal_core::money::Money;
//!
//! let unit = Money::from_cents(10_000); // ₹100.00
//! let line = unit.multiply_quantity(3);
//! assert_eq!(line.cents(), 30_000);
//! assert_eq!(line.to_string(), "₹300.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: a balance can be negative when overpayment is allowed
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ```text
/// Product.price_retail_cents ──► OrderItem.unit_price ──► OrderItem.total
///                                                              │
///                                  Order.total_amount ◄────────┘
///                                        │
///                              − discount = net_payable
///                                        │
///                              − amount_paid = balance_remaining
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from the smallest currency unit.
    ///
    /// ```rust
    /// use tarpal_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // ₹10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ```rust
    /// use tarpal_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(300).cents(), 30_000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in the smallest currency unit.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use tarpal_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(8_550);
    /// assert_eq!(unit_price.multiply_quantity(4).cents(), 34_200);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Checked addition. `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Checked [`Money::multiply_quantity`]. `None` on overflow.
    ///
    /// ```rust
    /// use tarpal_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(250).checked_multiply_quantity(4), Some(Money::from_cents(1_000)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns the smaller of two amounts.
    ///
    /// Used to cap a payment at what is owed:
    /// ```rust
    /// use tarpal_core::money::Money;
    ///
    /// let owed = Money::from_major(300);
    /// let offered = Money::from_major(500);
    /// assert_eq!(offered.at_most(owed), owed);
    /// ```
    #[inline]
    pub fn at_most(self, cap: Money) -> Money {
        if self.0 > cap.0 {
            cap
        } else {
            self
        }
    }

    /// Returns the amount, or zero when negative.
    #[inline]
    pub fn non_negative(self) -> Money {
        if self.0 < 0 {
            Money::zero()
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable rupee amount. The admin dashboard does its own
/// localized formatting; this is for logs and confirmation messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(30_000).to_string(), "₹300.00");
        assert_eq!(Money::from_cents(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let mut running = Money::zero();
        running += a;
        running -= b;
        assert_eq!(running, b);
    }

    #[test]
    fn test_at_most_and_non_negative() {
        let owed = Money::from_cents(300);
        assert_eq!(Money::from_cents(500).at_most(owed), owed);
        assert_eq!(Money::from_cents(100).at_most(owed).cents(), 100);
        assert_eq!(Money::from_cents(-20).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(20).non_negative().cents(), 20);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 1000);
    }
}
