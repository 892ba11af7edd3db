//! # Money Module
//!
//! Provides the `Money` type for monetary values.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices arrive from the backend in the smallest currency unit.          │
//! │                                                                         │
//! │    FCFA (XOF/XAF): 0 decimals → 1 500 FCFA is stored as 1500           │
//! │    EUR:            2 decimals → 12,50 € is stored as 1250              │
//! │                                                                         │
//! │  All cart arithmetic stays in i64. Formatting (decimals, symbol,        │
//! │  thousands separator) is a display concern of the app config.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caisse_core::money::Money;
//!
//! let carton = Money::from_minor(12_000);
//! let line = carton * 3;
//! assert_eq!(line.minor(), 36_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: allows negative values for discounts and refunds
/// - **Newtype**: serialized as a bare integer, matching the backend
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::money::Money;
    ///
    /// let price = Money::from_minor(1_500);
    /// assert_eq!(price.minor(), 1_500);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::money::Money;
    ///
    /// let plaquette = Money::from_minor(850);
    /// assert_eq!(plaquette.multiply_quantity(4).minor(), 3_400);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half-up.
    ///
    /// 1 basis point = 0.01%, so 1000 bps = 10%.
    pub fn percentage_of(&self, bps: u32) -> Money {
        // i128 keeps large wholesale totals from overflowing
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(part as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(10_000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).minor(), 9_000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        *self - self.percentage_of(discount_bps)
    }

    /// Rounds up to the next multiple of `step` (used for cash suggestions).
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(3_750).round_up_to(1_000).minor(), 4_000);
    /// assert_eq!(Money::from_minor(4_000).round_up_to(1_000).minor(), 4_000);
    /// ```
    pub fn round_up_to(&self, step: i64) -> Money {
        if step <= 0 || self.0 <= 0 {
            return *self;
        }
        let rem = self.0 % step;
        if rem == 0 {
            *self
        } else {
            Money(self.0 + step - rem)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain integer display, for logs. The app config owns user-facing formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
