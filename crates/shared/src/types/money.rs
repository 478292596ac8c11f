//! Minor-unit money arithmetic.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts cross the API boundary as `rust_decimal::Decimal` and are
//! accumulated internally as integer cents.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Number of fractional digits carried by a display amount.
pub const DISPLAY_SCALE: u32 = 2;

/// Errors converting between display amounts and cents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The amount has more precision than one cent.
    #[error("Amount {0} has sub-cent precision")]
    SubCent(Decimal),

    /// The amount or a running sum does not fit in 64-bit cents.
    #[error("Amount overflows the supported range")]
    Overflow,
}

/// A signed amount in minor units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a raw cent count.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Converts a display amount into cents.
    ///
    /// Trailing zeros are ignored, so `10.500` is accepted as `1050` cents.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::SubCent` when the amount has a non-zero digit past
    /// the second decimal place, `MoneyError::Overflow` when it does not fit.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        let scaled = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::Overflow)?;
        if !scaled.fract().is_zero() {
            return Err(MoneyError::SubCent(amount));
        }
        scaled.to_i64().map(Self).ok_or(MoneyError::Overflow)
    }

    /// Converts back to a display amount with two decimal places.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, DISPLAY_SCALE)
    }

    /// Returns the raw cent count.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the sum does not fit.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0.checked_add(other.0).map(Self).ok_or(MoneyError::Overflow)
    }

    /// Subtracts `other` from `self`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the difference does not fit.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.0.checked_sub(other.0).map(Self).ok_or(MoneyError::Overflow)
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}
