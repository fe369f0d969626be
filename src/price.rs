//! Fixed-point price representation.
//!
//! Prices are exchanged and displayed with 2 decimal places but stored
//! internally as integer hundredths so that matching and VWAP arithmetic
//! never touches floating point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum representable price, in hundredths (0.01).
pub const MIN_PRICE_HUNDREDTHS: u64 = 1;

/// Maximum representable price, in hundredths (999,999.99).
pub const MAX_PRICE_HUNDREDTHS: u64 = 99_999_999;

/// A price expressed as an exact integer count of hundredths (cents).
///
/// `Price(10_000)` represents `100.00`. Ordering, equality and hashing are
/// all exact integer operations, so the order book's price levels never
/// suffer floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Price(u64);

/// Errors that can occur while parsing or validating a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The price was not positive.
    NotPositive,
    /// The price exceeded [`MAX_PRICE_HUNDREDTHS`].
    TooLarge,
    /// The price had more than 2 decimal places.
    TooManyDecimals,
    /// The input could not be parsed as a decimal number.
    Malformed(String),
}

impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::NotPositive => write!(f, "price must be greater than zero"),
            PriceError::TooLarge => write!(f, "price exceeds the maximum of 999999.99"),
            PriceError::TooManyDecimals => {
                write!(f, "price must have at most 2 decimal places")
            }
            PriceError::Malformed(s) => write!(f, "price is not a valid decimal: {s}"),
        }
    }
}

impl std::error::Error for PriceError {}

impl Price {
    /// Builds a `Price` directly from a count of hundredths, validating range.
    pub fn from_hundredths(hundredths: u64) -> Result<Self, PriceError> {
        if hundredths < MIN_PRICE_HUNDREDTHS {
            return Err(PriceError::NotPositive);
        }
        if hundredths > MAX_PRICE_HUNDREDTHS {
            return Err(PriceError::TooLarge);
        }
        Ok(Price(hundredths))
    }

    /// Returns the price as an exact integer count of hundredths.
    pub fn as_hundredths(self) -> u64 {
        self.0
    }

    /// Renders the price as a `"123.45"` decimal string.
    pub fn to_decimal_string(self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }

    /// Parses a decimal string such as `"100.50"` or `"100"` into a `Price`.
    pub fn parse_decimal(s: &str) -> Result<Self, PriceError> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if frac.len() > 2 {
            return Err(PriceError::TooManyDecimals);
        }
        if whole.is_empty() && frac.is_empty() {
            return Err(PriceError::Malformed(s.to_string()));
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| PriceError::Malformed(s.to_string()))?
        };
        let mut frac_digits = frac.to_string();
        while frac_digits.len() < 2 {
            frac_digits.push('0');
        }
        let frac: u64 = if frac_digits.is_empty() {
            0
        } else {
            frac_digits
                .parse()
                .map_err(|_| PriceError::Malformed(s.to_string()))?
        };
        let hundredths = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or(PriceError::TooLarge)?;
        Price::from_hundredths(hundredths)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Price::parse_decimal(s)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl TryFrom<String> for Price {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Price::parse_decimal(&value)
    }
}

impl From<Price> for String {
    fn from(value: Price) -> Self {
        value.to_decimal_string()
    }
}
