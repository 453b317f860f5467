//! Non-negative decimal prices.
//!
//! Prices are stored as `NUMERIC(10, 2)` and always carry exactly two decimal
//! places once parsed. Arithmetic stays in [`Decimal`] so cart totals never
//! pick up floating-point error.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input was empty.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The value is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The value does not fit in `NUMERIC(10, 2)`.
    #[error("price must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A non-negative monetary amount with two decimal places.
///
/// ```
/// use bazaar_core::Price;
///
/// let price: Price = "1234.5".parse().unwrap();
/// assert_eq!(price.to_string(), "1234.50");
/// assert_eq!(price.display(), "1 234,50 ₽");
/// assert!("-1".parse::<Price>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Number of fractional digits stored.
    pub const SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// The amount is rounded half-away-from-zero to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero and
    /// `PriceError::TooLarge` for amounts with more than eight integer digits.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let amount = if amount.is_zero() { Decimal::ZERO } else { amount };
        let mut rounded =
            amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::SCALE);
        let max = Self::max_exclusive();
        if rounded >= max {
            return Err(PriceError::TooLarge { max });
        }
        Ok(Self(rounded))
    }

    /// Create a price from whole cents.
    ///
    /// # Errors
    ///
    /// Same as [`Price::new`].
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity (line total).
    ///
    /// Line totals may exceed the storage bound of a single price, so the
    /// result is a plain [`Decimal`].
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }

    /// Human-readable ruble amount: `1 234,50 ₽`.
    #[must_use]
    pub fn display(&self) -> String {
        format_rubles(self.0)
    }

    fn max_exclusive() -> Decimal {
        Decimal::new(100_000_000, 0)
    }
}

/// Format any decimal amount the way prices are shown to shoppers.
///
/// Thousands are grouped with spaces and the decimal separator is a comma.
#[must_use]
pub fn format_rubles(amount: Decimal) -> String {
    let mut rounded =
        amount.round_dp_with_strategy(Price::SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(Price::SCALE);
    let text = rounded.abs().to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = whole.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(*c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped},{frac} ₽")
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    /// Accepts both `.` and `,` as the decimal separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }
        let normalized = trimmed.replace(',', ".");
        let amount = Decimal::from_str(&normalized).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Sum<Self> for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rounds_to_two_places() {
        let price: Price = "19.999".parse().unwrap();
        assert_eq!(price.to_string(), "20.00");
        let price: Price = "5".parse().unwrap();
        assert_eq!(price.to_string(), "5.00");
    }

    #[test]
    fn test_parse_accepts_comma_separator() {
        let price: Price = "12,75".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(1275, 2));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
        assert_eq!("abc".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!("-0.01".parse::<Price>(), Err(PriceError::Negative));
        assert!(matches!(
            "100000000".parse::<Price>(),
            Err(PriceError::TooLarge { .. })
        ));
        // Rounds up past the bound.
        assert!(matches!(
            "99999999.995".parse::<Price>(),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_largest_price_fits_numeric_10_2() {
        let price: Price = "99999999.994".parse().unwrap();
        assert_eq!(price.to_string(), "99999999.99");
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn test_sql_type_is_numeric() {
        use sqlx::TypeInfo;

        let info = <Price as sqlx::Type<sqlx::Postgres>>::type_info();
        assert_eq!(info.name(), "NUMERIC");
        assert!(<Price as sqlx::Type<sqlx::Postgres>>::compatible(&info));
    }

    #[test]
    fn test_zero_is_allowed() {
        assert_eq!("0".parse::<Price>().unwrap(), Price::ZERO);
        assert_eq!("-0".parse::<Price>().unwrap().to_string(), "0.00");
    }

    #[test]
    fn test_times() {
        let price = Price::from_cents(1999).unwrap();
        assert_eq!(price.times(3), Decimal::new(5997, 2));
        assert_eq!(price.times(0), Decimal::ZERO);
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_cents(0).unwrap().display(), "0,00 ₽");
        assert_eq!(Price::from_cents(99_950).unwrap().display(), "999,50 ₽");
        assert_eq!(Price::from_cents(123_456).unwrap().display(), "1 234,56 ₽");
        assert_eq!(
            Price::from_cents(1_234_567_800).unwrap().display(),
            "12 345 678,00 ₽"
        );
    }

    #[test]
    fn test_format_rubles_negative() {
        assert_eq!(format_rubles(Decimal::new(-150_000, 2)), "-1 500,00 ₽");
    }

    #[test]
    fn test_serde_roundtrip_rejects_negative() {
        let json = serde_json::to_string(&Price::from_cents(250).unwrap()).unwrap();
        assert_eq!(json, "\"2.50\"");
        assert!(serde_json::from_str::<Price>("\"-2.50\"").is_err());
    }
}
