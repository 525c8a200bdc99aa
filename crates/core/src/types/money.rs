//! Monetary amounts in integer minor units.
//!
//! The commerce backend reports every amount as an integer in the currency's
//! smallest unit (cents for USD, yen for JPY). Amounts are only ever added or
//! compared here; pricing itself is computed by the backend.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced by money and currency parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The currency code is not one the storefront can display.
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
    /// Two amounts in different currencies were combined.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: CurrencyCode,
        /// Currency of the right operand.
        right: CurrencyCode,
    },
    /// The sum does not fit in an `i64`.
    #[error("amount overflow")]
    Overflow,
}

/// ISO 4217 currencies the storefront can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    CHF,
    AED,
    JPY,
}

impl CurrencyCode {
    /// Every supported currency, in display order.
    pub const ALL: [Self; 8] = [
        Self::USD,
        Self::EUR,
        Self::GBP,
        Self::CAD,
        Self::AUD,
        Self::CHF,
        Self::AED,
        Self::JPY,
    ];

    /// Parse a currency code, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::UnsupportedCurrency`] for unknown codes.
    pub fn parse(code: &str) -> Result<Self, MoneyError> {
        let upper = code.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| MoneyError::UnsupportedCurrency(code.trim().to_string()))
    }

    /// Upper-case ISO code (`"USD"`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::CHF => "CHF",
            Self::AED => "AED",
            Self::JPY => "JPY",
        }
    }

    /// Lower-case code as used on the wire and in the session (`"usd"`).
    #[must_use]
    pub const fn wire_code(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
            Self::CHF => "chf",
            Self::AED => "aed",
            Self::JPY => "jpy",
        }
    }

    /// Display prefix.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::CAD => "CA$",
            Self::AUD => "A$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::CHF => "CHF ",
            Self::AED => "AED ",
            Self::JPY => "¥",
        }
    }

    /// Number of minor-unit digits.
    #[must_use]
    pub const fn exponent(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_code())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// An amount in minor units of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's smallest unit.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create an amount from minor units.
    #[must_use]
    pub const fn new(amount: i64, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// The amount in major units as a decimal (`8900` USD -> `89.00`).
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.exponent())
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] or [`MoneyError::Overflow`].
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// How much is still missing to reach `threshold`, if anything.
    ///
    /// Returns `None` when the threshold is met or the currencies differ.
    #[must_use]
    pub fn remaining_until(&self, threshold: Self) -> Option<Self> {
        if self.currency != threshold.currency || self.amount >= threshold.amount {
            return None;
        }
        Some(Self::new(threshold.amount - self.amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exponent = self.currency.exponent();
        let scale = 10_u64.pow(exponent);
        let magnitude = self.amount.unsigned_abs();
        let major = group_thousands(magnitude / scale);
        let sign = if self.amount < 0 { "-" } else { "" };

        if exponent == 0 {
            write!(f, "{sign}{}{major}", self.currency.symbol())
        } else {
            let minor = magnitude % scale;
            write!(
                f,
                "{sign}{}{major}.{minor:0width$}",
                self.currency.symbol(),
                width = exponent as usize
            )
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
