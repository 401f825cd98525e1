//! Currency - Type-safe currency codes
//!
//! Common fiat currencies are pre-defined; anything else uses the
//! `Other` fallback. The inbound transaction feed delivers amounts in
//! minor units (cents), so each currency knows its minor-unit exponent.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing currencies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("Empty currency code")]
    EmptyCode,

    #[error("Currency code too long (max 10 chars): {0}")]
    TooLong(String),

    #[error("Invalid currency code format: {0}")]
    InvalidFormat(String),
}

/// Currency codes
///
/// # Examples
/// ```
/// use fundbook_core::Currency;
///
/// let usd: Currency = "usd".parse().unwrap();
/// assert_eq!(usd, Currency::Usd);
/// assert_eq!(usd.exponent(), 2);
///
/// // 50000 cents -> 500.00
/// assert_eq!(usd.from_minor_units(50000).to_string(), "500.00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Canadian Dollar
    Cad,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
    /// Japanese Yen
    Jpy,
    /// Any other currency code
    Other(String),
}

impl Currency {
    /// Returns the currency code as a string slice
    pub fn code(&self) -> &str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Other(s) => s.as_str(),
        }
    }

    /// Minor-unit exponent (decimal places of the smallest unit)
    pub fn exponent(&self) -> u32 {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }

    /// Convert a minor-unit integer (e.g. cents) to a Decimal amount
    pub fn from_minor_units(&self, minor: i64) -> Decimal {
        Decimal::new(minor, self.exponent())
    }

    /// Round a value to this currency's minor unit, half-up
    pub fn round_minor(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.exponent(), RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(CurrencyError::EmptyCode);
        }

        if s.len() > 10 {
            return Err(CurrencyError::TooLong(s));
        }

        // Validate: only alphanumeric
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CurrencyError::InvalidFormat(s));
        }

        Ok(match s.as_str() {
            "USD" => Currency::Usd,
            "CAD" => Currency::Cad,
            "EUR" => Currency::Eur,
            "GBP" => Currency::Gbp,
            "JPY" => Currency::Jpy,
            _ => Currency::Other(s),
        })
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_known_currencies() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("cad".parse::<Currency>().unwrap(), Currency::Cad);
        assert_eq!("Gbp".parse::<Currency>().unwrap(), Currency::Gbp);
    }

    #[test]
    fn test_parse_custom_code() {
        let custom: Currency = "MXN".parse().unwrap();
        assert_eq!(custom, Currency::Other("MXN".to_string()));
        assert_eq!(custom.to_string(), "MXN");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Currency::Usd.from_minor_units(50000), dec!(500.00));
        assert_eq!(Currency::Usd.from_minor_units(1), dec!(0.01));
        assert_eq!(Currency::Jpy.from_minor_units(500), dec!(500));
    }

    #[test]
    fn test_round_minor_half_up() {
        assert_eq!(Currency::Usd.round_minor(dec!(600.006)), dec!(600.01));
        assert_eq!(Currency::Usd.round_minor(dec!(400.004)), dec!(400.00));
        assert_eq!(Currency::Usd.round_minor(dec!(0.005)), dec!(0.01));
        assert_eq!(Currency::Jpy.round_minor(dec!(99.5)), dec!(100));
    }

    #[test]
    fn test_empty_code_error() {
        let result: Result<Currency, _> = "".parse();
        assert!(matches!(result, Err(CurrencyError::EmptyCode)));
    }

    #[test]
    fn test_too_long_error() {
        let result: Result<Currency, _> = "VERYLONGCURRENCYNAME".parse();
        assert!(matches!(result, Err(CurrencyError::TooLong(_))));
    }

    #[test]
    fn test_invalid_format_error() {
        let result: Result<Currency, _> = "US-D".parse();
        assert!(matches!(result, Err(CurrencyError::InvalidFormat(_))));
    }

    #[test]
    fn test_serde_roundtrip() {
        let currencies = vec![
            Currency::Usd,
            Currency::Jpy,
            Currency::Other("MXN".to_string()),
        ];

        for currency in currencies {
            let json = serde_json::to_string(&currency).unwrap();
            let parsed: Currency = serde_json::from_str(&json).unwrap();
            assert_eq!(currency, parsed);
        }
    }
}
