//! Currency codes

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{Result, SettlementError};

/// ISO-4217 style currency code (three ASCII letters, stored upper-case)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse a currency code, normalising it to upper case
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SettlementError::validation(
                "currency",
                format!("'{}' is not a three-letter currency code", code),
            ));
        }
        Ok(Currency(code.to_ascii_uppercase()))
    }

    /// Build a code known to be valid at compile time
    pub(crate) fn from_static(code: &'static str) -> Self {
        Currency(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = SettlementError;

    fn try_from(value: String) -> Result<Self> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("usd", "USD")]
    #[case(" EUR ", "EUR")]
    #[case("Irr", "IRR")]
    fn test_currency_normalises(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Currency::new(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("US")]
    #[case("USDT")]
    #[case("U$D")]
    fn test_currency_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            Currency::new(input),
            Err(SettlementError::ValidationError { .. })
        ));
    }
}
