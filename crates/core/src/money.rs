//! Monetary amounts and currency conversion.
//!
//! Amounts are kept as `Decimal` so sums of stock valuations never pick up
//! floating point drift.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// ISO 4217 currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> DomainResult<Self> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "invalid currency code '{code}'"
            )));
        }
        Ok(Self(code))
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

/// Amount + currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl ValueObject for Money {}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Multiply the amount by a quantity (unit cost × units on hand).
    ///
    /// `None` when the product does not fit in a `Decimal`.
    pub fn checked_times(&self, quantity: Decimal) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_mul(quantity)?,
            currency: self.currency.clone(),
        })
    }

    /// Add two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> DomainResult<Money> {
        if self.currency != other.currency {
            return Err(DomainError::invariant(format!(
                "currency mismatch ({} + {})",
                self.currency, other.currency
            )));
        }
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| {
            DomainError::invariant(format!("{} amount overflow", self.currency))
        })?;
        Ok(Money {
            amount,
            currency: self.currency.clone(),
        })
    }
}

/// Exchange rates relative to a base currency.
///
/// `rates[c]` is the number of units of `c` per one unit of `base`, which is
/// how the host application stores them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExchangeRates {
    base: Option<Currency>,
    rates: HashMap<Currency, Decimal>,
}

impl ExchangeRates {
    pub fn new(base: Currency) -> Self {
        Self {
            base: Some(base),
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.rates.insert(currency, rate);
        self
    }

    pub fn insert(&mut self, currency: Currency, rate: Decimal) {
        self.rates.insert(currency, rate);
    }

    fn rate_of(&self, currency: &Currency) -> Option<Decimal> {
        if self.base.as_ref() == Some(currency) {
            return Some(Decimal::ONE);
        }
        self.rates.get(currency).copied().filter(|r| !r.is_zero())
    }

    /// Convert `money` into `target`.
    ///
    /// Returns `None` when either currency has no known rate.
    pub fn convert(&self, money: &Money, target: &Currency) -> Option<Money> {
        if &money.currency == target {
            return Some(money.clone());
        }
        let from = self.rate_of(&money.currency)?;
        let to = self.rate_of(target)?;
        let amount = money.amount.checked_div(from)?.checked_mul(to)?;
        Some(Money::new(amount, target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn currency_codes_are_normalised() {
        assert_eq!(Currency::new("eur").unwrap().as_str(), "EUR");
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("E1R").is_err());
    }

    #[test]
    fn adding_mixed_currencies_fails() {
        let a = Money::new(dec("1"), Currency::usd());
        let b = Money::new(dec("1"), Currency::new("EUR").unwrap());
        assert!(a.checked_add(&b).is_err());
    }

    #[test]
    fn arithmetic_reports_overflow_instead_of_panicking() {
        let huge = Money::new(Decimal::MAX, Currency::usd());
        assert!(huge.checked_times(dec("2")).is_none());
        assert!(matches!(
            huge.checked_add(&Money::new(dec("1"), Currency::usd())),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(
            Money::new(dec("2.5"), Currency::usd()).checked_times(dec("4")),
            Some(Money::new(dec("10"), Currency::usd()))
        );
    }

    #[test]
    fn converts_through_base_currency() {
        let eur = Currency::new("EUR").unwrap();
        let aud = Currency::new("AUD").unwrap();
        let rates = ExchangeRates::new(Currency::usd())
            .with_rate(eur.clone(), dec("0.5"))
            .with_rate(aud.clone(), dec("1.5"));

        let converted = rates.convert(&Money::new(dec("10"), eur), &aud).unwrap();
        assert_eq!(converted.amount, dec("30"));
        assert_eq!(converted.currency, aud);
    }

    #[test]
    fn unknown_currency_does_not_convert() {
        let rates = ExchangeRates::new(Currency::usd());
        let gbp = Money::new(dec("1"), Currency::new("GBP").unwrap());
        assert!(rates.convert(&gbp, &Currency::usd()).is_none());
    }
}
