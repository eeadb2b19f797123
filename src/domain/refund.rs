use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a single input row could not become a [`RefundRequest`].
///
/// These never abort a run; the runner records them as failed rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("empty payment id")]
    EmptyPaymentId,
    #[error("invalid amount format '{0}'")]
    InvalidAmount(String),
    #[error("invalid amount {0}: must be positive")]
    NonPositiveAmount(Decimal),
    #[error("invalid amount '{0}': exceeds supported precision")]
    UnrepresentableAmount(String),
    #[error("invalid amount {amount}: more decimal places than {currency} allows")]
    TooPreciseForCurrency { amount: Decimal, currency: String },
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// A strictly positive refund amount in major currency units (e.g. dollars).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, RowError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(RowError::NonPositiveAmount(value))
        }
    }

    /// Parses a trimmed amount field. Plain and scientific notation are accepted.
    ///
    /// Input that `Decimal` could only hold by rounding is rejected.
    pub fn parse(raw: &str) -> Result<Self, RowError> {
        let value = match Decimal::from_str_exact(raw) {
            Ok(value) => value,
            Err(_) if Decimal::from_str(raw).is_ok() => {
                return Err(RowError::UnrepresentableAmount(raw.to_string()));
            }
            Err(_) => Decimal::from_scientific(raw)
                .map_err(|_| RowError::InvalidAmount(raw.to_string()))?,
        };
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to the currency's smallest unit.
    ///
    /// Returns `None` when the amount carries more fractional digits than the
    /// currency allows, or does not fit in an `i64`.
    pub fn to_minor_units(&self, currency: &CurrencyCode) -> Option<i64> {
        let factor = Decimal::from(10_i64.pow(currency.minor_unit_exponent()));
        let scaled = self.0.checked_mul(factor)?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.trunc().to_i64()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = RowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Amount {
    /// Renders the amount with as many decimals as `currency` uses, falling back
    /// to the exact value when it has more.
    pub fn display_in(&self, currency: &CurrencyCode) -> String {
        let exponent = currency.minor_unit_exponent();
        if self.0.round_dp(exponent) == self.0 {
            format!("{:.*}", exponent as usize, self.0)
        } else {
            self.0.normalize().to_string()
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ISO 4217 currencies without a minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["BIF", "CLP", "JPY", "KRW", "PYG", "VND", "XAF", "XOF"];

/// A three-letter ISO 4217 currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn minor_unit_exponent(&self) -> u32 {
        if ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str()) {
            0
        } else {
            2
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("USD".to_string())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(format!("'{s}' is not a three-letter currency code"))
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One validated refund instruction, built from one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundRequest {
    payment_id: String,
    amount: Amount,
}

impl RefundRequest {
    /// Validates the raw `payment_id` and `amount` fields of a row.
    ///
    /// Both fields are trimmed first. The payment id is checked before the amount,
    /// so a row with both problems reports the empty id. The amount must be
    /// expressible in whole minor units of `currency`.
    pub fn parse(payment_id: &str, amount: &str, currency: &CurrencyCode) -> Result<Self, RowError> {
        let payment_id = payment_id.trim();
        if payment_id.is_empty() {
            return Err(RowError::EmptyPaymentId);
        }
        let amount = Amount::parse(amount.trim())?;
        if amount.to_minor_units(currency).is_none() {
            return Err(RowError::TooPreciseForCurrency {
                amount: amount.value(),
                currency: currency.to_string(),
            });
        }
        Ok(Self {
            payment_id: payment_id.to_string(),
            amount,
        })
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}
