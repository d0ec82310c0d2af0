//! Conversion from deposit token amounts to ledger native units.
//!
//! Deposits are denominated in a token (`USDC`, …) while the ledger moves
//! integer tiny units (10^-8 of one ledger coin). Every supported token has a
//! configured rate: how many tiny units one whole token is worth. Tokens
//! without a rate cannot be settled.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Decimal places of the ledger's native coin.
pub const NATIVE_DECIMALS: u32 = 8;

/// Tiny units in one whole ledger coin.
pub const TINY_UNITS_PER_COIN: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("token `{0}` has no configured conversion rate")]
    UnsupportedToken(String),

    #[error("amount {0} must be positive")]
    NonPositive(Decimal),

    #[error("amount {amount} {token} is below one native unit")]
    TooSmall { token: String, amount: Decimal },

    #[error("amount {amount} {token} overflows the native unit range")]
    Overflow { token: String, amount: Decimal },
}

/// Per-token conversion rates into tiny units.
///
/// Token symbols are matched case-insensitively. The list is tiny, so it is
/// kept as a `Vec` and scanned linearly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConverter {
    rates: Vec<(String, Decimal)>,
}

impl UnitConverter {
    pub fn new<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let mut converter = Self { rates: Vec::new() };
        for (token, rate) in rates {
            converter.set_rate(token, rate);
        }
        converter
    }

    /// Insert or replace the rate of `token`.
    pub fn set_rate(&mut self, token: impl Into<String>, tiny_units_per_token: Decimal) {
        let token = token.into().to_ascii_uppercase();
        match self.rates.iter_mut().find(|(t, _)| *t == token) {
            Some((_, rate)) => *rate = tiny_units_per_token,
            None => self.rates.push((token, tiny_units_per_token)),
        }
    }

    pub fn rate(&self, token: &str) -> Option<Decimal> {
        self.rates
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(token))
            .map(|(_, rate)| *rate)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.rates.iter().map(|(t, _)| t.as_str())
    }

    /// Convert `amount` of `token` into tiny units, rounding down.
    pub fn to_native(&self, token: &str, amount: Decimal) -> Result<i64, UnitError> {
        if amount <= Decimal::ZERO {
            return Err(UnitError::NonPositive(amount));
        }
        let rate = self
            .rate(token)
            .ok_or_else(|| UnitError::UnsupportedToken(token.to_owned()))?;
        let overflow = || UnitError::Overflow {
            token: token.to_owned(),
            amount,
        };
        let native = amount
            .checked_mul(rate)
            .ok_or_else(overflow)?
            .trunc()
            .to_i64()
            .ok_or_else(overflow)?;
        if native <= 0 {
            return Err(UnitError::TooSmall {
                token: token.to_owned(),
                amount,
            });
        }
        Ok(native)
    }
}

impl Default for UnitConverter {
    /// One USDC settles as one whole ledger coin.
    fn default() -> Self {
        Self::new([("USDC", Decimal::from(TINY_UNITS_PER_COIN))])
    }
}
