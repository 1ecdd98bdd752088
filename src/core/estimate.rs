//! Totals for buying or selling an amount of a currency at the quoted price.

use anyhow::anyhow;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

use super::currency::{CurrencyCode, CurrencyQuote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// The quoted price used for this side, if any.
    pub fn price(&self, quote: &CurrencyQuote) -> Option<Decimal> {
        match self {
            TradeSide::Buy => quote.buy,
            TradeSide::Sell => quote.sell,
        }
    }
}

impl Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        })
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err(anyhow!("Invalid side: {}", s)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    #[error("Operation unavailable: no {side} price for {code}")]
    Unavailable { code: CurrencyCode, side: TradeSide },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
}

/// Total in reais for trading `amount` units of `code` on `side`.
///
/// Refused when the price for that side is absent or not positive, which is
/// exactly when it renders as "N/A".
pub fn estimate_total(
    code: CurrencyCode,
    quote: &CurrencyQuote,
    side: TradeSide,
    amount: Decimal,
) -> Result<Decimal, EstimateError> {
    let price = side
        .price(quote)
        .filter(|price| *price > Decimal::ZERO)
        .ok_or(EstimateError::Unavailable { code, side })?;

    if amount <= Decimal::ZERO {
        return Err(EstimateError::InvalidAmount(amount));
    }

    price
        .checked_mul(amount)
        .ok_or(EstimateError::InvalidAmount(amount))
}

/// Parses a user-entered amount, accepting `,` as the decimal separator.
pub fn parse_amount(input: &str) -> anyhow::Result<Decimal> {
    let normalized = input.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|_| anyhow!("Invalid amount: {}", input))
}
