//! Quote abstractions and core types

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use super::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum CurrencyCode {
    Usd,
    Eur,
    Gbp,
    Ars,
    Cad,
    Aud,
    Jpy,
    Btc,
}

impl CurrencyCode {
    /// Every code a snapshot is required to carry.
    pub const ALL: [CurrencyCode; 8] = [
        CurrencyCode::Usd,
        CurrencyCode::Eur,
        CurrencyCode::Gbp,
        CurrencyCode::Ars,
        CurrencyCode::Cad,
        CurrencyCode::Aud,
        CurrencyCode::Jpy,
        CurrencyCode::Btc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Ars => "ARS",
            CurrencyCode::Cad => "CAD",
            CurrencyCode::Aud => "AUD",
            CurrencyCode::Jpy => "JPY",
            CurrencyCode::Btc => "BTC",
        }
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::ALL
            .iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| anyhow!("Invalid currency code: {}", s))
    }
}

/// Buy/sell/variation data for one currency.
///
/// `buy` and `sell` are `None` only when the API sent `null` (or omitted the
/// field). A zero price stays `Some(0)` here; it is treated as unavailable
/// when formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyQuote {
    pub display_name: String,
    pub buy: Option<Decimal>,
    pub sell: Option<Decimal>,
    /// Signed fractional change, `0.0575` reads as `5,75%`.
    pub variation: Decimal,
}

/// One complete set of quotes as of a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySnapshot {
    quotes: BTreeMap<CurrencyCode, CurrencyQuote>,
    fetched_at: DateTime<Utc>,
}

impl CurrencySnapshot {
    /// Builds a snapshot, failing unless every code in [`CurrencyCode::ALL`]
    /// is present.
    pub fn new(
        quotes: BTreeMap<CurrencyCode, CurrencyQuote>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        if let Some(missing) = CurrencyCode::ALL
            .iter()
            .find(|code| !quotes.contains_key(*code))
        {
            return Err(FetchError::DecodeError(format!(
                "missing currency `{missing}`"
            )));
        }
        Ok(Self { quotes, fetched_at })
    }

    pub fn quote(&self, code: CurrencyCode) -> Option<&CurrencyQuote> {
        self.quotes.get(&code)
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Returns the quotes of `category`, in the category's fixed order.
    pub fn entries(&self, category: CategoryFilter) -> Vec<(CurrencyCode, CurrencyQuote)> {
        category
            .codes()
            .iter()
            .filter_map(|code| self.quote(*code).map(|quote| (*code, quote.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    Crypto,
    Fiat,
    Cards,
    Savings,
}

impl CategoryFilter {
    pub const ALL: [CategoryFilter; 4] = [
        CategoryFilter::Crypto,
        CategoryFilter::Fiat,
        CategoryFilter::Cards,
        CategoryFilter::Savings,
    ];

    pub fn codes(&self) -> &'static [CurrencyCode] {
        use CurrencyCode::*;
        match self {
            CategoryFilter::Crypto => &[Btc],
            CategoryFilter::Fiat => &[Usd, Eur, Gbp, Ars, Cad, Aud, Jpy],
            CategoryFilter::Cards => &[Usd, Eur],
            CategoryFilter::Savings => &[Usd, Btc],
        }
    }
}

impl Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CategoryFilter::Crypto => "Crypto",
                CategoryFilter::Fiat => "Fiat",
                CategoryFilter::Cards => "Cards",
                CategoryFilter::Savings => "Savings",
            }
        )
    }
}

impl FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crypto" => Ok(CategoryFilter::Crypto),
            "fiat" => Ok(CategoryFilter::Fiat),
            "cards" => Ok(CategoryFilter::Cards),
            "savings" => Ok(CategoryFilter::Savings),
            _ => Err(anyhow!("Invalid category: {}", s)),
        }
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<CurrencySnapshot, FetchError>;
}
