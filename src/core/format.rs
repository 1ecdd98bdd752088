//! Display formatting for quotes: monetary amounts, variations and their direction.
//!
//! Amounts and percentages are rounded to two fraction digits with
//! round-half-to-even, so `5.755` renders as `5,76` and `5.745` as `5,74`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use super::currency::{CurrencyCode, CurrencyQuote};

/// Shown for prices that are missing or not positive.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sign of a variation, mapped to green/red/gray by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

/// Separators and currency glyph used when rendering numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub currency_symbol: &'static str,
}

impl NumberLocale {
    pub const PT_BR: NumberLocale = NumberLocale {
        decimal_separator: ',',
        grouping_separator: '.',
        currency_symbol: "R$",
    };

    pub const EN_US: NumberLocale = NumberLocale {
        decimal_separator: '.',
        grouping_separator: ',',
        currency_symbol: "R$",
    };
}

impl Default for NumberLocale {
    fn default() -> Self {
        NumberLocale::PT_BR
    }
}

/// Locale names accepted in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DisplayLocale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl DisplayLocale {
    pub fn number_locale(&self) -> NumberLocale {
        match self {
            DisplayLocale::PtBr => NumberLocale::PT_BR,
            DisplayLocale::EnUs => NumberLocale::EN_US,
        }
    }
}

/// Formats a price as `R$ 1.234,56`, or [`NOT_AVAILABLE`] when absent or <= 0.
pub fn format_amount(value: Option<Decimal>) -> String {
    format_amount_in(&NumberLocale::PT_BR, value)
}

pub fn format_amount_in(locale: &NumberLocale, value: Option<Decimal>) -> String {
    match value {
        Some(amount) if amount > Decimal::ZERO => localize(locale, amount).map_or_else(
            || format!("{} {:.2}", locale.currency_symbol, amount),
            |body| format!("{} {}", locale.currency_symbol, body),
        ),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Formats a fractional variation as a percentage: `0.0575` becomes `5,75%`.
pub fn format_variation(value: Decimal) -> String {
    format_variation_in(&NumberLocale::PT_BR, value)
}

pub fn format_variation_in(locale: &NumberLocale, value: Decimal) -> String {
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|percent| localize(locale, percent))
        .map_or_else(
            || format!("{:.2}%", value.to_f64().unwrap_or_default() * 100.0),
            |body| format!("{body}%"),
        )
}

pub fn variation_direction(value: Decimal) -> Direction {
    if value > Decimal::ZERO {
        Direction::Positive
    } else if value < Decimal::ZERO {
        Direction::Negative
    } else {
        Direction::Neutral
    }
}

/// A quote with every field already rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRow {
    pub code: CurrencyCode,
    pub name: String,
    pub buy: String,
    pub sell: String,
    pub variation: String,
    pub direction: Direction,
}

impl QuoteRow {
    pub fn new(locale: &NumberLocale, code: CurrencyCode, quote: &CurrencyQuote) -> Self {
        QuoteRow {
            code,
            name: quote.display_name.clone(),
            buy: format_amount_in(locale, quote.buy),
            sell: format_amount_in(locale, quote.sell),
            variation: format_variation_in(locale, quote.variation),
            direction: variation_direction(quote.variation),
        }
    }
}

fn localize(locale: &NumberLocale, value: Decimal) -> Option<String> {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }

    let rendered = rounded.to_string();
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.')?;
    if frac_part.len() != 2 {
        return None;
    }

    Some(format!(
        "{sign}{}{}{frac_part}",
        group_digits(int_part, locale.grouping_separator),
        locale.decimal_separator
    ))
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (len - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}
