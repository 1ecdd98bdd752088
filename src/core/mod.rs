//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod error;
pub mod estimate;
pub mod format;
pub mod log;
pub mod store;

// Re-export main types for cleaner imports
pub use currency::{CategoryFilter, CurrencyCode, CurrencyQuote, CurrencySnapshot, QuoteProvider};
pub use error::FetchError;
pub use estimate::{EstimateError, TradeSide, estimate_total};
pub use format::{
    Direction, NumberLocale, QuoteRow, format_amount, format_variation, variation_direction,
};
pub use store::{FinanceStore, LoadState};
