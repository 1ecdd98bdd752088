pub mod cli;
pub mod core;
pub mod providers;

pub use crate::core::{
    CategoryFilter, CurrencyCode, CurrencyQuote, CurrencySnapshot, Direction, EstimateError,
    FetchError, FinanceStore, LoadState, QuoteProvider, TradeSide, estimate_total, format_amount,
    format_variation, variation_direction,
};

use crate::core::config::{AppConfig, ProviderConfig};
use crate::providers::{HgBrasilProvider, TimeoutProvider};
use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Quotes {
        category: Option<CategoryFilter>,
        all: bool,
        retries: usize,
    },
    Estimate {
        code: CurrencyCode,
        side: TradeSide,
        amount: Decimal,
        retries: usize,
    },
}

/// Builds the quote provider described by `config`, bounded by its timeout if set.
pub fn build_provider(config: &ProviderConfig) -> Arc<dyn QuoteProvider> {
    let client = HgBrasilProvider::new(&config.base_url, &config.api_key);
    match config.timeout() {
        Some(timeout) => Arc::new(TimeoutProvider::new(client, timeout)),
        None => Arc::new(client),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cambio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider = build_provider(&config.provider);
    let locale = config.locale.number_locale();

    match command {
        AppCommand::Quotes {
            category,
            all,
            retries,
        } => {
            let store = FinanceStore::start(provider).with_locale(locale);
            store.select_category(category.unwrap_or(config.category));

            let categories = if all {
                CategoryFilter::ALL.to_vec()
            } else {
                vec![store.selected_category()]
            };
            cli::quotes::run(&store, &categories, retries).await
        }
        AppCommand::Estimate {
            code,
            side,
            amount,
            retries,
        } => {
            let store = FinanceStore::start(provider).with_locale(locale);
            cli::estimate::run(&store, code, side, amount, retries).await
        }
    }
}
