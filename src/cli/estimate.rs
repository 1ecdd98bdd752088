use super::{quotes, ui};
use crate::core::format::format_amount_in;
use crate::core::{
    CurrencyCode, CurrencyQuote, FinanceStore, LoadState, NumberLocale, TradeSide, estimate_total,
};
use anyhow::{Result, anyhow};
use rust_decimal::Decimal;

/// One line describing the total of a buy or sell.
pub fn render_estimate(
    locale: &NumberLocale,
    code: CurrencyCode,
    quote: &CurrencyQuote,
    side: TradeSide,
    amount: Decimal,
    total: Decimal,
) -> String {
    let verb = match side {
        TradeSide::Buy => "Buying",
        TradeSide::Sell => "Selling",
    };
    format!(
        "{verb} {} {code} ({}) at {}: {}",
        amount.normalize(),
        quote.display_name,
        format_amount_in(locale, side.price(quote)),
        ui::style_text(&format_amount_in(locale, Some(total)), ui::StyleType::Title)
    )
}

/// Settles the store and prints the total for trading `amount` of `code`.
pub async fn run(
    store: &FinanceStore,
    code: CurrencyCode,
    side: TradeSide,
    amount: Decimal,
    retries: usize,
) -> Result<()> {
    let snapshot = match quotes::settle(store, retries).await {
        LoadState::Loaded(snapshot) => snapshot,
        LoadState::Failed { error, .. } => {
            eprintln!("{}", ui::style_text(&error, ui::StyleType::Error));
            return Err(anyhow!(error));
        }
        LoadState::Idle | LoadState::Loading => {
            return Err(anyhow!("Quotes were never requested"));
        }
    };

    let quote = snapshot
        .quote(code)
        .ok_or_else(|| anyhow!("No quote for {code}"))?;

    match estimate_total(code, quote, side, amount) {
        Ok(total) => {
            println!(
                "{}",
                render_estimate(store.locale(), code, quote, side, amount, total)
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", ui::style_text(&err.to_string(), ui::StyleType::Warning));
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CurrencySnapshot, EstimateError, FetchError, QuoteProvider};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct FixedProvider {
        fail: bool,
    }

    #[async_trait]
    impl QuoteProvider for FixedProvider {
        async fn fetch_snapshot(&self) -> Result<CurrencySnapshot, FetchError> {
            if self.fail {
                return Err(FetchError::BadStatus(503));
            }
            let quotes = CurrencyCode::ALL
                .iter()
                .map(|code| {
                    let available = *code == CurrencyCode::Usd;
                    (
                        *code,
                        CurrencyQuote {
                            display_name: format!("{code} name"),
                            buy: available.then_some(dec!(5.7512)),
                            sell: None,
                            variation: dec!(0.0575),
                        },
                    )
                })
                .collect();
            CurrencySnapshot::new(quotes, Utc::now())
        }
    }

    #[test]
    fn test_render_estimate_formats_price_and_total() {
        let quote = CurrencyQuote {
            display_name: "Dollar".to_string(),
            buy: Some(dec!(5.7512)),
            sell: None,
            variation: dec!(0.0575),
        };

        let line = render_estimate(
            &NumberLocale::PT_BR,
            CurrencyCode::Usd,
            &quote,
            TradeSide::Buy,
            dec!(10),
            dec!(57.512),
        );

        assert!(line.contains("Buying 10 USD (Dollar)"));
        assert!(line.contains("at R$ 5,75"));
        assert!(line.contains("R$ 57,51"));
    }

    #[tokio::test]
    async fn test_run_prints_available_total() {
        let store = FinanceStore::start(Arc::new(FixedProvider { fail: false }));

        let result = run(&store, CurrencyCode::Usd, TradeSide::Buy, dec!(10), 0).await;
        assert!(result.is_ok(), "run failed with: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_run_refuses_unavailable_price() {
        let store = FinanceStore::start(Arc::new(FixedProvider { fail: false }));

        let err = run(&store, CurrencyCode::Usd, TradeSide::Sell, dec!(10), 0)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EstimateError>(),
            Some(&EstimateError::Unavailable {
                code: CurrencyCode::Usd,
                side: TradeSide::Sell
            })
        );
    }

    #[tokio::test]
    async fn test_run_reports_fetch_failure() {
        let store = FinanceStore::start(Arc::new(FixedProvider { fail: true }));

        let err = run(&store, CurrencyCode::Eur, TradeSide::Buy, dec!(1), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
