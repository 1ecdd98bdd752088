use async_trait::async_trait;
use chrono::Utc;
use reqwest::{StatusCode, Url, header};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::core::{CurrencyCode, CurrencyQuote, CurrencySnapshot, FetchError, QuoteProvider};

/// Client for the HG Brasil finance endpoint.
pub struct HgBrasilProvider {
    base_url: String,
    api_key: String,
}

impl HgBrasilProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        HgBrasilProvider {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request_url(&self) -> Result<Url, FetchError> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("array_limit", "1"),
                ("fields", "only_results,currencies"),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| FetchError::InvalidRequest(format!("{e} for URL: {}", self.base_url)))
    }
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    name: String,
    #[serde(default, deserialize_with = "optional_number")]
    buy: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_number")]
    sell: Option<Decimal>,
    #[serde(deserialize_with = "number")]
    variation: Decimal,
}

fn number_to_decimal<E: serde::de::Error>(n: Number) -> Result<Decimal, E> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| E::custom(format!("number {text} out of range: {e}")))
}

// JSON numbers only; strings holding numbers are rejected.
fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    number_to_decimal(Number::deserialize(deserializer)?)
}

fn optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error> {
    Option::<Number>::deserialize(deserializer)?
        .map(number_to_decimal)
        .transpose()
}

#[derive(Debug, Deserialize)]
struct CurrenciesPayload {
    #[serde(rename = "USD")]
    usd: QuotePayload,
    #[serde(rename = "EUR")]
    eur: QuotePayload,
    #[serde(rename = "GBP")]
    gbp: QuotePayload,
    #[serde(rename = "ARS")]
    ars: QuotePayload,
    #[serde(rename = "CAD")]
    cad: QuotePayload,
    #[serde(rename = "AUD")]
    aud: QuotePayload,
    #[serde(rename = "JPY")]
    jpy: QuotePayload,
    #[serde(rename = "BTC")]
    btc: QuotePayload,
}

impl CurrenciesPayload {
    fn into_quotes(self) -> [(CurrencyCode, QuotePayload); 8] {
        [
            (CurrencyCode::Usd, self.usd),
            (CurrencyCode::Eur, self.eur),
            (CurrencyCode::Gbp, self.gbp),
            (CurrencyCode::Ars, self.ars),
            (CurrencyCode::Cad, self.cad),
            (CurrencyCode::Aud, self.aud),
            (CurrencyCode::Jpy, self.jpy),
            (CurrencyCode::Btc, self.btc),
        ]
    }
}

/// Decodes a response body into a snapshot.
///
/// Accepts both `{"results": {"currencies": ..}}` and the bare
/// `{"currencies": ..}` shape returned with `fields=only_results`.
pub fn parse_snapshot(body: &str) -> Result<CurrencySnapshot, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::DecodeError(format!("invalid JSON: {e}")))?;

    let envelope = value.get("results").unwrap_or(&value);
    let currencies = envelope
        .get("currencies")
        .ok_or_else(|| FetchError::DecodeError("missing `currencies` object".to_string()))?;

    let payload = CurrenciesPayload::deserialize(currencies)
        .map_err(|e| FetchError::DecodeError(e.to_string()))?;

    let mut quotes = BTreeMap::new();
    for (code, quote) in payload.into_quotes() {
        if quote.name.trim().is_empty() {
            return Err(FetchError::DecodeError(format!(
                "empty name for currency `{code}`"
            )));
        }
        for (field, price) in [("buy", quote.buy), ("sell", quote.sell)] {
            if price.is_some_and(|p| p < Decimal::ZERO) {
                return Err(FetchError::DecodeError(format!(
                    "negative {field} price for currency `{code}`"
                )));
            }
        }
        quotes.insert(
            code,
            CurrencyQuote {
                display_name: quote.name,
                buy: quote.buy,
                sell: quote.sell,
                variation: quote.variation,
            },
        );
    }

    CurrencySnapshot::new(quotes, Utc::now())
}

#[async_trait]
impl QuoteProvider for HgBrasilProvider {
    #[instrument(name = "HgBrasilFetch", skip(self))]
    async fn fetch_snapshot(&self) -> Result<CurrencySnapshot, FetchError> {
        let url = self.request_url()?;
        debug!("Requesting currency quotes from {}", self.base_url);

        let client = reqwest::Client::builder()
            .user_agent("cambio/0.1")
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let response = client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        debug!(status = %response.status(), "Received HG Brasil response");

        if response.status() != StatusCode::OK {
            return Err(FetchError::BadStatus(response.status().as_u16()));
        }

        let text = response.text().await?;
        parse_snapshot(&text)
    }
}
