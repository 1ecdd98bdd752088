use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::core::{CurrencySnapshot, FetchError, QuoteProvider};

/// Bounds every fetch of the wrapped provider. An expired fetch is reported
/// as a transport failure.
pub struct TimeoutProvider<T: QuoteProvider> {
    inner: T,
    timeout: Duration,
}

impl<T: QuoteProvider> TimeoutProvider<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<T: QuoteProvider> QuoteProvider for TimeoutProvider<T> {
    async fn fetch_snapshot(&self) -> Result<CurrencySnapshot, FetchError> {
        match tokio::time::timeout(self.timeout, self.inner.fetch_snapshot()).await {
            Ok(result) => result,
            Err(elapsed) => {
                warn!("Quote fetch timed out after {:?}", self.timeout);
                Err(FetchError::TransportError(Box::new(elapsed)))
            }
        }
    }
}
