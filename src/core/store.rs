//! Load state machine for the quote snapshot.
//!
//! [`FinanceStore`] owns the current [`LoadState`] and runs at most one fetch at
//! a time. Every transition replaces the whole state inside a `watch` channel,
//! so subscribers never observe a partially updated value.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::currency::{CategoryFilter, CurrencyCode, CurrencyQuote, CurrencySnapshot, QuoteProvider};
use super::error::FetchError;
use super::format::{NumberLocale, QuoteRow};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded(Arc<CurrencySnapshot>),
    /// `previous` is the snapshot held when the failed fetch started.
    Failed {
        error: String,
        previous: Option<Arc<CurrencySnapshot>>,
    },
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// The snapshot of a `Loaded` state.
    pub fn snapshot(&self) -> Option<&Arc<CurrencySnapshot>> {
        match self {
            LoadState::Loaded(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// The most recent good snapshot, stale or not.
    pub fn last_snapshot(&self) -> Option<&Arc<CurrencySnapshot>> {
        match self {
            LoadState::Loaded(snapshot) => Some(snapshot),
            LoadState::Failed { previous, .. } => previous.as_ref(),
            LoadState::Idle | LoadState::Loading => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

struct StoreInner {
    provider: Arc<dyn QuoteProvider>,
    state: watch::Sender<LoadState>,
    category: watch::Sender<CategoryFilter>,
}

impl StoreInner {
    fn finish(
        &self,
        result: Result<CurrencySnapshot, FetchError>,
        previous: Option<Arc<CurrencySnapshot>>,
    ) {
        let next = match result {
            Ok(snapshot) => {
                debug!(quotes = snapshot.len(), "Quotes loaded");
                LoadState::Loaded(Arc::new(snapshot))
            }
            Err(err) => {
                let error = format!("Failed to load quotes: {}", err.describe());
                warn!(%error, stale = previous.is_some(), "Quote fetch failed");
                LoadState::Failed { error, previous }
            }
        };
        self.state.send_replace(next);
    }
}

pub struct FinanceStore {
    inner: Arc<StoreInner>,
    locale: NumberLocale,
}

impl FinanceStore {
    /// Creates an idle store. Nothing is fetched until [`FinanceStore::reload`].
    pub fn new(provider: Arc<dyn QuoteProvider>) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        let (category, _) = watch::channel(CategoryFilter::default());
        FinanceStore {
            inner: Arc::new(StoreInner {
                provider,
                state,
                category,
            }),
            locale: NumberLocale::default(),
        }
    }

    /// Creates a store and immediately starts the first load.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(provider: Arc<dyn QuoteProvider>) -> Self {
        let store = Self::new(provider);
        store.reload();
        store
    }

    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> &NumberLocale {
        &self.locale
    }

    pub fn state(&self) -> LoadState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.inner.state.subscribe()
    }

    /// Starts a fetch unless one is already in flight.
    ///
    /// Returns `false` when the call was dropped because the store is already
    /// loading. Must be called within a Tokio runtime.
    pub fn reload(&self) -> bool {
        let mut previous = None;
        let started = self.inner.state.send_if_modified(|state| {
            if state.is_loading() {
                return false;
            }
            previous = state.last_snapshot().cloned();
            *state = LoadState::Loading;
            true
        });

        if !started {
            debug!("Reload ignored, a fetch is already in flight");
            return false;
        }

        debug!("Loading quotes");
        let provider = Arc::clone(&self.inner.provider);
        let store = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let result = provider.fetch_snapshot().await;
            match store.upgrade() {
                Some(inner) => inner.finish(result, previous),
                None => debug!("Store dropped while loading, discarding result"),
            }
        });
        true
    }

    /// Waits for the in-flight fetch, if any, and returns the settled state.
    pub async fn wait_until_settled(&self) -> LoadState {
        let mut rx = self.inner.state.subscribe();
        let settled = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    pub fn select_category(&self, category: CategoryFilter) {
        debug!(%category, "Category selected");
        self.inner.category.send_replace(category);
    }

    pub fn selected_category(&self) -> CategoryFilter {
        *self.inner.category.borrow()
    }

    /// Quotes of `category` from the loaded snapshot; empty unless `Loaded`.
    pub fn filtered_entries(&self, category: CategoryFilter) -> Vec<(CurrencyCode, CurrencyQuote)> {
        self.inner
            .state
            .borrow()
            .snapshot()
            .map(|snapshot| snapshot.entries(category))
            .unwrap_or_default()
    }

    pub fn visible_entries(&self) -> Vec<(CurrencyCode, CurrencyQuote)> {
        self.filtered_entries(self.selected_category())
    }

    pub fn display_rows(&self, category: CategoryFilter) -> Vec<QuoteRow> {
        self.filtered_entries(category)
            .iter()
            .map(|(code, quote)| QuoteRow::new(&self.locale, *code, quote))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::NOT_AVAILABLE;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    struct MockProvider {
        responses: Mutex<VecDeque<Result<CurrencySnapshot, FetchError>>>,
        calls: AtomicUsize,
        gate: Semaphore,
    }

    impl MockProvider {
        fn new(responses: Vec<Result<CurrencySnapshot, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
            })
        }

        /// Fetches block until `release` is called.
        fn gated(responses: Vec<Result<CurrencySnapshot, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            })
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteProvider for MockProvider {
        async fn fetch_snapshot(&self) -> Result<CurrencySnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::BadStatus(500)))
        }
    }

    fn snapshot(usd_buy: Option<Decimal>) -> CurrencySnapshot {
        let quotes = CurrencyCode::ALL
            .iter()
            .map(|code| {
                let quote = CurrencyQuote {
                    display_name: code.as_str().to_string(),
                    buy: if *code == CurrencyCode::Usd {
                        usd_buy
                    } else {
                        Some(dec!(1.5))
                    },
                    sell: None,
                    variation: dec!(0.0575),
                };
                (*code, quote)
            })
            .collect();
        CurrencySnapshot::new(quotes, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_new_store_is_idle_without_fetching() {
        let provider = MockProvider::new(vec![Ok(snapshot(None))]);
        let store = FinanceStore::new(provider.clone());

        assert_eq!(store.state(), LoadState::Idle);
        assert_eq!(store.wait_until_settled().await, LoadState::Idle);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_start_loads_eagerly() {
        let provider = MockProvider::new(vec![Ok(snapshot(Some(dec!(5.75))))]);
        let store = FinanceStore::start(provider.clone());

        assert!(store.state().is_loading());
        let state = store.wait_until_settled().await;
        assert!(matches!(state, LoadState::Loaded(_)));
        assert!(state.error().is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_transitions_are_observable() {
        let provider = MockProvider::new(vec![Ok(snapshot(None))]);
        let store = FinanceStore::new(provider);
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow_and_update(), LoadState::Idle);

        assert!(store.reload());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), LoadState::Loading);

        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow_and_update(), LoadState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_reload_while_loading_is_dropped() {
        let provider = MockProvider::gated(vec![Ok(snapshot(None))]);
        let store = FinanceStore::new(provider.clone());

        assert!(store.reload());
        assert!(!store.reload());
        assert!(!store.reload());

        provider.release();
        let state = store.wait_until_settled().await;

        assert!(matches!(state, LoadState::Loaded(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let first = snapshot(Some(dec!(5.75)));
        let provider = MockProvider::new(vec![Ok(first.clone()), Err(FetchError::BadStatus(503))]);
        let store = FinanceStore::new(provider);

        store.reload();
        let loaded = store.wait_until_settled().await;
        assert_eq!(loaded.snapshot().map(|s| s.as_ref()), Some(&first));

        store.reload();
        let failed = store.wait_until_settled().await;
        match &failed {
            LoadState::Failed { error, previous } => {
                assert!(error.contains("503"));
                assert_eq!(previous.as_deref(), Some(&first));
            }
            other => panic!("Expected a failed state, got {other:?}"),
        }
        assert_eq!(failed.last_snapshot(), loaded.snapshot());
        assert!(failed.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_first_failure_has_no_previous_snapshot() {
        let provider = MockProvider::new(vec![Err(FetchError::DecodeError(
            "missing field `BTC`".to_string(),
        ))]);
        let store = FinanceStore::start(provider);

        let state = store.wait_until_settled().await;
        assert_eq!(
            state,
            LoadState::Failed {
                error: "Failed to load quotes: Failed to decode response: missing field `BTC`"
                    .to_string(),
                previous: None,
            }
        );
    }

    #[tokio::test]
    async fn test_repeated_failures_carry_snapshot_until_recovery() {
        let first = snapshot(Some(dec!(5.75)));
        let second = snapshot(Some(dec!(6.10)));
        let provider = MockProvider::new(vec![
            Ok(first.clone()),
            Err(FetchError::BadStatus(502)),
            Err(FetchError::BadStatus(503)),
            Ok(second.clone()),
        ]);
        let store = FinanceStore::start(provider.clone());
        store.wait_until_settled().await;

        store.reload();
        store.wait_until_settled().await;
        store.reload();
        let state = store.wait_until_settled().await;
        assert!(state.error().unwrap().contains("503"));
        assert_eq!(state.last_snapshot().map(|s| s.as_ref()), Some(&first));

        store.reload();
        let state = store.wait_until_settled().await;
        assert_eq!(state.snapshot().map(|s| s.as_ref()), Some(&second));
        assert!(state.error().is_none());
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_filtered_entries_require_loaded_snapshot() {
        let provider = MockProvider::gated(vec![
            Ok(snapshot(None)),
            Err(FetchError::BadStatus(503)),
        ]);
        let store = FinanceStore::new(provider.clone());
        assert!(store.filtered_entries(CategoryFilter::Fiat).is_empty());

        store.reload();
        assert!(store.filtered_entries(CategoryFilter::Fiat).is_empty());

        provider.release();
        store.wait_until_settled().await;

        let crypto = store.filtered_entries(CategoryFilter::Crypto);
        assert_eq!(crypto.len(), 1);
        assert_eq!(crypto[0].0, CurrencyCode::Btc);

        let fiat: Vec<_> = store
            .filtered_entries(CategoryFilter::Fiat)
            .into_iter()
            .map(|(code, _)| code.as_str())
            .collect();
        assert_eq!(fiat, vec!["USD", "EUR", "GBP", "ARS", "CAD", "AUD", "JPY"]);

        store.reload();
        provider.release();
        store.wait_until_settled().await;
        assert!(store.filtered_entries(CategoryFilter::Crypto).is_empty());
    }

    #[tokio::test]
    async fn test_selected_category_drives_visible_rows() {
        let provider = MockProvider::new(vec![Ok(snapshot(None))]);
        let store = FinanceStore::start(provider);
        store.wait_until_settled().await;

        assert_eq!(store.selected_category(), CategoryFilter::Crypto);
        let codes: Vec<_> = store.visible_entries().into_iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec![CurrencyCode::Btc]);

        store.select_category(CategoryFilter::Savings);
        let codes: Vec<_> = store.visible_entries().into_iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec![CurrencyCode::Usd, CurrencyCode::Btc]);

        let rows = store.display_rows(CategoryFilter::Cards);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, CurrencyCode::Usd);
        assert_eq!(rows[0].buy, NOT_AVAILABLE);
        assert_eq!(rows[0].variation, "5,75%");
        assert_eq!(rows[1].buy, "R$ 1,50");
    }

    #[tokio::test]
    async fn test_rows_follow_store_locale() {
        let provider = MockProvider::new(vec![Ok(snapshot(Some(dec!(1234.5))))]);
        let store = FinanceStore::start(provider).with_locale(NumberLocale::EN_US);
        store.wait_until_settled().await;

        let rows = store.display_rows(CategoryFilter::Cards);
        assert_eq!(rows[0].buy, "R$ 1,234.50");
        assert_eq!(rows[0].variation, "5.75%");
    }

    #[tokio::test]
    async fn test_dropped_store_discards_in_flight_result() {
        let provider = MockProvider::gated(vec![Ok(snapshot(None))]);
        let store = FinanceStore::new(provider.clone());
        store.reload();
        let mut rx = store.subscribe();

        drop(store);
        provider.release();
        while provider.gate.available_permits() > 0 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        assert!(rx.borrow_and_update().is_loading());
        assert!(rx.changed().await.is_err());
    }
}
