use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{
    Candle, HistoryRange, Interval, MarketDataProvider, MarketResult, Quote, SharedMarketData,
    SymbolMatch,
};
use crate::cache::{self, SharedCache};

/// Serves provider results from the cache while they are fresh.
///
/// Cache failures never fail a request: they are logged and the upstream
/// provider is asked instead.
pub struct CachedMarketData {
    upstream: SharedMarketData,
    cache: SharedCache,
    quote_ttl: Duration,
    series_ttl: Duration,
}

impl CachedMarketData {
    pub fn new(
        upstream: SharedMarketData,
        cache: SharedCache,
        quote_ttl: Duration,
        series_ttl: Duration,
    ) -> Self {
        Self {
            upstream,
            cache,
            quote_ttl,
            series_ttl,
        }
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match cache::get_json(self.cache.as_ref(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(%key, "market cache read failed: {e}");
                None
            }
        }
    }

    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = cache::set_json(self.cache.as_ref(), key, value, ttl).await {
            warn!(%key, "market cache write failed: {e}");
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for CachedMarketData {
    async fn quote(&self, symbol: &str) -> MarketResult<Quote> {
        let key = format!("market:quote:{symbol}");
        if let Some(quote) = self.cached(&key).await {
            debug!(%symbol, "quote served from cache");
            return Ok(quote);
        }

        let quote = self.upstream.quote(symbol).await?;
        self.store(&key, &quote, self.quote_ttl).await;
        Ok(quote)
    }

    async fn history(
        &self,
        symbol: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> MarketResult<Vec<Candle>> {
        let key = format!("market:history:{symbol}:{range}:{interval}");
        if let Some(candles) = self.cached(&key).await {
            return Ok(candles);
        }

        let candles = self.upstream.history(symbol, range, interval).await?;
        self.store(&key, &candles, self.series_ttl).await;
        Ok(candles)
    }

    async fn search(&self, query: &str) -> MarketResult<Vec<SymbolMatch>> {
        let key = format!("market:search:{}", query.to_lowercase());
        if let Some(matches) = self.cached(&key).await {
            return Ok(matches);
        }

        let matches = self.upstream.search(query).await?;
        self.store(&key, &matches, self.series_ttl).await;
        Ok(matches)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        cache::{CacheStore, MemoryCache},
        market::MarketError,
    };

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for CountingProvider {
        async fn quote(&self, symbol: &str) -> MarketResult<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "FAIL" {
                return Err(MarketError::SymbolNotFound(symbol.to_string()));
            }
            Ok(Quote {
                symbol: symbol.to_string(),
                price: dec!(42.5),
                change: dec!(0),
                change_percent: dec!(0),
                currency: Some(String::from("USD")),
                timestamp: Utc::now(),
            })
        }

        async fn history(
            &self,
            _symbol: &str,
            _range: HistoryRange,
            _interval: Interval,
        ) -> MarketResult<Vec<Candle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn search(&self, _query: &str) -> MarketResult<Vec<SymbolMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn setup() -> (Arc<CountingProvider>, CachedMarketData) {
        let (upstream, cached, _) = setup_with_store();
        (upstream, cached)
    }

    fn setup_with_store() -> (Arc<CountingProvider>, CachedMarketData, Arc<MemoryCache>) {
        let upstream = Arc::new(CountingProvider::default());
        let store = Arc::new(MemoryCache::new());
        let cached = CachedMarketData::new(
            upstream.clone(),
            store.clone(),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        (upstream, cached, store)
    }

    #[tokio::test]
    async fn quotes_are_kept_under_the_market_prefix() {
        let (upstream, cached, store) = setup_with_store();
        store
            .set_ex("quote:AAPL", r#"{"bogus":true}"#, Duration::from_secs(60))
            .await
            .unwrap();

        let quote = cached.quote("AAPL").await.unwrap();
        assert_eq!(quote.price, dec!(42.5));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert!(store.get("market:quote:AAPL").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_quote_is_a_cache_hit() {
        let (upstream, cached) = setup();
        let first = cached.quote("AAPL").await.unwrap();
        let second = cached.quote("AAPL").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let (upstream, cached) = setup();
        assert!(cached.quote("FAIL").await.is_err());
        assert!(cached.quote("FAIL").await.is_err());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn history_keys_include_range_and_interval() {
        let (upstream, cached) = setup();
        cached
            .history("AAPL", HistoryRange::OneMonth, Interval::OneDay)
            .await
            .unwrap();
        cached
            .history("AAPL", HistoryRange::OneYear, Interval::OneDay)
            .await
            .unwrap();
        cached
            .history("AAPL", HistoryRange::OneMonth, Interval::OneDay)
            .await
            .unwrap();
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }
}
