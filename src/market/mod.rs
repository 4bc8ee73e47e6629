//! Market data: quotes, price history and symbol search from third-party APIs.

use std::sync::Arc;

use rust_decimal::{Decimal, prelude::FromPrimitive};

mod error;
pub use error::{MarketError, MarketResult};

mod types;
pub use types::{Candle, HistoryRange, Interval, Quote, SymbolMatch};

mod yahoo;
pub use yahoo::YahooFinanceClient;

mod alpha_vantage;
pub use alpha_vantage::AlphaVantageClient;

mod cached;
pub use cached::CachedMarketData;

use crate::{
    cache::SharedCache,
    config::{Config, MarketProviderKind},
};

const MAX_SYMBOL_LEN: usize = 15;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> MarketResult<Quote>;

    async fn history(
        &self,
        symbol: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> MarketResult<Vec<Candle>>;

    async fn search(&self, query: &str) -> MarketResult<Vec<SymbolMatch>>;
}

pub type SharedMarketData = Arc<dyn MarketDataProvider>;

/// Builds the configured provider wrapped in the cache decorator.
pub fn build_provider(config: &Config, cache: SharedCache) -> MarketResult<SharedMarketData> {
    let market = config.market();
    let upstream: SharedMarketData = match market.provider() {
        MarketProviderKind::Yahoo => Arc::new(YahooFinanceClient::new(
            market.yahoo_base_url(),
            market.request_timeout(),
        )?),
        MarketProviderKind::AlphaVantage => Arc::new(AlphaVantageClient::new(
            market.alpha_vantage_base_url(),
            market.alpha_vantage_key().ok_or(MarketError::MissingApiKey)?,
            market.request_timeout(),
        )?),
    };

    Ok(Arc::new(CachedMarketData::new(
        upstream,
        cache,
        market.quote_ttl(),
        market.series_ttl(),
    )))
}

/// Trims and upper-cases a ticker, rejecting anything that cannot be one.
pub fn normalize_symbol(raw: &str) -> MarketResult<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid_chars = symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));

    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || !valid_chars {
        return Err(MarketError::InvalidSymbol(raw.to_string()));
    }
    Ok(symbol)
}

pub(crate) fn decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(4).normalize())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("^gspc").unwrap(), "^GSPC");
    }

    #[test]
    fn bad_symbols_are_rejected() {
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("   ").is_err());
        assert!(normalize_symbol("AA PL").is_err());
        assert!(normalize_symbol("A/B").is_err());
        assert!(normalize_symbol("ABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn floats_are_rounded_to_four_places() {
        assert_eq!(decimal_from_f64(189.123456).unwrap().to_string(), "189.1235");
        assert_eq!(decimal_from_f64(10.5).unwrap().to_string(), "10.5");
        assert!(decimal_from_f64(f64::NAN).is_none());
    }
}
