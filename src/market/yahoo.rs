use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{
    Candle, HistoryRange, Interval, MarketDataProvider, Quote, SymbolMatch, decimal_from_f64,
    error::{MarketError, MarketResult},
};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; flf/0.1)";
const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuote {
    symbol: String,
    shortname: Option<String>,
    longname: Option<String>,
    exch_disp: Option<String>,
    exchange: Option<String>,
    quote_type: Option<String>,
}

/// Client for the public Yahoo Finance chart and search endpoints.
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> MarketResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> MarketResult<ChartEnvelope> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!(%symbol, %range, %interval, "fetching yahoo chart");

        let response = self
            .client
            .get(url)
            .query(&[("range", range.as_str()), ("interval", interval.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(MarketError::SymbolNotFound(symbol.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(MarketError::RateLimited(String::from("yahoo finance")))
            }
            status if !status.is_success() => Err(MarketError::UpstreamStatus {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response.json().await?),
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn quote(&self, symbol: &str) -> MarketResult<Quote> {
        let envelope = self
            .fetch_chart(symbol, HistoryRange::OneDay, Interval::OneDay)
            .await?;
        quote_from_chart(envelope, symbol)
    }

    async fn history(
        &self,
        symbol: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> MarketResult<Vec<Candle>> {
        let envelope = self.fetch_chart(symbol, range, interval).await?;
        candles_from_chart(envelope, symbol)
    }

    async fn search(&self, query: &str) -> MarketResult<Vec<SymbolMatch>> {
        let url = format!("{}/v1/finance/search", self.base_url);
        let count = SEARCH_LIMIT.to_string();

        let response = self
            .client
            .get(url)
            .query(&[("q", query), ("quotesCount", count.as_str()), ("newsCount", "0")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::UpstreamStatus {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let envelope: SearchEnvelope = response.json().await?;
        Ok(matches_from_search(envelope))
    }
}

fn first_result(envelope: ChartEnvelope, symbol: &str) -> MarketResult<ChartResult> {
    if let Some(err) = envelope.chart.error {
        if err.code.eq_ignore_ascii_case("not found") {
            return Err(MarketError::SymbolNotFound(symbol.to_string()));
        }
        return Err(MarketError::Malformed(format!("{}: {}", err.code, err.description)));
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| MarketError::SymbolNotFound(symbol.to_string()))
}

fn quote_from_chart(envelope: ChartEnvelope, symbol: &str) -> MarketResult<Quote> {
    let result = first_result(envelope, symbol)?;
    let meta = result.meta;

    let price = meta
        .regular_market_price
        .and_then(decimal_from_f64)
        .ok_or_else(|| MarketError::Malformed(String::from("missing regularMarketPrice")))?;

    let previous = meta
        .previous_close
        .or(meta.chart_previous_close)
        .and_then(decimal_from_f64)
        .filter(|p| !p.is_zero());

    let (change, change_percent) = match previous {
        Some(prev) => {
            let change = price - prev;
            (change, (change / prev * Decimal::ONE_HUNDRED).round_dp(2))
        }
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    let timestamp = meta
        .regular_market_time
        .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
        .unwrap_or_else(Utc::now);

    Ok(Quote {
        symbol: meta.symbol,
        price,
        change,
        change_percent,
        currency: meta.currency,
        timestamp,
    })
}

fn candles_from_chart(envelope: ChartEnvelope, symbol: &str) -> MarketResult<Vec<Candle>> {
    let result = first_result(envelope, symbol)?;
    let series = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .unwrap_or_default();

    let candles = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten().and_then(decimal_from_f64);
            Some(Candle {
                timestamp: DateTime::<Utc>::from_timestamp(*ts, 0)?,
                open: at(&series.open)?,
                high: at(&series.high)?,
                low: at(&series.low)?,
                close: at(&series.close)?,
                volume: series
                    .volume
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|v| v.max(0.0) as u64)
                    .unwrap_or(0),
            })
        })
        .collect();

    Ok(candles)
}

fn matches_from_search(envelope: SearchEnvelope) -> Vec<SymbolMatch> {
    envelope
        .quotes
        .into_iter()
        .map(|q| SymbolMatch {
            name: q.longname.or(q.shortname).unwrap_or_else(|| q.symbol.clone()),
            symbol: q.symbol,
            exchange: q.exch_disp.or(q.exchange),
            kind: q.quote_type,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn chart(value: serde_json::Value) -> ChartEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn quote_uses_previous_close_for_change() {
        let envelope = chart(json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "AAPL",
                        "currency": "USD",
                        "regularMarketPrice": 110.0,
                        "previousClose": 100.0,
                        "regularMarketTime": 1_700_000_000
                    },
                    "timestamp": [],
                    "indicators": { "quote": [{}] }
                }],
                "error": null
            }
        }));

        let quote = quote_from_chart(envelope, "AAPL").unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(110));
        assert_eq!(quote.change, dec!(10));
        assert_eq!(quote.change_percent, dec!(10));
        assert_eq!(quote.currency.as_deref(), Some("USD"));
        assert_eq!(quote.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn quote_without_previous_close_has_zero_change() {
        let envelope = chart(json!({
            "chart": {
                "result": [{ "meta": { "symbol": "X", "regularMarketPrice": 5.25 } }],
                "error": null
            }
        }));

        let quote = quote_from_chart(envelope, "X").unwrap();
        assert_eq!(quote.price, dec!(5.25));
        assert_eq!(quote.change, Decimal::ZERO);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let envelope = chart(json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        }));

        assert!(matches!(
            quote_from_chart(envelope, "NOPE"),
            Err(MarketError::SymbolNotFound(s)) if s == "NOPE"
        ));
    }

    #[test]
    fn candles_skip_incomplete_points() {
        let envelope = chart(json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "MSFT" },
                    "timestamp": [1_700_000_000, 1_700_086_400, 1_700_172_800],
                    "indicators": { "quote": [{
                        "open":   [1.0, null, 3.0],
                        "high":   [1.5, 2.5, 3.5],
                        "low":    [0.5, 1.5, 2.5],
                        "close":  [1.2, 2.2, 3.2],
                        "volume": [100, 200, null]
                    }] }
                }],
                "error": null
            }
        }));

        let candles = candles_from_chart(envelope, "MSFT").unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, dec!(1.2));
        assert_eq!(candles[0].volume, 100);
        assert_eq!(candles[1].open, dec!(3));
        assert_eq!(candles[1].volume, 0);
    }

    #[test]
    fn search_prefers_long_names() {
        let envelope: SearchEnvelope = serde_json::from_value(json!({
            "quotes": [
                { "symbol": "AAPL", "shortname": "Apple Inc.", "longname": "Apple Inc. Common", "exchDisp": "NASDAQ", "quoteType": "EQUITY" },
                { "symbol": "APLE", "exchange": "NYQ" }
            ]
        }))
        .unwrap();

        let matches = matches_from_search(envelope);
        assert_eq!(matches[0].name, "Apple Inc. Common");
        assert_eq!(matches[0].exchange.as_deref(), Some("NASDAQ"));
        assert_eq!(matches[1].name, "APLE");
        assert_eq!(matches[1].exchange.as_deref(), Some("NYQ"));
    }
}
