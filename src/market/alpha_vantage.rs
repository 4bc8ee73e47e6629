use std::{str::FromStr, time::Duration};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use super::{
    Candle, HistoryRange, Interval, MarketDataProvider, Quote, SymbolMatch,
    error::{MarketError, MarketResult},
};

/// Client for the Alpha Vantage `query` endpoint.
///
/// Every response is a flat JSON object whose keys carry numbered prefixes
/// (`"05. price"`), so payloads are read as [`Value`] and picked apart by key.
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> MarketResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> MarketResult<Value> {
        let url = format!("{}/query", self.base_url);
        debug!(?params, "querying alpha vantage");

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::UpstreamStatus {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: Value = response.json().await?;
        check_throttled(&body)?;
        Ok(body)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for AlphaVantageClient {
    async fn quote(&self, symbol: &str) -> MarketResult<Quote> {
        let body = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        parse_global_quote(&body, symbol)
    }

    async fn history(
        &self,
        symbol: &str,
        range: HistoryRange,
        interval: Interval,
    ) -> MarketResult<Vec<Candle>> {
        let body = match intraday_interval(interval) {
            Some(av_interval) => {
                self.query(&[
                    ("function", "TIME_SERIES_INTRADAY"),
                    ("symbol", symbol),
                    ("interval", av_interval),
                    ("outputsize", "full"),
                ])
                .await?
            }
            None => {
                let size = if range.days().is_some_and(|d| d <= 100) {
                    "compact"
                } else {
                    "full"
                };
                self.query(&[
                    ("function", "TIME_SERIES_DAILY"),
                    ("symbol", symbol),
                    ("outputsize", size),
                ])
                .await?
            }
        };

        let candles = parse_time_series(&body, symbol)?;
        Ok(trim_to_range(candles, range, Utc::now()))
    }

    async fn search(&self, query: &str) -> MarketResult<Vec<SymbolMatch>> {
        let body = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", query)])
            .await?;
        Ok(parse_symbol_search(&body))
    }
}

fn intraday_interval(interval: Interval) -> Option<&'static str> {
    match interval {
        Interval::OneMinute => Some("1min"),
        Interval::FiveMinutes => Some("5min"),
        Interval::FifteenMinutes => Some("15min"),
        Interval::ThirtyMinutes => Some("30min"),
        Interval::SixtyMinutes => Some("60min"),
        _ => None,
    }
}

/// Alpha Vantage answers 200 with a `Note`/`Information` message when throttled.
fn check_throttled(body: &Value) -> MarketResult<()> {
    for key in ["Note", "Information"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            return Err(MarketError::RateLimited(msg.to_string()));
        }
    }
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(MarketError::Malformed(msg.to_string()));
    }
    Ok(())
}

fn field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn decimal_field(obj: &Value, key: &str) -> MarketResult<Decimal> {
    let raw = field(obj, key).ok_or_else(|| MarketError::Malformed(format!("missing {key}")))?;
    Decimal::from_str(raw.trim_end_matches('%'))
        .map_err(|e| MarketError::Malformed(format!("{key}: {e}")))
}

fn parse_global_quote(body: &Value, symbol: &str) -> MarketResult<Quote> {
    let quote = body
        .get("Global Quote")
        .filter(|q| q.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or_else(|| MarketError::SymbolNotFound(symbol.to_string()))?;

    let timestamp = field(quote, "07. latest trading day")
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_else(Utc::now);

    Ok(Quote {
        symbol: field(quote, "01. symbol").unwrap_or(symbol).to_string(),
        price: decimal_field(quote, "05. price")?,
        change: decimal_field(quote, "09. change")?,
        change_percent: decimal_field(quote, "10. change percent")?,
        currency: None,
        timestamp,
    })
}

fn parse_series_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|d| d.and_utc())
}

fn parse_time_series(body: &Value, symbol: &str) -> MarketResult<Vec<Candle>> {
    let series = body
        .as_object()
        .and_then(|obj| {
            obj.iter()
                .find(|(k, _)| k.starts_with("Time Series"))
                .map(|(_, v)| v)
        })
        .and_then(Value::as_object)
        .ok_or_else(|| MarketError::SymbolNotFound(symbol.to_string()))?;

    let mut candles = series
        .iter()
        .map(|(ts, point)| {
            Ok(Candle {
                timestamp: parse_series_time(ts)
                    .ok_or_else(|| MarketError::Malformed(format!("timestamp {ts:?}")))?,
                open: decimal_field(point, "1. open")?,
                high: decimal_field(point, "2. high")?,
                low: decimal_field(point, "3. low")?,
                close: decimal_field(point, "4. close")?,
                volume: field(point, "5. volume")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            })
        })
        .collect::<MarketResult<Vec<_>>>()?;

    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

fn trim_to_range(candles: Vec<Candle>, range: HistoryRange, now: DateTime<Utc>) -> Vec<Candle> {
    match range.days() {
        Some(days) => {
            let cutoff = now - chrono::Duration::days(days);
            candles.into_iter().filter(|c| c.timestamp >= cutoff).collect()
        }
        None => candles,
    }
}

fn parse_symbol_search(body: &Value) -> Vec<SymbolMatch> {
    body.get("bestMatches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| {
                    let symbol = field(m, "1. symbol")?.to_string();
                    Some(SymbolMatch {
                        name: field(m, "2. name").unwrap_or(&symbol).to_string(),
                        exchange: field(m, "4. region").map(str::to_string),
                        kind: field(m, "3. type").map(str::to_string),
                        symbol,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn point(o: &str, h: &str, l: &str, c: &str, v: &str) -> Value {
        json!({ "1. open": o, "2. high": h, "3. low": l, "4. close": c, "5. volume": v })
    }

    #[test]
    fn global_quote_is_parsed() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "05. price": "134.5000",
                "07. latest trading day": "2024-03-01",
                "09. change": "-1.2500",
                "10. change percent": "-0.9208%"
            }
        });

        let quote = parse_global_quote(&body, "IBM").unwrap();
        assert_eq!(quote.price, dec!(134.5));
        assert_eq!(quote.change, dec!(-1.25));
        assert_eq!(quote.change_percent, dec!(-0.9208));
        assert_eq!(quote.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn empty_global_quote_means_unknown_symbol() {
        let body = json!({ "Global Quote": {} });
        assert!(matches!(
            parse_global_quote(&body, "ZZZZ"),
            Err(MarketError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn throttle_note_is_detected() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage! ..." });
        assert!(matches!(check_throttled(&body), Err(MarketError::RateLimited(_))));
        assert!(check_throttled(&json!({ "Global Quote": {} })).is_ok());
    }

    #[test]
    fn series_is_sorted_oldest_first() {
        let body = json!({
            "Meta Data": { "2. Symbol": "IBM" },
            "Time Series (Daily)": {
                "2024-03-04": point("2", "3", "1", "2.5", "1000"),
                "2024-03-01": point("1", "2", "0.5", "1.5", "900"),
            }
        });

        let candles = parse_time_series(&body, "IBM").unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, dec!(1.5));
        assert_eq!(candles[1].volume, 1000);
    }

    #[test]
    fn intraday_timestamps_are_parsed() {
        let body = json!({
            "Time Series (5min)": {
                "2024-03-01 15:55:00": point("1", "1", "1", "1", "10"),
            }
        });

        let candles = parse_time_series(&body, "IBM").unwrap();
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 15, 55, 0).unwrap()
        );
    }

    #[test]
    fn range_trimming_drops_old_candles() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let candle = |day| Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            volume: 0,
        };

        let trimmed = trim_to_range(vec![candle(1), candle(6), candle(9)], HistoryRange::FiveDays, now);
        assert_eq!(trimmed.len(), 2);

        let all = trim_to_range(vec![candle(1), candle(9)], HistoryRange::Max, now);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn symbol_search_maps_best_matches() {
        let body = json!({
            "bestMatches": [
                { "1. symbol": "TSCO.LON", "2. name": "Tesco PLC", "3. type": "Equity", "4. region": "United Kingdom" },
                { "2. name": "no symbol, skipped" }
            ]
        });

        let matches = parse_symbol_search(&body);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].symbol, "TSCO.LON");
        assert_eq!(matches[0].kind.as_deref(), Some("Equity"));
    }
}
