use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market::Quote;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct HistoryQuery {
    /// `1d`, `5d`, `1mo`, `3mo`, `6mo`, `1y`, `2y`, `5y` or `max`.
    pub range: Option<String>,
    /// `1m`, `5m`, `15m`, `30m`, `60m`, `1h`, `1d`, `1wk` or `1mo`.
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct WatchlistBody {
    pub symbol: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub added_at: DateTime<Utc>,
    /// `null` when the quote could not be fetched.
    pub quote: Option<Quote>,
}
