use thiserror::Error;

pub type MarketResult<T> = std::result::Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("upstream rate limit: {0}")]
    RateLimited(String),
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
    #[error("invalid history parameter: {0}")]
    InvalidParameter(String),
    #[error("provider requires an api key")]
    MissingApiKey,
}

impl MarketError {
    /// Errors caused by the caller's input rather than the upstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSymbol(_) | Self::InvalidParameter(_) | Self::SymbolNotFound(_)
        )
    }
}
