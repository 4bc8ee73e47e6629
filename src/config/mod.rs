use rust_decimal::Decimal;
use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config};

mod env;
pub use env::apply_overrides;

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    cache: Cache,
    #[serde(default)]
    market: Market,
    #[serde(default)]
    trading: Trading,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct App {
    jwt: String,
    refresh_jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_access_ttl")]
    access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl")]
    refresh_token_ttl_days: i64,
    admin_email: Option<String>,
    admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
    redis_url: Option<String>,
    #[serde(default = "default_cache_ttl")]
    default_ttl_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketProviderKind {
    Yahoo,
    AlphaVantage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    #[serde(default = "default_provider")]
    provider: MarketProviderKind,
    #[serde(default = "default_yahoo_url")]
    yahoo_base_url: String,
    #[serde(default = "default_alpha_vantage_url")]
    alpha_vantage_base_url: String,
    alpha_vantage_key: Option<String>,
    #[serde(default = "default_quote_ttl")]
    quote_ttl_seconds: u64,
    #[serde(default = "default_series_ttl")]
    series_ttl_seconds: u64,
    #[serde(default = "default_request_timeout")]
    request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trading {
    #[serde(default = "default_initial_balance")]
    initial_balance: Decimal,
    /// How far an explicit order price may sit from the latest quote.
    #[serde(default = "default_price_tolerance")]
    price_tolerance_percent: Decimal,
}

fn default_access_ttl() -> i64 {
    15
}

fn default_refresh_ttl() -> i64 {
    7
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_provider() -> MarketProviderKind {
    MarketProviderKind::Yahoo
}

fn default_yahoo_url() -> String {
    String::from("https://query1.finance.yahoo.com")
}

fn default_alpha_vantage_url() -> String {
    String::from("https://www.alphavantage.co")
}

fn default_quote_ttl() -> u64 {
    60
}

fn default_series_ttl() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    10
}

fn default_initial_balance() -> Decimal {
    Decimal::from(100_000)
}

fn default_price_tolerance() -> Decimal {
    Decimal::from(5)
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            redis_url: None,
            default_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for Market {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            yahoo_base_url: default_yahoo_url(),
            alpha_vantage_base_url: default_alpha_vantage_url(),
            alpha_vantage_key: None,
            quote_ttl_seconds: default_quote_ttl(),
            series_ttl_seconds: default_series_ttl(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for Trading {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            price_tolerance_percent: default_price_tolerance(),
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    let config = Self::from_slice(&bytes)?;
                    Ok(apply_overrides(config, |key| std::env::var(key).ok()))
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        crate::error::log_error(&e);
                        tracing::error!("Unable to load configuration.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        Ok(toml::from_slice(bytes)?)
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    #[inline]
    pub fn market(&self) -> &Market {
        &self.market
    }

    #[inline]
    pub fn trading(&self) -> &Trading {
        &self.trading
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn refresh_jwt(&self) -> &str {
        &self.refresh_jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_ttl_minutes)
    }

    #[inline]
    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_ttl_days)
    }

    /// Credentials of the account created on startup, if both are set.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

impl Cache {
    #[inline]
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref()
    }

    #[inline]
    pub fn default_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Market {
    #[inline]
    pub fn provider(&self) -> MarketProviderKind {
        self.provider
    }

    #[inline]
    pub fn yahoo_base_url(&self) -> &str {
        &self.yahoo_base_url
    }

    #[inline]
    pub fn alpha_vantage_base_url(&self) -> &str {
        &self.alpha_vantage_base_url
    }

    #[inline]
    pub fn alpha_vantage_key(&self) -> Option<&str> {
        self.alpha_vantage_key.as_deref()
    }

    #[inline]
    pub fn quote_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.quote_ttl_seconds)
    }

    #[inline]
    pub fn series_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.series_ttl_seconds)
    }

    #[inline]
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Trading {
    #[inline]
    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    #[inline]
    pub fn price_tolerance_percent(&self) -> Decimal {
        self.price_tolerance_percent
    }
}
