//! Environment overrides for secrets and connection strings.
//!
//! Deployments keep `config.toml` free of credentials and pass them through the
//! environment instead (`.env` is loaded by `dotenvy` at startup).

use super::Config;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const REDIS_URL: &str = "REDIS_URL";
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const JWT_REFRESH_SECRET: &str = "JWT_REFRESH_SECRET";
pub const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const BIND_ADDR: &str = "BIND_ADDR";

/// Replaces config values with the ones found by `lookup`. Empty values are ignored.
pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(DATABASE_URL) {
        config.app.database_uri = v;
    }
    if let Some(v) = get(JWT_SECRET) {
        config.app.jwt = v;
    }
    if let Some(v) = get(JWT_REFRESH_SECRET) {
        config.app.refresh_jwt = v;
    }
    if let Some(v) = get(REDIS_URL) {
        config.cache.redis_url = Some(v);
    }
    if let Some(v) = get(ALPHA_VANTAGE_API_KEY) {
        config.market.alpha_vantage_key = Some(v);
    }
    if let Some(v) = get(BIND_ADDR) {
        config.host.bindto = v;
    }

    config
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn base() -> Config {
        Config::from_slice(
            br#"
            [host]
            bindto = "127.0.0.1:5000"

            [app]
            jwt = "file-access"
            refresh_jwt = "file-refresh"
            database_uri = "postgres://file"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn env_values_win_over_file() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (DATABASE_URL, "postgres://env"),
            (JWT_SECRET, "env-access"),
            (REDIS_URL, "redis://127.0.0.1/"),
        ]);

        let config = apply_overrides(base(), |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.app().database_uri(), "postgres://env");
        assert_eq!(config.app().jwt(), "env-access");
        assert_eq!(config.app().refresh_jwt(), "file-refresh");
        assert_eq!(config.cache().redis_url(), Some("redis://127.0.0.1/"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = apply_overrides(base(), |k| (k == JWT_SECRET).then(|| String::from("  ")));
        assert_eq!(config.app().jwt(), "file-access");
    }
}
