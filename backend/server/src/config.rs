use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::rate_limit::RateLimitConfig;

pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub static_dir: PathBuf,
    pub secure_cookies: bool,
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_path: PathBuf::from("data.json"),
            static_dir: PathBuf::from("public"),
            secure_cookies: false,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let secure_cookies = var("APP_ENV").is_ok_and(|mode| mode == "production");
        if secure_cookies {
            info!("Production mode, voter cookies are marked Secure");
        }

        Ok(Self {
            port: try_load("PORT", "3000")?,
            data_path: try_load("DATA_PATH", "data.json")?,
            static_dir: try_load("STATIC_DIR", "public")?,
            secure_cookies,
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(try_load("RATE_LIMIT_WINDOW_SECS", "60")?),
                max: try_load("RATE_LIMIT_MAX", "12")?,
            },
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.data_path, PathBuf::from("data.json"));
        assert!(!config.secure_cookies);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.rate_limit.max, 12);
    }

    #[test]
    fn test_try_load_default_and_invalid() {
        let port: u16 = try_load("POLL_TEST_UNSET_PORT", "3000").unwrap();
        assert_eq!(port, 3000);

        let bad: Result<u16> = try_load("POLL_TEST_UNSET_PORT", "not-a-port");
        assert!(bad.is_err());
    }
}
