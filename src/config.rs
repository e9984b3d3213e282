use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./expense_tracker.db?mode=rwc";
pub const DEFAULT_LOG_FILE: &str = "./expense_tracker.log";
pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: Option<String>,
    pub anon_key: Option<String>,
    pub database_url: String,
    pub session_resolve_timeout: Duration,
    pub rpc_timeout: Duration,
    pub refresh_margin: Duration,
    pub currency: String,
    pub log_file: PathBuf,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            session_resolve_timeout: Duration::from_millis(5_000),
            rpc_timeout: Duration::from_millis(15_000),
            refresh_margin: Duration::from_secs(60),
            currency: DEFAULT_CURRENCY.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(|name| vars.get(name).cloned())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend_url = non_empty("EXPENSE_BACKEND_URL").map(|u| u.trim_end_matches('/').to_string());
        let anon_key = non_empty("EXPENSE_BACKEND_ANON_KEY");
        if backend_url.is_none() || anon_key.is_none() {
            warn!("backend env not configured; set EXPENSE_BACKEND_URL and EXPENSE_BACKEND_ANON_KEY");
        }

        Ok(Self {
            backend_url,
            anon_key,
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            session_resolve_timeout: millis(
                "EXPENSE_SESSION_TIMEOUT_MS",
                non_empty("EXPENSE_SESSION_TIMEOUT_MS"),
                defaults.session_resolve_timeout,
            )?,
            rpc_timeout: millis(
                "EXPENSE_RPC_TIMEOUT_MS",
                non_empty("EXPENSE_RPC_TIMEOUT_MS"),
                defaults.rpc_timeout,
            )?,
            refresh_margin: match non_empty("EXPENSE_REFRESH_MARGIN_SECS") {
                Some(raw) => Duration::from_secs(parse_u64("EXPENSE_REFRESH_MARGIN_SECS", &raw)?),
                None => defaults.refresh_margin,
            },
            currency: non_empty("EXPENSE_CURRENCY")
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or(defaults.currency),
            log_file: non_empty("EXPENSE_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            log_filter: non_empty("RUST_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

fn millis(name: &'static str, raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        Some(raw) => Ok(Duration::from_millis(parse_u64(name, &raw)?)),
        None => Ok(default),
    }
}

fn parse_u64(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}
