//! Typed server settings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::{Checks, ConfigError, EnvLoader, Result, Validate};

/// Origins always allowed by CORS; `CORS_ORIGINS` adds to this list.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8000",
    "http://127.0.0.1:5500",
];

/// Settings for the pushcast server process.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Interface to bind (`HOST`)
    pub host: String,
    /// Port to bind (`PORT`)
    pub port: u16,
    /// Debug mode; raises the default log level (`DEBUG`)
    pub debug: bool,
    /// FCM service account JSON (`SERVICE_ACCOUNT_PATH`)
    pub service_account_path: PathBuf,
    /// Registry size that triggers eviction of inactive tokens (`MAX_TOKENS`)
    pub max_tokens: usize,
    /// Allowed cross-origin hosts (`CORS_ORIGINS`, comma-separated extras)
    pub cors_origins: Vec<String>,
    /// Upper bound on a single delivery attempt (`SEND_TIMEOUT_SECS`)
    pub send_timeout: Duration,
    /// Deliveries in flight during one broadcast (`SEND_CONCURRENCY`)
    pub send_concurrency: usize,
    /// Feed broadcast outcomes back into the registry (`APPLY_DELIVERY_FEEDBACK`)
    pub apply_feedback: bool,
    /// Value of the `server` key added to every data payload (`PROVIDER_TAG`)
    pub provider_tag: String,
    /// Log file receiving a copy of every event; `None` disables (`LOG_FILE`)
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            debug: true,
            service_account_path: PathBuf::from("serviceAccountKey.json"),
            max_tokens: 10_000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            send_timeout: Duration::from_secs(10),
            send_concurrency: 32,
            apply_feedback: true,
            provider_tag: "pushcast-fcm".to_string(),
            log_file: Some(PathBuf::from("pushcast.log")),
        }
    }
}

impl ServerConfig {
    /// Load `.env` (optional unless `dotenv` is given), read the process
    /// environment, and validate.
    pub fn load(dotenv: Option<&Path>) -> Result<Self> {
        let loader = EnvLoader::default();
        loader.load_dotenv(dotenv)?;
        Self::from_map(&loader.load())
    }

    /// Build from a lower-cased variable map as produced by [`EnvLoader`].
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let mut cors_origins = defaults.cors_origins.clone();
        if let Some(extra) = get("cors_origins") {
            cors_origins.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string),
            );
        }

        // An explicitly empty LOG_FILE disables file logging.
        let log_file = match vars.get("log_file") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path.trim())),
            None => defaults.log_file,
        };

        let config = Self {
            host: get("host").map(str::to_string).unwrap_or(defaults.host),
            port: parse_or(get("port"), "PORT", defaults.port)?,
            debug: get("debug").map(parse_flag).unwrap_or(defaults.debug),
            service_account_path: get("service_account_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.service_account_path),
            max_tokens: parse_or(get("max_tokens"), "MAX_TOKENS", defaults.max_tokens)?,
            cors_origins,
            send_timeout: Duration::from_secs(parse_or(
                get("send_timeout_secs"),
                "SEND_TIMEOUT_SECS",
                defaults.send_timeout.as_secs(),
            )?),
            send_concurrency: parse_or(
                get("send_concurrency"),
                "SEND_CONCURRENCY",
                defaults.send_concurrency,
            )?,
            apply_feedback: get("apply_delivery_feedback")
                .map(parse_flag)
                .unwrap_or(defaults.apply_feedback),
            provider_tag: get("provider_tag")
                .map(str::to_string)
                .unwrap_or(defaults.provider_tag),
            log_file,
        };

        config.validate()?;
        Ok(config)
    }

    /// `host:port` for display and binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        let mut checks = Checks::new();
        checks
            .present("HOST", &self.host)
            .within("PORT", self.port, 1, u16::MAX)
            .present("SERVICE_ACCOUNT_PATH", &self.service_account_path.to_string_lossy())
            .within("MAX_TOKENS", self.max_tokens, 1, 10_000_000)
            .within("SEND_TIMEOUT_SECS", self.send_timeout.as_secs(), 1, 300)
            .within("SEND_CONCURRENCY", self.send_concurrency, 1, 1024)
            .present("PROVIDER_TAG", &self.provider_tag);
        for origin in &self.cors_origins {
            checks.origin("CORS_ORIGINS", origin);
        }
        checks.finish()
    }
}

fn parse_or<T>(value: Option<&str>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
