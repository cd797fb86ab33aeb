//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub queue_name: String,
    pub bind_addr: String,
    pub visibility_timeout: Duration,
    pub poll_interval: Duration,
    pub max_concurrent_workflows: usize,
    pub metrics_url: Option<String>,
    pub cost_url: Option<String>,
    pub prediction_url: Option<String>,
    pub prediction_api_key: Option<SecretString>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            queue_name: optional_var("QUEUE_NAME").unwrap_or_else(|| "work_requests".to_string()),
            bind_addr: optional_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            visibility_timeout: Duration::from_secs(parsed_var("VISIBILITY_TIMEOUT_SECS", 60)?),
            poll_interval: Duration::from_millis(parsed_var("POLL_INTERVAL_MS", 1000)?),
            max_concurrent_workflows: parsed_var("MAX_CONCURRENT_WORKFLOWS", 8)?,
            metrics_url: optional_var("METRICS_URL"),
            cost_url: optional_var("COST_URL"),
            prediction_url: optional_var("PREDICTION_URL"),
            prediction_api_key: optional_var("PREDICTION_API_KEY").map(SecretString::from),
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Endpoints of the external data providers. Only processes that run the
/// fulfillment worker need these.
#[derive(Debug)]
pub struct ProviderEndpoints {
    pub metrics_url: String,
    pub cost_url: String,
    pub prediction_url: String,
    pub prediction_api_key: Option<SecretString>,
}

impl ProviderEndpoints {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            metrics_url: require(&config.metrics_url, "METRICS_URL")?,
            cost_url: require(&config.cost_url, "COST_URL")?,
            prediction_url: require(&config.prediction_url, "PREDICTION_URL")?,
            prediction_api_key: config
                .prediction_api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_string())),
        })
    }
}

fn require(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| Error::Config(format!("{name} must be set to run the fulfillment worker")))
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}
