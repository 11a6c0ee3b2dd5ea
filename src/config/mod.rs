//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on missing or malformed values.
//! The database URL is wrapped in `SecretString` so it never reaches a log.
//! Cluster credentials are not configured here; `kube::Client::try_default`
//! picks up the in-cluster service account or the local kubeconfig.

pub mod secrets;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Error, Result};

pub const DEFAULT_EVENT_QUEUE: &str = "pod_events";
pub const DEFAULT_LOG_QUEUE: &str = "pod_logs";

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    /// Upper bound on pooled Postgres connections.
    pub db_max_connections: u32,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// Namespace to watch; all namespaces when unset.
    pub watch_namespace: Option<String>,
    /// Stamped onto every classified event.
    pub cluster_name: Option<String>,
    /// Delay before re-evaluating a pod whose status is not populated yet.
    pub requeue_after: Duration,
    /// Delay before retrying a pass that failed on a transport error.
    pub error_requeue_after: Duration,
    pub event_queue: String,
    pub log_queue: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", 10)?,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            watch_namespace: optional_var("WATCH_NAMESPACE"),
            cluster_name: optional_var("CLUSTER_NAME"),
            requeue_after: seconds_var("REQUEUE_AFTER_SECS", 5)?,
            error_requeue_after: seconds_var("ERROR_REQUEUE_SECS", 30)?,
            event_queue: optional_var("EVENT_QUEUE")
                .unwrap_or_else(|| DEFAULT_EVENT_QUEUE.to_string()),
            log_queue: optional_var("LOG_QUEUE").unwrap_or_else(|| DEFAULT_LOG_QUEUE.to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name)
        .ok_or_else(|| Error::Config(format!("required environment variable {name} is not set")))
}

/// Unset and empty are the same thing.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{name}={raw:?}: {e}"))),
    }
}

fn seconds_var(name: &str, default: u64) -> Result<Duration> {
    parsed_var(name, default).map(Duration::from_secs)
}
