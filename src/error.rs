//! Error types for incident-agent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid incident id: {0}")]
    InvalidIncidentId(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the controller should retry the pass that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Kube(_) | Error::Database(_) | Error::Dispatch(_) | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
