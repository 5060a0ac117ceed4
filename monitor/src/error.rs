/// Error types for the monitoring service
use compound_client::ClientError;
use compound_governance::GovernanceError;
use thiserror::Error;

/// Main error type for the monitoring service
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Redis operation failed
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Ethereum client error (node or relayer)
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Governance tracking error
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    /// Blockchain RPC error from the log provider
    #[error("Blockchain RPC error: {0}")]
    Rpc(String),

    /// Event parsing error
    #[error("Event parsing error: {0}")]
    EventParsing(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid block range
    #[error("Invalid block range: from {from} to {to}")]
    InvalidBlockRange { from: u64, to: u64 },
}

impl From<config::ConfigError> for MonitorError {
    fn from(err: config::ConfigError) -> Self {
        MonitorError::Config(err.to_string())
    }
}

impl MonitorError {
    /// Whether the next cycle may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        match self {
            MonitorError::Cache(_) | MonitorError::Rpc(_) => true,
            MonitorError::Client(e) => compound_client::RetryStrategy::is_retryable(e)
                || matches!(e, ClientError::MaxRetriesExceeded(_)),
            MonitorError::Governance(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;
