//! Error types for the Ethereum integration layer.
//!
//! This module defines all error types that can occur while talking to the
//! JSON-RPC node and the transaction relayer, including network errors,
//! contract reverts, and validation errors.

use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// JSON-RPC node returned an error
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Contract call reverted
    #[error("Execution reverted: {0}")]
    ExecutionReverted(String),

    /// Relayer API returned an error
    #[error("Relayer error: {0}")]
    RelayerError(String),

    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Transaction submission failed
    #[error("Transaction submission failed: {0}")]
    TransactionSubmissionError(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// ABI encoding/decoding error
    #[error("ABI error: {0}")]
    AbiError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {0} seconds")]
    RateLimitExceeded(u64),

    /// Max retries exceeded
    #[error("Max retries ({0}) exceeded")]
    MaxRetriesExceeded(usize),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Chain data outside the governance model
    #[error("Governance error: {0}")]
    Governance(#[from] compound_governance::GovernanceError),
}

impl From<ethers::abi::Error> for ClientError {
    fn from(err: ethers::abi::Error) -> Self {
        ClientError::AbiError(err.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error context for retryable operations
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Number of attempts made
    pub attempts: usize,
    /// Last error encountered
    pub last_error: String,
    /// Total time spent waiting between attempts (in milliseconds)
    pub total_time_ms: u64,
}

impl RetryContext {
    /// Create a new retry context
    pub fn new() -> Self {
        Self {
            attempts: 0,
            last_error: String::new(),
            total_time_ms: 0,
        }
    }

    /// Record an attempt
    pub fn record_attempt(&mut self, error: &str, duration_ms: u64) {
        self.attempts += 1;
        self.last_error = error.to_string();
        self.total_time_ms += duration_ms;
    }
}

impl Default for RetryContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::RpcError("header not found".to_string());
        assert_eq!(err.to_string(), "RPC error: header not found");
    }

    #[test]
    fn test_governance_error_conversion() {
        let err: ClientError = compound_governance::GovernanceError::UnknownProposalState(9).into();
        assert_eq!(err.to_string(), "Governance error: Unknown proposal state: 9");
    }

    #[test]
    fn test_retry_context() {
        let mut ctx = RetryContext::new();
        assert_eq!(ctx.attempts, 0);

        ctx.record_attempt("error 1", 100);
        assert_eq!(ctx.attempts, 1);
        assert_eq!(ctx.last_error, "error 1");
        assert_eq!(ctx.total_time_ms, 100);

        ctx.record_attempt("error 2", 200);
        assert_eq!(ctx.attempts, 2);
        assert_eq!(ctx.last_error, "error 2");
        assert_eq!(ctx.total_time_ms, 300);
    }
}
