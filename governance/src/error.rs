//! Error types for the governance decision core.
//!
//! The threshold detector itself never fails; the errors here come from
//! input conversion, the persisted ignore-set, and the tracker's
//! collaborators (chain queries, transaction submission, key-value store).

use crate::proposal::ProposalId;
use thiserror::Error;

/// Main error type for governance tracking operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// Querying a proposal's on-chain state failed transiently
    #[error("Proposal {id} query failed: {message}")]
    ProposalQuery {
        /// Proposal being queried
        id: ProposalId,
        /// Underlying failure
        message: String,
    },

    /// Chain returned proposal data that cannot be decoded
    #[error("Proposal {id} returned invalid data: {message}")]
    InvalidProposalData {
        /// Proposal being queried
        id: ProposalId,
        /// Decode failure
        message: String,
    },

    /// Counting proposals on chain failed
    #[error("Proposal count query failed: {0}")]
    ProposalCount(String),

    /// Queue/execute submission failed
    #[error("Failed to submit {action}: {message}")]
    Submission {
        /// Human readable action, e.g. `queue(12)`
        action: String,
        /// Underlying failure
        message: String,
    },

    /// Key-value store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Persisted ignore-set could not be parsed
    #[error("Invalid ignore set: {0}")]
    InvalidIgnoreSet(String),

    /// Amount could not be converted to a decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Chain reported a state ordinal outside the known lifecycle
    #[error("Unknown proposal state: {0}")]
    UnknownProposalState(u8),
}

impl GovernanceError {
    /// Whether the failed operation may succeed on a later poll cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GovernanceError::ProposalQuery { .. }
                | GovernanceError::ProposalCount(_)
                | GovernanceError::Submission { .. }
                | GovernanceError::Store(_)
        )
    }
}

/// Result type alias for governance operations
pub type Result<T> = std::result::Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::ProposalQuery {
            id: 7,
            message: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "Proposal 7 query failed: connection reset");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(GovernanceError::Store("down".to_string()).is_retryable());
        assert!(GovernanceError::Submission {
            action: "queue(1)".to_string(),
            message: "relayer busy".to_string(),
        }
        .is_retryable());
        assert!(!GovernanceError::InvalidIgnoreSet("x".to_string()).is_retryable());
        assert!(!GovernanceError::UnknownProposalState(9).is_retryable());
        assert!(!GovernanceError::InvalidProposalData {
            id: 3,
            message: "short output".to_string(),
        }
        .is_retryable());
    }
}
