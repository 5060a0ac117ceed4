//! Common types used across the client.
//!
//! This module defines data structures for relayed transactions, receipts,
//! and other chain-related entities.

use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction hash type
pub type TransactionHash = String;

/// Relayer-assigned transaction ID
pub type RelayerTxId = String;

/// Status of a transaction handed to the relayer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayerTxStatus {
    /// Accepted by the relayer, not yet signed
    Pending,
    /// Signed and sent to the network
    Sent,
    /// Submitted to a node
    Submitted,
    /// Seen in the mempool
    Inmempool,
    /// Included in a block
    Mined,
    /// Included with enough confirmations
    Confirmed,
    /// Reverted or dropped
    Failed,
}

impl RelayerTxStatus {
    /// Whether the relayer is done with the transaction
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            RelayerTxStatus::Mined | RelayerTxStatus::Confirmed | RelayerTxStatus::Failed
        )
    }
}

impl fmt::Display for RelayerTxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayerTxStatus::Pending => write!(f, "PENDING"),
            RelayerTxStatus::Sent => write!(f, "SENT"),
            RelayerTxStatus::Submitted => write!(f, "SUBMITTED"),
            RelayerTxStatus::Inmempool => write!(f, "INMEMPOOL"),
            RelayerTxStatus::Mined => write!(f, "MINED"),
            RelayerTxStatus::Confirmed => write!(f, "CONFIRMED"),
            RelayerTxStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Transaction request sent to the relayer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// Target contract
    pub to: Address,
    /// Calldata
    pub data: Bytes,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas price speed hint
    pub speed: String,
}

/// Transaction as reported by the relayer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedTransaction {
    /// Relayer-assigned ID
    pub transaction_id: RelayerTxId,
    /// Transaction hash (may change while the relayer re-prices)
    pub hash: Option<TransactionHash>,
    /// Current status
    pub status: RelayerTxStatus,
    /// Target contract
    #[serde(default)]
    pub to: Option<Address>,
    /// Nonce used by the relayer
    #[serde(default)]
    pub nonce: Option<u64>,
    /// When the relayer accepted the transaction
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Relevant part of an `eth_getTransactionReceipt` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    /// Transaction hash
    pub transaction_hash: TransactionHash,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Whether execution succeeded
    pub success: bool,
    /// Gas used
    pub gas_used: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relayer_status_display() {
        assert_eq!(RelayerTxStatus::Pending.to_string(), "PENDING");
        assert_eq!(RelayerTxStatus::Inmempool.to_string(), "INMEMPOOL");
        assert_eq!(RelayerTxStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_relayer_status_serde() {
        let json = serde_json::to_string(&RelayerTxStatus::Mined).unwrap();
        assert_eq!(json, "\"mined\"");

        let status: RelayerTxStatus = serde_json::from_str("\"inmempool\"").unwrap();
        assert_eq!(status, RelayerTxStatus::Inmempool);
        assert!(!status.is_final());
        assert!(RelayerTxStatus::Confirmed.is_final());
    }

    #[test]
    fn test_relayed_transaction_deserialize() {
        let tx: RelayedTransaction = serde_json::from_value(serde_json::json!({
            "transactionId": "abc-123",
            "hash": "0xdeadbeef",
            "status": "sent",
            "nonce": 42,
            "sentAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(tx.transaction_id, "abc-123");
        assert_eq!(tx.hash.as_deref(), Some("0xdeadbeef"));
        assert_eq!(tx.status, RelayerTxStatus::Sent);
        assert_eq!(tx.nonce, Some(42));
        assert!(tx.to.is_none());
        assert!(tx.sent_at.is_some());
    }

    #[test]
    fn test_relay_request_serialize() {
        let request = RelayRequest {
            to: Address::zero(),
            data: Bytes::from(vec![0xde, 0xad]),
            gas_limit: 500_000,
            speed: "fast".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["gasLimit"], 500_000);
        assert_eq!(json["data"], "0xdead");
    }
}
