//! Ethereum JSON-RPC client.
//!
//! This module provides a thin client for the handful of JSON-RPC methods
//! the monitors need: read-only contract calls, block numbers and
//! timestamps, and transaction receipts.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::retry::{retry_after_secs, RetryStrategy};
use crate::types::ReceiptSummary;
use ethers::abi::{self, ParamType};
use ethers::types::{Address, Bytes, U64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// JSON-RPC request ID type
type RequestId = u64;

/// Selector of Solidity's `Error(string)`
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Ethereum JSON-RPC client
#[derive(Clone)]
pub struct EthRpcClient {
    /// HTTP client
    client: Client,
    /// Node URL
    url: String,
    /// Retry strategy
    retry_strategy: RetryStrategy,
    /// Request ID counter
    request_id: Arc<AtomicU64>,
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: RequestId,
    method: String,
    params: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl JsonRpcError {
    fn is_revert(&self) -> bool {
        self.code == 3 || self.message.contains("execution reverted")
    }

    /// Revert reason, decoded from `Error(string)` data when present
    fn revert_reason(&self) -> String {
        let data = match &self.data {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(obj)) => obj.get("data").and_then(Value::as_str),
            _ => None,
        };

        data.and_then(decode_revert_string)
            .unwrap_or_else(|| self.message.clone())
    }
}

fn decode_revert_string(data: &str) -> Option<String> {
    let bytes: Bytes = data.parse().ok()?;
    if bytes.len() < 4 || bytes[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    abi::decode(&[ParamType::String], &bytes[4..])
        .ok()?
        .into_iter()
        .next()?
        .into_string()
}

impl EthRpcClient {
    /// Create a new JSON-RPC client
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::NetworkError)?;

        Ok(Self {
            client,
            url: config.rpc_url.clone(),
            retry_strategy: RetryStrategy::from_config(&config),
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Get next request ID
    fn next_request_id(&self) -> RequestId {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a JSON-RPC call
    async fn call_rpc(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_request_id(),
            method: method.to_string(),
            params,
        };

        debug!("RPC request: {} (id: {})", method, request.id);

        self.retry_strategy
            .retry(|| async {
                let response = self
                    .client
                    .post(&self.url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(ClientError::NetworkError)?;

                let status = response.status();
                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(ClientError::RateLimitExceeded(retry_after_secs(
                        response.headers(),
                    )));
                }
                if !status.is_success() {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(ClientError::RpcError(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }

                let rpc_response: JsonRpcResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

                if let Some(error) = rpc_response.error {
                    if error.is_revert() {
                        return Err(ClientError::ExecutionReverted(error.revert_reason()));
                    }
                    error!("RPC error: {} (code: {})", error.message, error.code);
                    return Err(ClientError::RpcError(format!(
                        "{} (code: {})",
                        error.message, error.code
                    )));
                }

                Ok(rpc_response.result.unwrap_or(Value::Null))
            })
            .await
    }

    fn parse_quantity(value: Value, what: &str) -> Result<u64> {
        let quantity: U64 = serde_json::from_value(value)
            .map_err(|e| ClientError::InvalidResponse(format!("Bad {}: {}", what, e)))?;
        Ok(quantity.as_u64())
    }

    /// Latest block number
    pub async fn block_number(&self) -> Result<u64> {
        let result = self.call_rpc("eth_blockNumber", json!([])).await?;
        Self::parse_quantity(result, "block number")
    }

    /// Chain ID reported by the node
    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.call_rpc("eth_chainId", json!([])).await?;
        Self::parse_quantity(result, "chain id")
    }

    /// Timestamp of the latest block
    pub async fn latest_block_timestamp(&self) -> Result<u64> {
        let block = self
            .call_rpc("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        if block.is_null() {
            return Err(ClientError::InvalidResponse(
                "Latest block missing".to_string(),
            ));
        }
        Self::parse_quantity(block["timestamp"].clone(), "block timestamp")
    }

    /// Read-only contract call against the latest block
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let result = self
            .call_rpc("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;

        serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(format!("Bad call result: {}", e)))
    }

    /// Receipt of a mined transaction, `None` while pending
    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<ReceiptSummary>> {
        let receipt = self
            .call_rpc("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if receipt.is_null() {
            return Ok(None);
        }

        Ok(Some(ReceiptSummary {
            transaction_hash: tx_hash.to_string(),
            block_number: Self::parse_quantity(receipt["blockNumber"].clone(), "block number")?,
            success: Self::parse_quantity(receipt["status"].clone(), "status")? == 1,
            gas_used: Self::parse_quantity(receipt["gasUsed"].clone(), "gas used")?,
        }))
    }

    /// Health check - verify the node answers
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Performing RPC health check");

        match self.block_number().await {
            Ok(block) => {
                info!("RPC health check passed at block {}", block);
                Ok(true)
            }
            Err(e) => {
                error!("RPC health check failed: {:?}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_config() -> Arc<ClientConfig> {
        Arc::new(
            ClientConfig::mainnet()
                .with_request_timeout(Duration::from_secs(10))
                .with_max_retries(1),
        )
    }

    #[test]
    fn test_request_id_increment() {
        let client = EthRpcClient::new(create_test_config()).unwrap();

        assert_eq!(client.next_request_id(), 1);
        assert_eq!(client.next_request_id(), 2);
        assert_eq!(client.next_request_id(), 3);
    }

    #[test]
    fn test_decode_revert_string() {
        let encoded = abi::encode(&[abi::Token::String(
            "GovernorBravo::state: invalid proposal id".to_string(),
        )]);
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(encoded);
        let hex_data = format!("{}", Bytes::from(data));

        assert_eq!(
            decode_revert_string(&hex_data).as_deref(),
            Some("GovernorBravo::state: invalid proposal id")
        );
        assert_eq!(decode_revert_string("0x1234"), None);
    }

    #[test]
    fn test_revert_detection() {
        let error: JsonRpcError = serde_json::from_value(json!({
            "code": -32000,
            "message": "execution reverted: GovernorBravo::state: invalid proposal id"
        }))
        .unwrap();
        assert!(error.is_revert());
        assert_eq!(
            error.revert_reason(),
            "execution reverted: GovernorBravo::state: invalid proposal id"
        );

        let other: JsonRpcError = serde_json::from_value(json!({
            "code": -32602,
            "message": "invalid argument"
        }))
        .unwrap();
        assert!(!other.is_revert());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(EthRpcClient::parse_quantity(json!("0x10"), "n").unwrap(), 16);
        assert!(EthRpcClient::parse_quantity(json!(null), "n").is_err());
    }
}
