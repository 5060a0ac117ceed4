//! Relayed transaction monitoring.
//!
//! This module provides utilities for following a transaction handed to
//! the relayer until it is mined, fails, or the wait times out.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::relayer::RelayerClient;
use crate::rpc::EthRpcClient;
use crate::types::{ReceiptSummary, RelayedTransaction, RelayerTxStatus};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Relayed transaction monitor
#[derive(Clone)]
pub struct TransactionMonitor {
    /// Relayer client
    relayer: RelayerClient,
    /// JSON-RPC client for receipts
    rpc: EthRpcClient,
}

/// Monitoring options
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Poll interval (in milliseconds)
    pub poll_interval_ms: u64,
    /// Timeout (in seconds)
    pub timeout_secs: u64,
    /// Whether to check the receipt on chain once the relayer reports it mined
    pub verify_receipt: bool,
}

impl MonitorOptions {
    /// Create from client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            poll_interval_ms: config.tx_poll_interval_ms,
            timeout_secs: config.tx_timeout_secs,
            verify_receipt: true,
        }
    }

    /// Trust the relayer status without checking the receipt
    pub fn without_receipt(mut self) -> Self {
        self.verify_receipt = false;
        self
    }

    /// Set custom poll interval
    pub fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Transaction monitoring result
#[derive(Debug, Clone)]
pub enum MonitorResult {
    /// Relayer reports the transaction mined
    Mined(RelayedTransaction),
    /// Receipt found on chain with a successful status
    Confirmed(ReceiptSummary),
    /// Transaction failed or reverted
    Failed(String),
    /// Transaction timed out
    Timeout,
}

impl TransactionMonitor {
    /// Create a new transaction monitor
    pub fn new(relayer: RelayerClient, rpc: EthRpcClient) -> Self {
        Self { relayer, rpc }
    }

    /// Follow a relayed transaction until it completes or times out
    pub async fn monitor(
        &self,
        transaction_id: &str,
        options: MonitorOptions,
    ) -> Result<MonitorResult> {
        info!(
            "Monitoring relayed transaction: {} (timeout: {}s)",
            transaction_id, options.timeout_secs
        );

        let start = Instant::now();
        let timeout = Duration::from_secs(options.timeout_secs);
        let poll_interval = Duration::from_millis(options.poll_interval_ms);

        loop {
            if start.elapsed() >= timeout {
                warn!("Transaction monitoring timed out: {}", transaction_id);
                return Ok(MonitorResult::Timeout);
            }

            match self.relayer.get_transaction(transaction_id).await {
                Ok(tx) => match tx.status {
                    RelayerTxStatus::Failed => {
                        warn!("Relayed transaction failed: {}", transaction_id);
                        return Ok(MonitorResult::Failed(format!(
                            "Relayer reported {} as failed",
                            transaction_id
                        )));
                    }
                    RelayerTxStatus::Mined | RelayerTxStatus::Confirmed => {
                        if !options.verify_receipt {
                            info!("Relayed transaction mined: {}", transaction_id);
                            return Ok(MonitorResult::Mined(tx));
                        }
                        if let Some(result) = self.check_receipt(&tx).await? {
                            return Ok(result);
                        }
                    }
                    status => {
                        debug!("Relayed transaction {} is {}", transaction_id, status);
                    }
                },
                Err(ClientError::TransactionNotFound(_)) => {
                    debug!("Relayer does not know {} yet", transaction_id);
                }
                Err(e) => {
                    debug!("Error fetching relayed transaction: {:?}", e);
                }
            }

            sleep(poll_interval).await;
        }
    }

    async fn check_receipt(&self, tx: &RelayedTransaction) -> Result<Option<MonitorResult>> {
        let hash = match &tx.hash {
            Some(hash) => hash,
            None => return Ok(None),
        };

        match self.rpc.get_transaction_receipt(hash).await? {
            Some(receipt) if receipt.success => {
                info!(
                    "Transaction {} confirmed in block {}",
                    hash, receipt.block_number
                );
                Ok(Some(MonitorResult::Confirmed(receipt)))
            }
            Some(receipt) => {
                warn!("Transaction {} reverted", hash);
                Ok(Some(MonitorResult::Failed(format!(
                    "Transaction {} reverted in block {}",
                    hash, receipt.block_number
                ))))
            }
            None => Ok(None),
        }
    }

    /// Wait for a relayed transaction (simplified interface)
    ///
    /// Returns true if the transaction succeeded, false if it failed or timed out
    pub async fn wait_for_confirmation(
        &self,
        transaction_id: &str,
        config: &ClientConfig,
    ) -> Result<bool> {
        let result = self
            .monitor(transaction_id, MonitorOptions::from_config(config))
            .await?;

        match result {
            MonitorResult::Mined(_) | MonitorResult::Confirmed(_) => Ok(true),
            MonitorResult::Failed(_) | MonitorResult::Timeout => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_options_from_config() {
        let config = ClientConfig::mainnet();
        let options = MonitorOptions::from_config(&config);
        assert_eq!(options.poll_interval_ms, config.tx_poll_interval_ms);
        assert_eq!(options.timeout_secs, config.tx_timeout_secs);
        assert!(options.verify_receipt);
    }

    #[test]
    fn test_monitor_options_builder() {
        let options = MonitorOptions::from_config(&ClientConfig::mainnet())
            .without_receipt()
            .with_poll_interval(500)
            .with_timeout(120);

        assert!(!options.verify_receipt);
        assert_eq!(options.poll_interval_ms, 500);
        assert_eq!(options.timeout_secs, 120);
    }
}
