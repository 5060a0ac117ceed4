//! Compound Ethereum Integration Layer
//!
//! This library connects the governance decision core to Ethereum: it reads
//! GovernorBravo and COMP token state over JSON-RPC and submits governor
//! transactions through a managed relayer.
//!
//! # Features
//!
//! - **JSON-RPC**: read-only contract calls, block numbers and timestamps, receipts
//! - **GovernorBravo**: proposal count, state and eta; `queue`/`execute` calldata
//! - **COMP token**: balances and delegated votes
//! - **Relayer**: submit and follow relayed transactions
//! - **Retry Logic**: exponential backoff for transient network errors and rate limits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use compound_client::{ClientConfig, CompoundClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tracing_subscriber::fmt::init();
//!
//!     let client = CompoundClient::new(Arc::new(ClientConfig::mainnet()))?;
//!     client.health_check().await?;
//!
//!     let count = client.governor().proposal_count().await?;
//!     println!("{} proposals", count);
//!     Ok(())
//! }
//! ```
//!
//! ## Drive the proposal tracker
//!
//! ```rust,no_run
//! use compound_client::{ClientConfig, CompoundClient};
//! use compound_governance::{MemoryStore, ProposalTracker, TrackerConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::mainnet()
//!     .with_relayer("https://relayer.example.com", "key", "secret");
//! let client = CompoundClient::new(Arc::new(config))?;
//!
//! let tracker = ProposalTracker::new(MemoryStore::new(), TrackerConfig::default());
//! let now = client.rpc().latest_block_timestamp().await?;
//! let submitter = client.action_submitter()?;
//! let report = tracker.poll(client.governor(), &submitter, now).await?;
//! println!("submitted {} actions", report.submitted.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod governor;
pub mod monitor;
pub mod relayer;
pub mod retry;
pub mod rpc;
pub mod token;
pub mod types;

pub use config::{ClientConfig, Network};
pub use error::{ClientError, Result};
pub use governor::GovernorBravo;
pub use monitor::{MonitorOptions, MonitorResult, TransactionMonitor};
pub use relayer::{GovernorActionSubmitter, RelayerClient};
pub use retry::RetryStrategy;
pub use rpc::EthRpcClient;
pub use token::CompToken;
pub use types::{
    ReceiptSummary, RelayRequest, RelayedTransaction, RelayerTxId, RelayerTxStatus,
    TransactionHash,
};

use std::sync::Arc;
use tracing::info;

/// Main client bundling the node, contract readers and the relayer.
///
/// This is the primary entry point for talking to Compound on chain.
#[derive(Clone)]
pub struct CompoundClient {
    /// JSON-RPC client
    rpc: EthRpcClient,
    /// Governor reader
    governor: GovernorBravo,
    /// COMP token reader
    comp: CompToken,
    /// Relayer client, when configured
    relayer: Option<RelayerClient>,
    /// Configuration
    config: Arc<ClientConfig>,
}

impl CompoundClient {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use compound_client::{ClientConfig, CompoundClient};
    /// use std::sync::Arc;
    ///
    /// let client = CompoundClient::new(Arc::new(ClientConfig::mainnet())).unwrap();
    /// ```
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing Compound client for network: {:?} (chain {})",
            config.network, config.chain_id
        );

        let rpc = EthRpcClient::new(config.clone())?;
        let relayer = match config.relayer_url {
            Some(_) => Some(RelayerClient::new(config.clone())?),
            None => None,
        };

        Ok(Self {
            governor: GovernorBravo::new(rpc.clone(), config.governor_address),
            comp: CompToken::new(rpc.clone(), config.comp_address),
            rpc,
            relayer,
            config,
        })
    }

    /// Get the JSON-RPC client
    pub fn rpc(&self) -> &EthRpcClient {
        &self.rpc
    }

    /// Get the governor reader
    pub fn governor(&self) -> &GovernorBravo {
        &self.governor
    }

    /// Get the COMP token reader
    pub fn comp(&self) -> &CompToken {
        &self.comp
    }

    /// Get the relayer client
    pub fn relayer(&self) -> Result<&RelayerClient> {
        self.relayer
            .as_ref()
            .ok_or_else(|| ClientError::ConfigError("Relayer is not configured".to_string()))
    }

    /// Submitter relaying governor actions with the configured gas limit
    pub fn action_submitter(&self) -> Result<GovernorActionSubmitter> {
        Ok(GovernorActionSubmitter::new(
            self.relayer()?.clone(),
            self.config.governor_address,
            self.config.relay_gas_limit,
        ))
    }

    /// Monitor for relayed transactions
    pub fn transaction_monitor(&self) -> Result<TransactionMonitor> {
        Ok(TransactionMonitor::new(
            self.relayer()?.clone(),
            self.rpc.clone(),
        ))
    }

    /// Health check - verify the node answers and serves the expected chain
    pub async fn health_check(&self) -> Result<bool> {
        self.rpc.health_check().await?;

        let chain_id = self.rpc.chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(ClientError::ConfigError(format!(
                "Node serves chain {}, expected {}",
                chain_id, self.config.chain_id
            )));
        }
        Ok(true)
    }

    /// Get configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
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
    fn test_client_creation() {
        let client = CompoundClient::new(create_test_config()).unwrap();
        assert_eq!(client.governor().address(), client.config().governor_address);
        assert_eq!(client.comp().address(), client.config().comp_address);
    }

    #[test]
    fn test_relayer_is_optional() {
        let client = CompoundClient::new(create_test_config()).unwrap();
        assert!(client.relayer().is_err());
        assert!(client.action_submitter().is_err());

        let config = ClientConfig::mainnet().with_relayer("https://relayer.example.com", "k", "s");
        let client = CompoundClient::new(Arc::new(config)).unwrap();
        assert!(client.action_submitter().is_ok());
        assert!(client.transaction_monitor().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ClientConfig::mainnet();
        config.max_retries = 0;

        let result = CompoundClient::new(Arc::new(config));
        assert!(result.is_err());
    }
}
