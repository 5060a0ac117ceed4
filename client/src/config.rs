//! Network and endpoint configuration for the JSON-RPC node and relayer.
//!
//! This module provides configuration for connecting to Ethereum networks,
//! the Compound governance contract addresses on them, and the transaction
//! relayer used to submit governor calls.

use crate::error::{ClientError, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// GovernorBravo delegator on mainnet
pub const MAINNET_GOVERNOR: &str = "0xc0Da02939E1441F497fd74F78cE7Decb17B66529";

/// COMP token on mainnet
pub const MAINNET_COMP: &str = "0xc00e94Cb662C3520282E6f5717214004A7f26888";

/// cCOMP market on mainnet
pub const MAINNET_CCOMP: &str = "0x70e36f6BF80a52b3B46b3aF8e106CC0ed743E8e4";

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Ethereum mainnet
    Mainnet,
    /// Custom network with user-defined endpoints and contracts
    Custom,
}

impl Network {
    /// Chain ID of the network, if fixed
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::Mainnet => Some(1),
            Network::Custom => None,
        }
    }

    /// Get the default JSON-RPC URL for this network
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://cloudflare-eth.com",
            Network::Custom => "",
        }
    }
}

/// Configuration for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Network to connect to
    pub network: Network,

    /// Expected chain ID
    pub chain_id: u64,

    /// JSON-RPC endpoint URL
    pub rpc_url: String,

    /// Relayer API base URL (needed only to submit transactions)
    pub relayer_url: Option<String>,

    /// Relayer API key
    pub relayer_api_key: Option<String>,

    /// Relayer API secret
    pub relayer_api_secret: Option<String>,

    /// GovernorBravo contract
    pub governor_address: Address,

    /// COMP token contract
    pub comp_address: Address,

    /// cCOMP market contract
    pub ccomp_address: Address,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Maximum number of retries for failed requests
    pub max_retries: usize,

    /// Initial retry delay (in milliseconds)
    pub retry_initial_delay_ms: u64,

    /// Maximum retry delay (in milliseconds)
    pub retry_max_delay_ms: u64,

    /// Retry backoff multiplier
    pub retry_multiplier: f64,

    /// Relayed transaction polling interval (in milliseconds)
    pub tx_poll_interval_ms: u64,

    /// Relayed transaction timeout (in seconds)
    pub tx_timeout_secs: u64,

    /// Gas limit for relayed governor calls
    pub relay_gas_limit: u64,
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value)
        .map_err(|e| ClientError::ConfigError(format!("Invalid address {}: {}", value, e)))
}

impl ClientConfig {
    /// Create the mainnet configuration
    pub fn mainnet() -> Self {
        let network = Network::Mainnet;
        Self {
            network,
            chain_id: 1,
            rpc_url: network.default_rpc_url().to_string(),
            relayer_url: None,
            relayer_api_key: None,
            relayer_api_secret: None,
            governor_address: Address::from_str(MAINNET_GOVERNOR).unwrap_or_default(),
            comp_address: Address::from_str(MAINNET_COMP).unwrap_or_default(),
            ccomp_address: Address::from_str(MAINNET_CCOMP).unwrap_or_default(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 5000,
            retry_multiplier: 2.0,
            tx_poll_interval_ms: 2000,
            tx_timeout_secs: 300,
            relay_gas_limit: 1_000_000,
        }
    }

    /// Create a custom configuration
    pub fn custom(
        chain_id: u64,
        rpc_url: String,
        governor_address: &str,
        comp_address: &str,
        ccomp_address: &str,
    ) -> Result<Self> {
        if rpc_url.is_empty() {
            return Err(ClientError::ConfigError(
                "RPC URL cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            network: Network::Custom,
            chain_id,
            rpc_url,
            governor_address: parse_address(governor_address)?,
            comp_address: parse_address(comp_address)?,
            ccomp_address: parse_address(ccomp_address)?,
            ..Self::mainnet()
        })
    }

    /// Set the JSON-RPC URL
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Set the relayer endpoint and credentials
    pub fn with_relayer(
        mut self,
        relayer_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        self.relayer_url = Some(relayer_url.into());
        self.relayer_api_key = Some(api_key.into());
        self.relayer_api_secret = Some(api_secret.into());
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set maximum retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set retry delays
    pub fn with_retry_config(
        mut self,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    ) -> Self {
        self.retry_initial_delay_ms = initial_delay_ms;
        self.retry_max_delay_ms = max_delay_ms;
        self.retry_multiplier = multiplier;
        self
    }

    /// Set relayed transaction polling configuration
    pub fn with_tx_config(mut self, poll_interval_ms: u64, timeout_secs: u64) -> Self {
        self.tx_poll_interval_ms = poll_interval_ms;
        self.tx_timeout_secs = timeout_secs;
        self
    }

    /// Set the gas limit for relayed governor calls
    pub fn with_relay_gas_limit(mut self, gas_limit: u64) -> Self {
        self.relay_gas_limit = gas_limit;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(ClientError::ConfigError(
                "RPC URL cannot be empty".to_string(),
            ));
        }
        url::Url::parse(&self.rpc_url)?;
        if let Some(relayer_url) = &self.relayer_url {
            url::Url::parse(relayer_url)?;
        }
        if let Some(expected) = self.network.chain_id() {
            if expected != self.chain_id {
                return Err(ClientError::ConfigError(format!(
                    "Chain ID {} does not match {:?}",
                    self.chain_id, self.network
                )));
            }
        }
        if self.governor_address.is_zero() {
            return Err(ClientError::ConfigError(
                "Governor address cannot be zero".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ClientError::ConfigError(
                "Max retries must be greater than 0".to_string(),
            ));
        }
        if self.retry_initial_delay_ms == 0 {
            return Err(ClientError::ConfigError(
                "Retry initial delay must be greater than 0".to_string(),
            ));
        }
        if self.retry_multiplier <= 1.0 {
            return Err(ClientError::ConfigError(
                "Retry multiplier must be greater than 1.0".to_string(),
            ));
        }
        if self.tx_poll_interval_ms == 0 {
            return Err(ClientError::ConfigError(
                "Transaction poll interval must be greater than 0".to_string(),
            ));
        }
        if self.tx_timeout_secs == 0 {
            return Err(ClientError::ConfigError(
                "Transaction timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_config() {
        let config = ClientConfig::mainnet();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.governor_address, parse_address(MAINNET_GOVERNOR).unwrap());
        assert_eq!(config.comp_address, parse_address(MAINNET_COMP).unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_config() {
        let config = ClientConfig::custom(
            31337,
            "http://localhost:8545".to_string(),
            "0x0000000000000000000000000000000000000001",
            "0x0000000000000000000000000000000000000002",
            "0x0000000000000000000000000000000000000003",
        )
        .unwrap();

        assert_eq!(config.network, Network::Custom);
        assert_eq!(config.chain_id, 31337);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_config_rejects_bad_input() {
        assert!(ClientConfig::custom(1, "".to_string(), MAINNET_GOVERNOR, MAINNET_COMP, MAINNET_CCOMP).is_err());
        assert!(ClientConfig::custom(
            1,
            "http://localhost:8545".to_string(),
            "not-an-address",
            MAINNET_COMP,
            MAINNET_CCOMP
        )
        .is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::mainnet()
            .with_request_timeout(Duration::from_secs(60))
            .with_max_retries(5)
            .with_retry_config(200, 10000, 2.5)
            .with_tx_config(500, 120)
            .with_relayer("https://relayer.example.com", "key", "secret")
            .with_relay_gas_limit(750_000);

        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_initial_delay_ms, 200);
        assert_eq!(config.retry_max_delay_ms, 10000);
        assert_eq!(config.retry_multiplier, 2.5);
        assert_eq!(config.tx_poll_interval_ms, 500);
        assert_eq!(config.tx_timeout_secs, 120);
        assert_eq!(config.relayer_api_key.as_deref(), Some("key"));
        assert_eq!(config.relay_gas_limit, 750_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::mainnet();
        assert!(config.validate().is_ok());

        config.max_retries = 0;
        assert!(config.validate().is_err());

        config.max_retries = 3;
        config.retry_multiplier = 0.5;
        assert!(config.validate().is_err());

        config.retry_multiplier = 2.0;
        config.chain_id = 5;
        assert!(config.validate().is_err());

        config.chain_id = 1;
        config.rpc_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
