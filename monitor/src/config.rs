/// Configuration module for the monitoring service
use crate::error::{MonitorError, MonitorResult};
use compound_client::config::{MAINNET_CCOMP, MAINNET_COMP, MAINNET_GOVERNOR};
use compound_client::ClientConfig;
use compound_governance::{ProposalScope, ThresholdSet, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix of environment variables overriding the configuration
pub const ENV_PREFIX: &str = "COMPOUND_MONITOR";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Blockchain configuration
    pub blockchain: BlockchainConfig,

    /// Indexer configuration
    pub indexer: IndexerConfig,

    /// Delegation monitor configuration
    pub delegations: DelegationConfig,

    /// Large borrow monitor configuration
    pub borrows: BorrowConfig,

    /// Governance automation configuration
    pub automation: AutomationConfig,

    /// Key-value store configuration
    pub store: StoreConfig,
}

/// Blockchain connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainConfig {
    /// HTTP JSON-RPC URL
    pub http_url: String,

    /// Chain ID
    pub chain_id: u64,

    /// GovernorBravo address
    pub governor_address: String,

    /// COMP token address
    pub comp_address: String,

    /// cCOMP market address
    pub ccomp_address: String,

    /// Relayer API URL, required for automation
    #[serde(default)]
    pub relayer_url: Option<String>,

    /// Relayer API key
    #[serde(default)]
    pub relayer_api_key: Option<String>,

    /// Relayer API secret
    #[serde(default)]
    pub relayer_api_secret: Option<String>,
}

/// Indexer behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Number of confirmations to wait before scanning a block
    pub confirmations: u64,

    /// Batch size for fetching logs
    pub batch_size: u64,

    /// Poll interval in seconds
    pub poll_interval: u64,

    /// Maximum number of retries on failure
    pub max_retries: u32,

    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,

    /// Block to start from when nothing was scanned yet
    #[serde(default)]
    pub start_block: Option<u64>,

    /// Publish alerts on the Redis channel
    pub enable_realtime: bool,

    /// Redis channel receiving alerts
    pub alert_channel: String,
}

/// Delegation monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationConfig {
    /// Whether the monitor runs
    pub enabled: bool,

    /// Thresholds in whole COMP
    pub thresholds: ThresholdSet,
}

/// Large borrow monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowConfig {
    /// Whether the monitor runs
    pub enabled: bool,

    /// Thresholds in whole COMP
    pub thresholds: ThresholdSet,
}

/// Governance automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Whether the automation loop runs alongside the scanner
    pub enabled: bool,

    /// Poll interval in seconds
    pub poll_interval: u64,

    /// Store key of the ignore-set
    pub ignore_key: String,

    /// Prefix of one-shot marker keys
    pub marker_prefix: String,

    /// Only track these proposals (empty tracks all)
    #[serde(default)]
    pub proposal_ids: Vec<u64>,
}

/// Key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// Namespace prepended to every key
    pub key_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blockchain: BlockchainConfig {
                http_url: "http://localhost:8545".to_string(),
                chain_id: 1,
                governor_address: MAINNET_GOVERNOR.to_string(),
                comp_address: MAINNET_COMP.to_string(),
                ccomp_address: MAINNET_CCOMP.to_string(),
                relayer_url: None,
                relayer_api_key: None,
                relayer_api_secret: None,
            },
            indexer: IndexerConfig {
                confirmations: 12,
                batch_size: 1000,
                poll_interval: 12,
                max_retries: 3,
                retry_delay_ms: 1000,
                start_block: None,
                enable_realtime: true,
                alert_channel: "alerts:new".to_string(),
            },
            delegations: DelegationConfig {
                enabled: true,
                thresholds: ThresholdSet::compound_governance(),
            },
            borrows: BorrowConfig {
                enabled: true,
                thresholds: ThresholdSet::compound_governance(),
            },
            automation: AutomationConfig {
                enabled: false,
                poll_interval: 60,
                ignore_key: "ignoredProposals".to_string(),
                marker_prefix: "proposalAction".to_string(),
                proposal_ids: Vec::new(),
            },
            store: StoreConfig {
                redis_url: "redis://localhost:6379".to_string(),
                key_prefix: "compound".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults, then an optional file, then
    /// `COMPOUND_MONITOR__SECTION__KEY` environment variables
    pub fn load(path: Option<&str>) -> MonitorResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> MonitorResult<Self> {
        Self::load(None)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check values the services rely on
    pub fn validate(&self) -> MonitorResult<()> {
        if self.blockchain.http_url.is_empty() {
            return Err(MonitorError::Config("HTTP RPC URL cannot be empty".to_string()));
        }
        if self.indexer.batch_size == 0 {
            return Err(MonitorError::Config("Batch size must be positive".to_string()));
        }
        if self.delegations.enabled && self.delegations.thresholds.is_empty() {
            return Err(MonitorError::Config(
                "Delegation monitor needs at least one threshold".to_string(),
            ));
        }
        if self.borrows.enabled && self.borrows.thresholds.is_empty() {
            return Err(MonitorError::Config(
                "Borrow monitor needs at least one threshold".to_string(),
            ));
        }
        if self.automation.poll_interval == 0 {
            return Err(MonitorError::Config(
                "Automation poll interval must be positive".to_string(),
            ));
        }
        self.client_config()?;
        Ok(())
    }

    /// Client configuration for the node and relayer
    pub fn client_config(&self) -> MonitorResult<ClientConfig> {
        let chain = &self.blockchain;
        let mut client = ClientConfig::custom(
            chain.chain_id,
            chain.http_url.clone(),
            &chain.governor_address,
            &chain.comp_address,
            &chain.ccomp_address,
        )?;

        if let (Some(url), Some(key), Some(secret)) = (
            &chain.relayer_url,
            &chain.relayer_api_key,
            &chain.relayer_api_secret,
        ) {
            client = client.with_relayer(url.clone(), key.clone(), secret.clone());
        }

        client.validate()?;
        Ok(client)
    }

    /// Tracker settings for the automation
    pub fn tracker_config(&self) -> TrackerConfig {
        let scope = if self.automation.proposal_ids.is_empty() {
            ProposalScope::All
        } else {
            ProposalScope::Only(self.automation.proposal_ids.clone())
        };

        TrackerConfig {
            ignore_key: self.automation.ignore_key.clone(),
            marker_prefix: self.automation.marker_prefix.clone(),
            scope,
        }
    }

    /// Indexer poll interval
    pub fn indexer_poll_interval(&self) -> Duration {
        Duration::from_secs(self.indexer.poll_interval)
    }

    /// Automation poll interval
    pub fn automation_poll_interval(&self) -> Duration {
        Duration::from_secs(self.automation.poll_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.delegations.thresholds.len(), 2);
        assert_eq!(config.tracker_config(), TrackerConfig::default());
    }

    #[test]
    fn test_tracker_scope_from_proposal_ids() {
        let mut config = Config::default();
        config.automation.proposal_ids = vec![110];
        assert_eq!(
            config.tracker_config().scope,
            ProposalScope::Only(vec![110])
        );
    }

    #[test]
    fn test_client_config_with_relayer() {
        let mut config = Config::default();
        assert!(config.client_config().unwrap().relayer_url.is_none());

        config.blockchain.relayer_url = Some("https://relayer.example.com".to_string());
        config.blockchain.relayer_api_key = Some("key".to_string());
        config.blockchain.relayer_api_secret = Some("secret".to_string());
        let client = config.client_config().unwrap();
        assert_eq!(
            client.relayer_url.as_deref(),
            Some("https://relayer.example.com")
        );
    }

    #[test]
    fn test_invalid_config() {
        let mut config = Config::default();
        config.indexer.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.delegations.thresholds = ThresholdSet::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.blockchain.governor_address = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut content = toml::to_string(&Config::default()).unwrap();
        content = content.replace("batch_size = 1000", "batch_size = 250");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.indexer.batch_size, 250);
        assert_eq!(
            config.delegations.thresholds,
            ThresholdSet::compound_governance()
        );
    }
}
