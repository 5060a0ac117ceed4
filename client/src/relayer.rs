//! Transaction relayer client.
//!
//! The automation never holds a private key: governor calls are handed to
//! a managed relayer over HTTP, which signs, prices and broadcasts them.
//! This module provides the relayer API client and the
//! [`GovernorActionSubmitter`] that turns tracker actions into relayed
//! `queue`/`execute` transactions.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::governor::GovernorBravo;
use crate::retry::{retry_after_secs, RetryStrategy};
use crate::types::{RelayRequest, RelayedTransaction};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use compound_governance::{ActionSubmitter, GovernanceError, ProposalAction};
use ethers::types::{Address, Bytes};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// Relayer API client
#[derive(Clone)]
pub struct RelayerClient {
    /// HTTP client
    client: Client,
    /// Base URL for the relayer API
    base_url: Url,
    /// Basic auth header value
    authorization: Option<String>,
    /// Retry strategy
    retry_strategy: RetryStrategy,
}

impl RelayerClient {
    /// Create a new relayer client
    pub fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let relayer_url = config
            .relayer_url
            .as_deref()
            .ok_or_else(|| ClientError::ConfigError("Relayer URL is not set".to_string()))?;

        // Keep the path of the base URL when joining endpoints
        let base_url = if relayer_url.ends_with('/') {
            Url::parse(relayer_url)?
        } else {
            Url::parse(&format!("{}/", relayer_url))?
        };

        let authorization = match (&config.relayer_api_key, &config.relayer_api_secret) {
            (Some(key), Some(secret)) => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", key, secret))
            )),
            _ => None,
        };

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::NetworkError)?;

        Ok(Self {
            client,
            base_url,
            authorization,
            retry_strategy: RetryStrategy::from_config(&config),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.authorization {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    async fn read_transaction(response: Response, reference: &str) -> Result<RelayedTransaction> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimitExceeded(retry_after_secs(
                response.headers(),
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::TransactionNotFound(reference.to_string()));
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ClientError::RelayerError(format!(
            "Status {}: {}",
            status, error_text
        )))
    }

    /// Hand a transaction to the relayer
    ///
    /// Sending is not idempotent: the request is only repeated when it
    /// provably never reached the relayer (connect failure or 429). Any
    /// other failure is returned as is, even when the relayer may have
    /// accepted the transaction.
    pub async fn send_transaction(&self, request: &RelayRequest) -> Result<RelayedTransaction> {
        info!("Relaying transaction to {:?}", request.to);

        let url = self.endpoint("txs")?;

        let send = || async {
            let response = self
                .with_auth(self.client.post(url.clone()).json(request))
                .send()
                .await
                .map_err(ClientError::NetworkError)?;

            Self::read_transaction(response, "new transaction")
                .await
                .map_err(|e| match e {
                    ClientError::RelayerError(msg) if !msg.starts_with("Status 5") => {
                        ClientError::TransactionSubmissionError(msg)
                    }
                    other => other,
                })
        };

        let tx = self
            .retry_strategy
            .retry_with_predicate(send, not_delivered)
            .await?;

        info!(
            "Relayer accepted transaction {} (status: {})",
            tx.transaction_id, tx.status
        );
        Ok(tx)
    }

    /// Current view of a relayed transaction
    pub async fn get_transaction(&self, transaction_id: &str) -> Result<RelayedTransaction> {
        debug!("Fetching relayed transaction: {}", transaction_id);

        let url = self.endpoint(&format!("txs/{}", transaction_id))?;

        self.retry_strategy
            .retry(|| async {
                let response = self
                    .with_auth(self.client.get(url.clone()))
                    .send()
                    .await
                    .map_err(ClientError::NetworkError)?;

                Self::read_transaction(response, transaction_id).await
            })
            .await
    }
}

/// Whether a relay request certainly never reached the relayer
fn not_delivered(error: &ClientError) -> bool {
    match error {
        ClientError::NetworkError(e) => e.is_connect(),
        ClientError::RateLimitExceeded(_) => true,
        _ => false,
    }
}

/// Relays governor `queue`/`execute` calls for the proposal tracker
#[derive(Clone)]
pub struct GovernorActionSubmitter {
    relayer: RelayerClient,
    governor: Address,
    gas_limit: u64,
    speed: String,
}

impl GovernorActionSubmitter {
    /// Create a submitter targeting `governor`
    pub fn new(relayer: RelayerClient, governor: Address, gas_limit: u64) -> Self {
        Self {
            relayer,
            governor,
            gas_limit,
            speed: "fast".to_string(),
        }
    }

    /// Set the gas price speed hint
    pub fn with_speed(mut self, speed: impl Into<String>) -> Self {
        self.speed = speed.into();
        self
    }

    /// Relay request for an action
    pub fn build_request(&self, action: &ProposalAction) -> RelayRequest {
        let data: Bytes = match action {
            ProposalAction::Queue(id) => GovernorBravo::queue_calldata(*id),
            ProposalAction::Execute(id) => GovernorBravo::execute_calldata(*id),
        };

        RelayRequest {
            to: self.governor,
            data,
            gas_limit: self.gas_limit,
            speed: self.speed.clone(),
        }
    }
}

#[async_trait]
impl ActionSubmitter for GovernorActionSubmitter {
    async fn submit(&self, action: &ProposalAction) -> compound_governance::Result<String> {
        let request = self.build_request(action);

        match self.relayer.send_transaction(&request).await {
            Ok(tx) => Ok(tx.hash.unwrap_or(tx.transaction_id)),
            Err(e) => {
                error!("Relaying {} failed: {}", action, e);
                Err(GovernanceError::Submission {
                    action: action.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn config() -> Arc<ClientConfig> {
        Arc::new(
            ClientConfig::mainnet().with_relayer("https://relayer.example.com/v1", "key", "secret"),
        )
    }

    #[test]
    fn test_relayer_requires_url() {
        let result = RelayerClient::new(Arc::new(ClientConfig::mainnet()));
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = RelayerClient::new(config()).unwrap();
        assert_eq!(
            client.endpoint("txs/abc").unwrap().as_str(),
            "https://relayer.example.com/v1/txs/abc"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        let client = RelayerClient::new(config()).unwrap();
        assert_eq!(
            client.authorization.as_deref(),
            Some("Basic a2V5OnNlY3JldA==")
        );
    }

    #[test_case(ClientError::RateLimitExceeded(1), true ; "rate limited")]
    #[test_case(ClientError::InvalidResponse("EOF while parsing".to_string()), false ; "garbled body")]
    #[test_case(ClientError::RelayerError("Status 503: busy".to_string()), false ; "server error")]
    #[test_case(ClientError::TransactionSubmissionError("Status 400".to_string()), false ; "rejected")]
    fn test_send_is_repeated_only_when_undelivered(error: ClientError, expected: bool) {
        assert_eq!(not_delivered(&error), expected);
    }

    #[test]
    fn test_build_request() {
        let relayer = RelayerClient::new(config()).unwrap();
        let governor = config().governor_address;
        let submitter = GovernorActionSubmitter::new(relayer, governor, 800_000).with_speed("fastest");

        let request = submitter.build_request(&ProposalAction::Queue(12));
        assert_eq!(request.to, governor);
        assert_eq!(request.data, GovernorBravo::queue_calldata(12));
        assert_eq!(request.gas_limit, 800_000);
        assert_eq!(request.speed, "fastest");
    }
}
