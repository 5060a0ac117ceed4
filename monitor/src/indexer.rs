/// Blockchain scanner feeding COMP and cCOMP logs to the threshold monitors
use crate::borrows::{BalanceSource, LargeBorrowMonitor};
use crate::cache::RedisStore;
use crate::config::Config;
use crate::delegations::{DelegationMonitor, COMP_DECIMALS};
use crate::error::{MonitorError, MonitorResult};
use crate::models::{Alert, EventKind};
use crate::parser::EventParser;
use compound_client::{CompToken, CompoundClient};
use ethers::prelude::*;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// Routes decoded events to the monitors
pub struct EventDispatcher<B> {
    parser: EventParser,
    delegations: Option<DelegationMonitor>,
    borrows: Option<LargeBorrowMonitor<B>>,
}

impl<B: BalanceSource> EventDispatcher<B> {
    /// Create a dispatcher; a `None` monitor is disabled
    pub fn new(
        parser: EventParser,
        delegations: Option<DelegationMonitor>,
        borrows: Option<LargeBorrowMonitor<B>>,
    ) -> Self {
        Self {
            parser,
            delegations,
            borrows,
        }
    }

    /// Parser used for decoding
    pub fn parser(&self) -> &EventParser {
        &self.parser
    }

    /// Alerts raised by a batch of logs, in log order
    pub async fn alerts_for(&self, logs: &[Log]) -> MonitorResult<Vec<Alert>> {
        let mut alerts = Vec::new();

        for log in logs {
            let event = match self.parser.parse_log(log)? {
                Some(event) => event,
                None => continue,
            };

            match event.kind {
                EventKind::DelegateVotesChanged {
                    delegate,
                    previous_balance,
                    new_balance,
                } => {
                    if let Some(monitor) = &self.delegations {
                        alerts.extend(monitor.handle(
                            &event.meta,
                            delegate,
                            previous_balance,
                            new_balance,
                        )?);
                    }
                }
                EventKind::Borrow {
                    borrower,
                    borrow_amount,
                    ..
                } => {
                    if let Some(monitor) = &self.borrows {
                        alerts.extend(monitor.handle(&event.meta, borrower, borrow_amount).await?);
                    }
                }
            }
        }

        Ok(alerts)
    }
}

/// Indexer service that follows the chain and raises alerts
pub struct IndexerService {
    /// Ethereum provider for log access
    provider: Arc<Provider<Http>>,

    /// Event routing
    dispatcher: EventDispatcher<CompToken>,

    /// Progress and alert channel
    store: RedisStore,

    /// Configuration
    config: Config,

    /// Current indexing state
    is_running: Arc<RwLock<bool>>,
}

impl IndexerService {
    /// Create a new indexer service
    ///
    /// # Arguments
    /// * `config` - System configuration
    /// * `store` - Redis store for progress and alerts
    /// * `client` - Client used to read COMP balances
    pub fn new(config: Config, store: RedisStore, client: &CompoundClient) -> MonitorResult<Self> {
        let provider = Provider::<Http>::try_from(config.blockchain.http_url.as_str())
            .map_err(|e| MonitorError::Rpc(format!("Invalid provider URL: {}", e)))?;

        let parser = EventParser::compound(client.config().comp_address, client.config().ccomp_address)?;

        let delegations = config.delegations.enabled.then(|| {
            DelegationMonitor::new(config.delegations.thresholds.clone(), COMP_DECIMALS)
        });
        let borrows = config.borrows.enabled.then(|| {
            LargeBorrowMonitor::new(
                client.comp().clone(),
                config.borrows.thresholds.clone(),
                COMP_DECIMALS,
            )
        });

        info!(
            "Indexer watching {} contracts (delegations: {}, borrows: {})",
            parser.registered_contracts().len(),
            config.delegations.enabled,
            config.borrows.enabled
        );

        Ok(Self {
            provider: Arc::new(provider),
            dispatcher: EventDispatcher::new(parser, delegations, borrows),
            store,
            config,
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start the indexing service
    ///
    /// Follows the chain from the last scanned block until stopped
    pub async fn start(&self) -> MonitorResult<()> {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            warn!("Indexer is already running");
            return Ok(());
        }
        *is_running = true;
        drop(is_running);

        info!("Starting indexer service");

        loop {
            if !*self.is_running.read().await {
                info!("Indexer stopped");
                break;
            }

            if let Err(e) = self.poll().await {
                error!("Indexer poll failed: {}", e);
                if !e.is_retryable() {
                    self.stop().await;
                    return Err(e);
                }
            }

            sleep(self.config.indexer_poll_interval()).await;
        }

        Ok(())
    }

    /// Stop the indexing service
    pub async fn stop(&self) {
        let mut is_running = self.is_running.write().await;
        *is_running = false;
        info!("Stopping indexer service");
    }

    /// Get service status
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Scan every confirmed block not scanned yet
    async fn poll(&self) -> MonitorResult<()> {
        let current_block = self.get_current_block().await?;
        let to_block = current_block.saturating_sub(self.config.indexer.confirmations);

        let from_block = match self.store.get_last_block().await? {
            Some(last) => last + 1,
            None => self.config.indexer.start_block.unwrap_or(to_block),
        };

        if from_block > to_block {
            debug!("No confirmed blocks to scan (next: {})", from_block);
            return Ok(());
        }

        let count = self.scan_batches(from_block, to_block, true).await?;
        info!(
            "Scanned blocks {}-{}: {} alerts",
            from_block, to_block, count
        );
        Ok(())
    }

    /// Scan a fixed block range without touching the recorded progress
    ///
    /// # Returns
    /// Number of alerts raised
    pub async fn scan_range(&self, from_block: u64, to_block: u64) -> MonitorResult<usize> {
        if from_block > to_block {
            return Err(MonitorError::InvalidBlockRange {
                from: from_block,
                to: to_block,
            });
        }
        self.scan_batches(from_block, to_block, false).await
    }

    async fn scan_batches(
        &self,
        from_block: u64,
        to_block: u64,
        record_progress: bool,
    ) -> MonitorResult<usize> {
        let mut total = 0;
        let mut batch_start = from_block;

        while batch_start <= to_block {
            let batch_end =
                std::cmp::min(batch_start + self.config.indexer.batch_size - 1, to_block);

            let alerts = self.index_with_retry(batch_start, batch_end).await?;
            total += alerts.len();
            self.dispatch_alerts(&alerts).await?;

            if record_progress {
                self.store.set_last_block(batch_end).await?;
            }

            batch_start = batch_end + 1;
        }

        Ok(total)
    }

    /// Index a batch, retrying with exponential backoff
    async fn index_with_retry(&self, from_block: u64, to_block: u64) -> MonitorResult<Vec<Alert>> {
        let mut retry = 0;
        loop {
            match self.index_block_range(from_block, to_block).await {
                Ok(alerts) => return Ok(alerts),
                Err(e) if retry < self.config.indexer.max_retries && e.is_retryable() => {
                    warn!(
                        "Failed to index blocks {}-{}: {} (retry {})",
                        from_block,
                        to_block,
                        e,
                        retry + 1
                    );
                    sleep(batch_retry_delay(self.config.indexer.retry_delay_ms, retry)).await;
                    retry += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to index blocks {}-{}: {}",
                        from_block, to_block, e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Alerts raised by the watched events in a block range
    ///
    /// # Arguments
    /// * `from_block` - Start block (inclusive)
    /// * `to_block` - End block (inclusive)
    async fn index_block_range(&self, from_block: u64, to_block: u64) -> MonitorResult<Vec<Alert>> {
        if from_block > to_block {
            return Err(MonitorError::InvalidBlockRange {
                from: from_block,
                to: to_block,
            });
        }

        let parser = self.dispatcher.parser();
        let topic0: Topic =
            ValueOrArray::Array(parser.signatures().into_iter().map(Some).collect());

        let filter = Filter::new()
            .address(ValueOrArray::Array(parser.registered_contracts()))
            .topic0(topic0)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| MonitorError::Rpc(format!("Failed to fetch logs: {}", e)))?;

        debug!(
            "Fetched {} logs from blocks {}-{}",
            logs.len(),
            from_block,
            to_block
        );

        self.dispatcher.alerts_for(&logs).await
    }

    async fn dispatch_alerts(&self, alerts: &[Alert]) -> MonitorResult<()> {
        for alert in alerts {
            info!("{}", alert);
            if self.config.indexer.enable_realtime {
                self.store
                    .publish_alert(&self.config.indexer.alert_channel, alert)
                    .await?;
            }
        }
        Ok(())
    }

    /// Get current blockchain block number
    async fn get_current_block(&self) -> MonitorResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| MonitorError::Rpc(format!("Failed to get block number: {}", e)))
    }

    /// Check that the provider answers
    pub async fn health_check(&self) -> bool {
        self.get_current_block().await.is_ok()
    }
}

/// Exponential delay before retry number `retry` (0-based), saturating
fn batch_retry_delay(base_ms: u64, retry: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(retry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::borrows::MockBalanceSource;
    use compound_governance::ThresholdSet;
    use ethers::abi::{self, Token};
    use ethers::utils::keccak256;

    fn comp_address() -> Address {
        Address::repeat_byte(0xc0)
    }

    fn ccomp_address() -> Address {
        Address::repeat_byte(0x70)
    }

    fn comp(amount: u64) -> U256 {
        U256::from(amount) * U256::exp10(COMP_DECIMALS as usize)
    }

    fn log(address: Address, topics: Vec<H256>, data: Vec<u8>, log_index: u64) -> Log {
        Log {
            address,
            topics,
            data: Bytes::from(data),
            block_number: Some(U64::from(100u64)),
            transaction_hash: Some(H256::repeat_byte(0x01)),
            log_index: Some(U256::from(log_index)),
            ..Default::default()
        }
    }

    fn delegation_log(delegate: Address, previous: U256, new: U256, log_index: u64) -> Log {
        log(
            comp_address(),
            vec![
                H256::from(keccak256("DelegateVotesChanged(address,uint256,uint256)")),
                H256::from(delegate),
            ],
            abi::encode(&[Token::Uint(previous), Token::Uint(new)]),
            log_index,
        )
    }

    fn borrow_log(borrower: Address, amount: U256, log_index: u64) -> Log {
        log(
            ccomp_address(),
            vec![H256::from(keccak256("Borrow(address,uint256,uint256,uint256)"))],
            abi::encode(&[
                Token::Address(borrower),
                Token::Uint(amount),
                Token::Uint(amount),
                Token::Uint(amount),
            ]),
            log_index,
        )
    }

    fn dispatcher(
        balances: MockBalanceSource,
        delegations: bool,
    ) -> EventDispatcher<MockBalanceSource> {
        let thresholds = ThresholdSet::compound_governance();
        EventDispatcher::new(
            EventParser::compound(comp_address(), ccomp_address()).unwrap(),
            delegations.then(|| DelegationMonitor::new(thresholds.clone(), COMP_DECIMALS)),
            Some(LargeBorrowMonitor::new(balances, thresholds, COMP_DECIMALS)),
        )
    }

    #[tokio::test]
    async fn test_dispatch_routes_events_in_order() {
        let borrower = Address::repeat_byte(0x22);
        let mut balances = MockBalanceSource::new();
        balances
            .expect_balance_of()
            .times(1)
            .returning(|_| Ok(comp(26_000)));

        let logs = vec![
            delegation_log(Address::repeat_byte(0x11), comp(0), comp(400_000), 0),
            borrow_log(borrower, comp(26_000), 1),
            // Not watched
            log(Address::repeat_byte(0x99), vec![H256::zero()], vec![], 2),
        ];

        let alerts = dispatcher(balances, true).alerts_for(&logs).await.unwrap();
        let ids: Vec<_> = alerts.iter().map(|a| a.alert_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                crate::delegations::DELEGATE_THRESHOLD_ALERT,
                crate::delegations::DELEGATE_THRESHOLD_ALERT,
                crate::borrows::LARGE_BORROW_ALERT,
            ]
        );
    }

    #[test]
    fn test_batch_retry_delay() {
        assert_eq!(batch_retry_delay(1000, 0), Duration::from_millis(1000));
        assert_eq!(batch_retry_delay(1000, 3), Duration::from_millis(8000));
        assert_eq!(batch_retry_delay(1000, 64), Duration::from_millis(u64::MAX));
        assert_eq!(batch_retry_delay(0, 200), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_disabled_monitor_is_skipped() {
        let mut balances = MockBalanceSource::new();
        balances.expect_balance_of().never();

        let logs = vec![delegation_log(Address::zero(), comp(0), comp(30_000), 0)];
        let alerts = dispatcher(balances, false).alerts_for(&logs).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_balance_failure_fails_the_batch() {
        let mut balances = MockBalanceSource::new();
        balances
            .expect_balance_of()
            .returning(|_| Err(MonitorError::Rpc("timeout".to_string())));

        let logs = vec![borrow_log(Address::zero(), comp(1), 0)];
        let result = dispatcher(balances, true).alerts_for(&logs).await;
        assert!(matches!(result, Err(MonitorError::Rpc(_))));
    }
}
