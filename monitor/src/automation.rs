/// Governance automation: queues and executes proposals on a timer
use crate::config::Config;
use crate::error::{MonitorError, MonitorResult};
use async_trait::async_trait;
use compound_client::CompoundClient;
use compound_governance::{
    ActionSubmitter, KeyValueStore, PollReport, ProposalAction, ProposalTracker,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Submitter that only logs the actions it would relay
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSubmitter;

#[async_trait]
impl ActionSubmitter for DryRunSubmitter {
    async fn submit(&self, action: &ProposalAction) -> compound_governance::Result<String> {
        info!("Dry run: would relay {}", action);
        Ok(format!("dry-run:{}:{}", action.name(), action.proposal_id()))
    }
}

/// Periodic proposal tracker run against the live governor
pub struct GovernanceAutomation<S> {
    client: CompoundClient,
    tracker: ProposalTracker<S>,
    interval: Duration,
    is_running: Arc<RwLock<bool>>,
}

impl<S: KeyValueStore> GovernanceAutomation<S> {
    /// Create an automation persisting its state in `store`
    pub fn new(client: CompoundClient, store: S, config: &Config) -> Self {
        Self {
            client,
            tracker: ProposalTracker::new(store, config.tracker_config()),
            interval: config.automation_poll_interval(),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Underlying tracker
    pub fn tracker(&self) -> &ProposalTracker<S> {
        &self.tracker
    }

    /// Run one cycle, using the latest block time as "now"
    ///
    /// With `dry_run` set, actions are logged instead of relayed. Markers
    /// are still written to the store, so dry runs belong on a scratch store.
    pub async fn run_once(&self, dry_run: bool) -> MonitorResult<PollReport> {
        let now = self.client.rpc().latest_block_timestamp().await?;

        let report = if dry_run {
            self.tracker
                .poll(self.client.governor(), &DryRunSubmitter, now)
                .await?
        } else {
            let submitter = self.client.action_submitter()?;
            self.tracker
                .poll(self.client.governor(), &submitter, now)
                .await?
        };

        log_report(&report);
        Ok(report)
    }

    /// Run cycles until stopped
    ///
    /// A retryable failure is logged and the next cycle tries again.
    pub async fn run(&self, dry_run: bool) -> MonitorResult<()> {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            warn!("Automation is already running");
            return Ok(());
        }
        *is_running = true;
        drop(is_running);

        info!(
            "Starting governance automation (every {}s)",
            self.interval.as_secs()
        );

        loop {
            if !*self.is_running.read().await {
                info!("Automation stopped");
                break;
            }

            if let Err(e) = self.run_once(dry_run).await {
                if e.is_retryable() {
                    warn!("Automation cycle failed, retrying next cycle: {}", e);
                } else {
                    error!("Automation cycle failed: {}", e);
                    self.stop().await;
                    return Err(e);
                }
            }

            sleep(self.interval).await;
        }

        Ok(())
    }

    /// Stop after the current cycle
    pub async fn stop(&self) {
        let mut is_running = self.is_running.write().await;
        *is_running = false;
    }

    /// Whether the loop is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}

fn log_report(report: &PollReport) {
    for (action, reference) in &report.submitted {
        info!("Relayed {} ({})", action, reference);
    }
    if !report.newly_ignored.is_empty() {
        info!("Ignoring finished proposals {:?}", report.newly_ignored);
    }
    if !report.already_submitted.is_empty() {
        info!(
            "{} actions already submitted in earlier cycles",
            report.already_submitted.len()
        );
    }
    if !report.not_found.is_empty() {
        warn!("Proposals not found: {:?}", report.not_found);
    }
}

/// Fails fast when automation is enabled without a relayer
pub fn check_relayer(client: &CompoundClient, dry_run: bool) -> MonitorResult<()> {
    if dry_run {
        return Ok(());
    }
    client.relayer().map(|_| ()).map_err(MonitorError::from)
}
