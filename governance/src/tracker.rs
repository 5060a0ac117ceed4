//! Proposal lifecycle tracker.
//!
//! One [`ProposalTracker::poll`] call is one automation cycle: load the
//! ignore-set, look at every proposal not yet ignored, record the ones that
//! reached a terminal state, and submit `queue`/`execute` transactions for
//! the ones that are ready. Each action is guarded by a one-shot marker in
//! the store so a cycle that runs before the previous transaction is mined
//! does not submit it twice. Markers are only written after a successful
//! submission.

use crate::error::{GovernanceError, Result};
use crate::ignore_set::IgnoreSet;
use crate::proposal::{decide, Decision, ProposalAction, ProposalId, ProposalSnapshot};
use crate::store::KeyValueStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Reads proposal state from chain
#[async_trait]
pub trait ProposalSource: Send + Sync {
    /// Number of proposals created so far
    async fn proposal_count(&self) -> Result<ProposalId>;

    /// Current snapshot of a proposal.
    ///
    /// `Ok(None)` means the ID has not been minted yet. Any other failure
    /// must be returned as an error so the caller retries.
    async fn snapshot(&self, id: ProposalId) -> Result<Option<ProposalSnapshot>>;
}

/// Submits governor transactions
#[async_trait]
pub trait ActionSubmitter: Send + Sync {
    /// Submit the action, returning a transaction reference
    async fn submit(&self, action: &ProposalAction) -> Result<String>;
}

/// Which proposals the tracker looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalScope {
    /// Every proposal from 1 up to the current count
    All,
    /// A fixed list of proposals
    Only(Vec<ProposalId>),
}

/// Tracker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Store key holding the ignore-set
    pub ignore_key: String,
    /// Prefix for one-shot marker keys
    pub marker_prefix: String,
    /// Proposals to track
    pub scope: ProposalScope,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ignore_key: "ignoredProposals".to_string(),
            marker_prefix: "proposalAction".to_string(),
            scope: ProposalScope::All,
        }
    }
}

impl TrackerConfig {
    /// Track only the given proposals
    pub fn with_scope(mut self, scope: ProposalScope) -> Self {
        self.scope = scope;
        self
    }

    /// Marker key for an action
    pub fn marker_key(&self, action: &ProposalAction) -> String {
        format!(
            "{}:{}:{}",
            self.marker_prefix,
            action.name(),
            action.proposal_id()
        )
    }
}

/// What a poll cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Actions submitted this cycle with their transaction reference
    pub submitted: Vec<(ProposalAction, String)>,
    /// IDs added to the ignore-set this cycle
    pub newly_ignored: Vec<ProposalId>,
    /// Actions skipped because their marker was already set
    pub already_submitted: Vec<ProposalAction>,
    /// IDs left for a later cycle
    pub waiting: Vec<ProposalId>,
    /// IDs not minted yet
    pub not_found: Vec<ProposalId>,
}

/// Tracks proposals across poll cycles using a key-value store
pub struct ProposalTracker<S> {
    store: S,
    config: TrackerConfig,
}

impl<S: KeyValueStore> ProposalTracker<S> {
    /// Create a tracker
    pub fn new(store: S, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Tracker configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the persisted ignore-set
    pub async fn ignore_set(&self) -> Result<IgnoreSet> {
        match self.store.get(&self.config.ignore_key).await? {
            Some(value) => IgnoreSet::parse(&value),
            None => Ok(IgnoreSet::new()),
        }
    }

    /// Run one poll cycle at unix time `now`.
    ///
    /// The first query or submission failure ends the cycle and is
    /// returned; terminal IDs seen before it are still persisted.
    pub async fn poll<P, A>(&self, source: &P, submitter: &A, now: u64) -> Result<PollReport>
    where
        P: ProposalSource + ?Sized,
        A: ActionSubmitter + ?Sized,
    {
        let mut ignored = self.ignore_set().await?;
        let mut report = PollReport::default();

        let candidates: Vec<ProposalId> = match &self.config.scope {
            ProposalScope::All => (1..=source.proposal_count().await?).collect(),
            ProposalScope::Only(ids) => ids.clone(),
        };

        debug!(
            "Polling {} proposals ({} ignored)",
            candidates.len(),
            ignored.len()
        );

        let outcome = self
            .process(&candidates, &mut ignored, source, submitter, now, &mut report)
            .await;

        if !report.newly_ignored.is_empty() {
            self.store
                .put(&self.config.ignore_key, &ignored.to_storage_string())
                .await?;
            info!("Ignoring proposals {:?} from now on", report.newly_ignored);
        }

        outcome.map(|_| report)
    }

    async fn process<P, A>(
        &self,
        candidates: &[ProposalId],
        ignored: &mut IgnoreSet,
        source: &P,
        submitter: &A,
        now: u64,
        report: &mut PollReport,
    ) -> Result<()>
    where
        P: ProposalSource + ?Sized,
        A: ActionSubmitter + ?Sized,
    {
        for &id in candidates {
            if ignored.contains(id) {
                continue;
            }

            let snapshot = match source.snapshot(id).await? {
                Some(snapshot) => snapshot,
                None => {
                    debug!("Proposal {} does not exist yet", id);
                    report.not_found.push(id);
                    continue;
                }
            };

            match decide(&snapshot, now) {
                Decision::Ignore => {
                    debug!("Proposal {} is {}", id, snapshot.state);
                    if ignored.insert(id) {
                        report.newly_ignored.push(id);
                    }
                }
                Decision::Wait => report.waiting.push(id),
                Decision::Submit(action) => self.submit_once(action, submitter, report).await?,
            }
        }

        Ok(())
    }

    async fn submit_once<A>(
        &self,
        action: ProposalAction,
        submitter: &A,
        report: &mut PollReport,
    ) -> Result<()>
    where
        A: ActionSubmitter + ?Sized,
    {
        let marker = self.config.marker_key(&action);
        if self.store.get(&marker).await?.is_some() {
            debug!("{} already submitted", action);
            report.already_submitted.push(action);
            return Ok(());
        }

        let tx_ref = match submitter.submit(&action).await {
            Ok(tx_ref) => tx_ref,
            Err(e) => {
                warn!("Submitting {} failed: {}", action, e);
                return Err(match e {
                    GovernanceError::Submission { .. } => e,
                    other => GovernanceError::Submission {
                        action: action.to_string(),
                        message: other.to_string(),
                    },
                });
            }
        };

        self.store.put(&marker, &tx_ref).await?;
        info!("Submitted {} in {}", action, tx_ref);
        report.submitted.push((action, tx_ref));
        Ok(())
    }
}
