//! Example: Read governance state and run one tracker cycle
//!
//! Without relayer credentials the cycle only reports what it would do.
//! Set `RELAYER_URL`, `RELAYER_API_KEY` and `RELAYER_API_SECRET` to submit.

use async_trait::async_trait;
use compound_client::{ClientConfig, CompoundClient};
use compound_governance::{
    ActionSubmitter, MemoryStore, ProposalAction, ProposalScope, ProposalTracker, TrackerConfig,
};
use std::sync::Arc;

/// Prints actions instead of relaying them
struct DryRun;

#[async_trait]
impl ActionSubmitter for DryRun {
    async fn submit(&self, action: &ProposalAction) -> compound_governance::Result<String> {
        println!("  would submit {}", action);
        Ok("dry-run".to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("compound_client=info,compound_governance=info")
        .init();

    println!("=== Compound Governance Poll Example ===\n");

    let mut config = ClientConfig::mainnet();
    if let Ok(rpc_url) = std::env::var("ETH_RPC_URL") {
        config = config.with_rpc_url(rpc_url);
    }
    if let (Ok(url), Ok(key), Ok(secret)) = (
        std::env::var("RELAYER_URL"),
        std::env::var("RELAYER_API_KEY"),
        std::env::var("RELAYER_API_SECRET"),
    ) {
        config = config.with_relayer(url, key, secret);
    }
    println!("RPC URL: {}", config.rpc_url);
    println!("Governor: {:?}\n", config.governor_address);

    let client = CompoundClient::new(Arc::new(config))?;

    println!("Performing health check...");
    client.health_check().await?;
    println!("✓ Health check passed\n");

    let count = client.governor().proposal_count().await?;
    let now = client.rpc().latest_block_timestamp().await?;
    println!("Proposal count: {}", count);
    println!("Latest block time: {}\n", now);

    // Look at the five most recent proposals only
    let recent: Vec<u64> = (count.saturating_sub(4).max(1)..=count).collect();
    for id in &recent {
        match client.governor().snapshot(*id).await? {
            Some(snapshot) => println!(
                "  #{:<4} {:<10} eta {}",
                id,
                snapshot.state,
                snapshot.eta.map_or("-".to_string(), |eta| eta.to_string())
            ),
            None => println!("  #{:<4} not found", id),
        }
    }
    println!();

    let tracker = ProposalTracker::new(
        MemoryStore::new(),
        TrackerConfig::default().with_scope(ProposalScope::Only(recent)),
    );

    println!("Running one tracker cycle...");
    let report = match client.action_submitter() {
        Ok(submitter) => tracker.poll(client.governor(), &submitter, now).await?,
        Err(_) => tracker.poll(client.governor(), &DryRun, now).await?,
    };

    println!("✓ Cycle complete:");
    println!("  - Submitted: {:?}", report.submitted);
    println!("  - Newly ignored: {:?}", report.newly_ignored);
    println!("  - Waiting: {:?}", report.waiting);

    Ok(())
}
