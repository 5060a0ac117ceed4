//! Example: Relay a single governor action and wait for it
//!
//! Usage: `cargo run --example relay_action -- queue 123`
//!
//! Requires `RELAYER_URL`, `RELAYER_API_KEY` and `RELAYER_API_SECRET`.

use compound_client::{ClientConfig, CompoundClient, MonitorOptions, MonitorResult};
use compound_governance::ProposalAction;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("compound_client=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let action = match (args.next().as_deref(), args.next()) {
        (Some("queue"), Some(id)) => ProposalAction::Queue(id.parse()?),
        (Some("execute"), Some(id)) => ProposalAction::Execute(id.parse()?),
        _ => {
            eprintln!("usage: relay_action <queue|execute> <proposal id>");
            std::process::exit(2);
        }
    };

    let mut config = ClientConfig::mainnet().with_relayer(
        std::env::var("RELAYER_URL")?,
        std::env::var("RELAYER_API_KEY")?,
        std::env::var("RELAYER_API_SECRET")?,
    );
    if let Ok(rpc_url) = std::env::var("ETH_RPC_URL") {
        config = config.with_rpc_url(rpc_url);
    }
    let client = CompoundClient::new(Arc::new(config))?;

    // Show the proposal before touching it
    match client.governor().snapshot(action.proposal_id()).await? {
        Some(snapshot) => println!("Proposal {} is {}", snapshot.id, snapshot.state),
        None => {
            eprintln!("Proposal {} does not exist", action.proposal_id());
            return Ok(());
        }
    }

    let submitter = client.action_submitter()?;
    let request = submitter.build_request(&action);
    println!("Calldata: {}", request.data);

    // Submit through the relayer directly so we keep its transaction ID
    let tx = client.relayer()?.send_transaction(&request).await?;
    println!("✓ Relayer accepted {} as {}", action, tx.transaction_id);

    let options = MonitorOptions::from_config(client.config()).with_timeout(600);
    match client
        .transaction_monitor()?
        .monitor(&tx.transaction_id, options)
        .await?
    {
        MonitorResult::Confirmed(receipt) => println!(
            "✓ Confirmed in block {} ({} gas)",
            receipt.block_number, receipt.gas_used
        ),
        MonitorResult::Mined(tx) => println!("✓ Mined: {:?}", tx.hash),
        MonitorResult::Failed(reason) => eprintln!("✗ Failed: {}", reason),
        MonitorResult::Timeout => eprintln!("✗ Timed out"),
    }

    Ok(())
}
