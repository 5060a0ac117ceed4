//! Compound monitor daemon
//!
//! Runs the delegation and borrow monitors and, when enabled, the
//! governance automation.

use anyhow::Context;
use clap::{Parser, Subcommand};
use compound_client::CompoundClient;
use compound_governance::{KeyValueStore, MemoryStore};
use compound_monitor::{
    automation::check_relayer, init_tracing, Config, GovernanceAutomation, HealthCheck,
    IndexerService, MonitorResult, RedisStore,
};
use std::sync::Arc;
use tracing::{error, info};

/// Compound monitor CLI
#[derive(Parser)]
#[command(name = "compound-monitor")]
#[command(about = "Compound delegation, borrow and governance monitor", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "COMPOUND_MONITOR_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "COMPOUND_MONITOR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the chain and run the automation until interrupted
    Run,

    /// Scan a fixed block range and exit
    Scan {
        /// First block (inclusive)
        #[arg(long)]
        from_block: u64,

        /// Last block (inclusive)
        #[arg(long)]
        to_block: u64,
    },

    /// Run only the governance automation until interrupted
    Automate {
        /// Log actions instead of relaying them, with in-memory state
        #[arg(long)]
        dry_run: bool,
    },

    /// Run one governance automation cycle and exit
    PollOnce {
        /// Log actions instead of relaying them, with in-memory state
        #[arg(long)]
        dry_run: bool,

        /// Keep the ignore-set and markers in memory instead of Redis
        #[arg(long)]
        memory: bool,
    },

    /// Check connectivity of every backend
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let client = CompoundClient::new(Arc::new(config.client_config()?))
        .context("Failed to create Compound client")?;

    match cli.command {
        Command::Run => run(config, client).await?,
        Command::Scan {
            from_block,
            to_block,
        } => {
            let store = RedisStore::new(&config.store.redis_url, &config.store.key_prefix).await?;
            let indexer = IndexerService::new(config, store, &client)?;
            let count = indexer.scan_range(from_block, to_block).await?;
            info!("Scanned blocks {}-{}: {} alerts", from_block, to_block, count);
        }
        Command::Automate { dry_run } => {
            check_relayer(&client, dry_run)?;
            if dry_run {
                let automation = GovernanceAutomation::new(client, MemoryStore::new(), &config);
                automate(&automation, true).await?;
            } else {
                let store =
                    RedisStore::new(&config.store.redis_url, &config.store.key_prefix).await?;
                let automation = GovernanceAutomation::new(client, store, &config);
                automate(&automation, false).await?;
            }
        }
        Command::PollOnce { dry_run, memory } => {
            check_relayer(&client, dry_run)?;
            let report = if memory || dry_run {
                GovernanceAutomation::new(client, MemoryStore::new(), &config)
                    .run_once(dry_run)
                    .await?
            } else {
                let store =
                    RedisStore::new(&config.store.redis_url, &config.store.key_prefix).await?;
                GovernanceAutomation::new(client, store, &config)
                    .run_once(dry_run)
                    .await?
            };
            println!("{:#?}", report);
        }
        Command::Health => {
            let health = health(&config, &client).await;
            println!("{:#?}", health);
            if !health.is_healthy() {
                anyhow::bail!("Unhealthy backends");
            }
        }
    }

    Ok(())
}

async fn run(config: Config, client: CompoundClient) -> anyhow::Result<()> {
    let store = RedisStore::new(&config.store.redis_url, &config.store.key_prefix)
        .await
        .context("Failed to connect to Redis")?;

    let automation = if config.automation.enabled {
        check_relayer(&client, false)?;
        Some(GovernanceAutomation::new(
            client.clone(),
            store.clone(),
            &config,
        ))
    } else {
        info!("Governance automation disabled");
        None
    };
    let indexer = IndexerService::new(config, store, &client)?;

    let automation_loop = async {
        match &automation {
            Some(automation) => automation.run(false).await,
            None => std::future::pending::<MonitorResult<()>>().await,
        }
    };

    tokio::select! {
        result = indexer.start() => result?,
        result = automation_loop => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
            indexer.stop().await;
            if let Some(automation) = &automation {
                automation.stop().await;
            }
        }
    }

    Ok(())
}

async fn automate<S: KeyValueStore>(
    automation: &GovernanceAutomation<S>,
    dry_run: bool,
) -> anyhow::Result<()> {
    tokio::select! {
        result = automation.run(dry_run) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
            automation.stop().await;
        }
    }
    Ok(())
}

async fn health(config: &Config, client: &CompoundClient) -> HealthCheck {
    let cache = match RedisStore::new(&config.store.redis_url, &config.store.key_prefix).await {
        Ok(store) => store.health_check().await,
        Err(e) => {
            error!("Redis unavailable: {}", e);
            false
        }
    };

    let blockchain = match client.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            error!("Node unavailable: {}", e);
            false
        }
    };

    let governor = match client.governor().proposal_count().await {
        Ok(count) => {
            info!("Governor has {} proposals", count);
            true
        }
        Err(e) => {
            error!("Governor unavailable: {}", e);
            false
        }
    };

    HealthCheck {
        cache,
        blockchain,
        governor,
    }
}
