//! Compound Monitoring Service
//!
//! Long-running services built on the governance core and the Ethereum
//! client:
//!
//! - **Delegation monitor**: alerts when a delegate's votes newly reach a
//!   governance threshold
//! - **Large borrow monitor**: alerts when a cCOMP borrow lifts the
//!   borrower's COMP over a threshold
//! - **Governance automation**: queues and executes proposals as they
//!   become ready
//!
//! Alerts are logged and published on a Redis channel. Scan progress and
//! the automation's ignore-set and markers live in Redis as well.

pub mod automation;
pub mod borrows;
pub mod cache;
pub mod config;
pub mod delegations;
pub mod error;
pub mod indexer;
pub mod models;
pub mod parser;

pub use automation::{DryRunSubmitter, GovernanceAutomation};
pub use borrows::{BalanceSource, LargeBorrowMonitor, LARGE_BORROW_ALERT};
pub use cache::RedisStore;
pub use config::*;
pub use delegations::{DelegationMonitor, COMP_DECIMALS, DELEGATE_THRESHOLD_ALERT};
pub use error::{MonitorError, MonitorResult};
pub use indexer::{EventDispatcher, IndexerService};
pub use models::{Alert, AlertKind, AlertSeverity, DecodedEvent, EventKind, LogMeta};
pub use parser::EventParser;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Health check for all services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheck {
    pub cache: bool,
    pub blockchain: bool,
    pub governor: bool,
}

impl HealthCheck {
    /// Check if all services are healthy
    pub fn is_healthy(&self) -> bool {
        self.cache && self.blockchain && self.governor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check() {
        let healthy = HealthCheck {
            cache: true,
            blockchain: true,
            governor: true,
        };
        assert!(healthy.is_healthy());

        assert!(!HealthCheck {
            governor: false,
            ..healthy
        }
        .is_healthy());
        assert!(!HealthCheck {
            cache: false,
            ..healthy
        }
        .is_healthy());
    }
}
