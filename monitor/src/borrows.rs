/// Large borrow monitor
///
/// Borrowed COMP can be delegated and voted with, so a large borrow from
/// the cCOMP market is checked against the same governance thresholds as a
/// delegation: the borrower's holdings before the borrow are its current
/// holdings minus the borrowed amount.
use crate::error::{MonitorError, MonitorResult};
use crate::models::{Alert, AlertKind, AlertSeverity, LogMeta};
use async_trait::async_trait;
use compound_client::CompToken;
use compound_governance::{from_base_units, ThresholdSet};
use ethers::types::{Address, U256};
use serde_json::json;
use tracing::{debug, warn};

/// Alert ID for a borrow lifting holdings over a threshold
pub const LARGE_BORROW_ALERT: &str = "COMP-LARGE-BORROW-THRESHOLD";

/// Source of current COMP holdings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Raw token balance of an account
    async fn balance_of(&self, account: Address) -> MonitorResult<U256>;
}

#[async_trait]
impl BalanceSource for CompToken {
    async fn balance_of(&self, account: Address) -> MonitorResult<U256> {
        CompToken::balance_of(self, account)
            .await
            .map_err(MonitorError::from)
    }
}

/// Applies the threshold detector to cCOMP borrows
pub struct LargeBorrowMonitor<B> {
    balances: B,
    thresholds: ThresholdSet,
    decimals: u32,
}

impl<B: BalanceSource> LargeBorrowMonitor<B> {
    /// Create a monitor reading holdings from `balances`
    pub fn new(balances: B, thresholds: ThresholdSet, decimals: u32) -> Self {
        Self {
            balances,
            thresholds,
            decimals,
        }
    }

    /// Thresholds watched
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Alerts for one `Borrow` event
    pub async fn handle(
        &self,
        meta: &LogMeta,
        borrower: Address,
        borrow_amount: U256,
    ) -> MonitorResult<Vec<Alert>> {
        let holdings = self.balances.balance_of(borrower).await?;
        if holdings < borrow_amount {
            // Borrowed tokens already moved on
            warn!(
                "Borrower {:?} holds {} after borrowing {}",
                borrower, holdings, borrow_amount
            );
        }
        let before = holdings.saturating_sub(borrow_amount);

        let previous = from_base_units(&before.to_string(), self.decimals)?;
        let new = from_base_units(&holdings.to_string(), self.decimals)?;
        let borrowed = from_base_units(&borrow_amount.to_string(), self.decimals)?;

        let crossed = self.thresholds.crossed(&previous, &new);
        debug!(
            "Borrower {:?}: {} -> {} COMP, {} thresholds crossed",
            borrower,
            previous,
            new,
            crossed.len()
        );

        Ok(crossed
            .into_iter()
            .map(|threshold| {
                Alert::new(
                    LARGE_BORROW_ALERT,
                    format!("Large COMP borrow reached {} threshold", threshold.name),
                    format!(
                        "{:?} borrowed {} COMP and now holds {} ({} threshold: {})",
                        borrower, borrowed, new, threshold.name, threshold.min_amount
                    ),
                    meta,
                )
                .with_severity(AlertSeverity::High)
                .with_kind(AlertKind::Suspicious)
                .with_metadata(json!({
                    "borrower": format!("{:?}", borrower),
                    "threshold": threshold.name,
                    "minAmount": threshold.min_amount.to_string(),
                    "borrowAmount": borrowed.to_string(),
                    "balance": new.to_string(),
                }))
            })
            .collect())
    }
}
