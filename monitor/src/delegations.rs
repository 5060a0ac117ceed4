/// Delegation threshold monitor
///
/// Watches `DelegateVotesChanged` on the COMP token and raises an alert
/// each time a delegate's voting power newly reaches a governance
/// threshold (proposal threshold, voting quorum).
use crate::error::MonitorResult;
use crate::models::{Alert, AlertKind, AlertSeverity, LogMeta};
use compound_governance::{from_base_units, Threshold, ThresholdSet};
use ethers::types::{Address, U256};
use serde_json::json;
use tracing::{debug, info};

/// Alert ID for a delegate reaching a threshold
pub const DELEGATE_THRESHOLD_ALERT: &str = "COMP-DELEGATE-THRESHOLD";

/// COMP token decimals
pub const COMP_DECIMALS: u32 = 18;

/// Applies the threshold detector to delegated votes
#[derive(Debug, Clone)]
pub struct DelegationMonitor {
    thresholds: ThresholdSet,
    decimals: u32,
}

impl DelegationMonitor {
    /// Create a monitor for a token with `decimals`
    pub fn new(thresholds: ThresholdSet, decimals: u32) -> Self {
        Self {
            thresholds,
            decimals,
        }
    }

    /// Thresholds watched
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Alerts for one `DelegateVotesChanged` event
    pub fn handle(
        &self,
        meta: &LogMeta,
        delegate: Address,
        previous_balance: U256,
        new_balance: U256,
    ) -> MonitorResult<Vec<Alert>> {
        let previous = from_base_units(&previous_balance.to_string(), self.decimals)?;
        let new = from_base_units(&new_balance.to_string(), self.decimals)?;

        let crossed = self.thresholds.crossed(&previous, &new);
        if crossed.is_empty() {
            debug!("Delegate {:?}: {} -> {} COMP, no threshold", delegate, previous, new);
            return Ok(Vec::new());
        }

        let top = self.thresholds.thresholds().last().map(|t| t.name.clone());
        Ok(crossed
            .into_iter()
            .map(|threshold| {
                info!(
                    "Delegate {:?} reached {} ({} COMP)",
                    delegate, threshold.name, threshold.min_amount
                );
                let severity = if Some(&threshold.name) == top.as_ref() {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                };
                threshold_alert(meta, delegate, &threshold, &previous.to_string(), &new.to_string())
                    .with_severity(severity)
            })
            .collect())
    }
}

fn threshold_alert(
    meta: &LogMeta,
    delegate: Address,
    threshold: &Threshold,
    previous: &str,
    new: &str,
) -> Alert {
    Alert::new(
        DELEGATE_THRESHOLD_ALERT,
        format!("Delegate reached {} threshold", threshold.name),
        format!(
            "{:?} now has {} votes, up from {} ({} threshold: {})",
            delegate, new, previous, threshold.name, threshold.min_amount
        ),
        meta,
    )
    .with_kind(AlertKind::Info)
    .with_metadata(json!({
        "delegate": format!("{:?}", delegate),
        "threshold": threshold.name,
        "minAmount": threshold.min_amount.to_string(),
        "previousBalance": previous,
        "newBalance": new,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn meta() -> LogMeta {
        LogMeta {
            contract_address: Address::repeat_byte(0xc0),
            block_number: 1,
            transaction_hash: "0x01".to_string(),
            log_index: 0,
        }
    }

    fn comp(amount: u64) -> U256 {
        U256::from(amount) * U256::exp10(COMP_DECIMALS as usize)
    }

    fn monitor() -> DelegationMonitor {
        DelegationMonitor::new(ThresholdSet::compound_governance(), COMP_DECIMALS)
    }

    #[test]
    fn test_crosses_proposal_threshold() {
        let delegate = Address::repeat_byte(0x11);
        let alerts = monitor()
            .handle(&meta(), delegate, comp(24_999), comp(25_000))
            .unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_id, DELEGATE_THRESHOLD_ALERT);
        assert_eq!(alerts[0].metadata["threshold"], "proposal");
        let new_balance: BigDecimal = alerts[0].metadata["newBalance"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(new_balance, BigDecimal::from(25_000));
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
    }

    #[test]
    fn test_crosses_both_thresholds_in_order() {
        let alerts = monitor()
            .handle(&meta(), Address::zero(), comp(1_000), comp(500_000))
            .unwrap();

        let names: Vec<_> = alerts
            .iter()
            .map(|a| a.metadata["threshold"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["proposal", "votingQuorum"]);
        assert_eq!(alerts[1].severity, AlertSeverity::High);
    }

    #[test]
    fn test_no_alert_when_already_above_or_decreasing() {
        let monitor = monitor();
        assert!(monitor
            .handle(&meta(), Address::zero(), comp(30_000), comp(40_000))
            .unwrap()
            .is_empty());
        assert!(monitor
            .handle(&meta(), Address::zero(), comp(30_000), comp(10_000))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_fractional_balances_keep_precision() {
        // One wei short of the threshold
        let just_below = comp(25_000) - U256::one();
        let alerts = monitor()
            .handle(&meta(), Address::zero(), U256::zero(), just_below)
            .unwrap();
        assert!(alerts.is_empty());

        let alerts = monitor()
            .handle(&meta(), Address::zero(), just_below, comp(25_000))
            .unwrap();
        assert_eq!(alerts.len(), 1);
    }
}
