/// Data models for decoded events and emitted alerts
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a decoded event came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMeta {
    /// Contract that emitted the event
    pub contract_address: Address,

    /// Block number where the event occurred
    pub block_number: u64,

    /// Transaction hash that generated the event
    pub transaction_hash: String,

    /// Log index within the block
    pub log_index: u64,
}

/// Events the monitors react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EventKind {
    /// `DelegateVotesChanged(address indexed delegate, uint previousBalance, uint newBalance)`
    DelegateVotesChanged {
        /// Delegate whose voting power changed
        delegate: Address,
        /// Raw votes before the change
        previous_balance: U256,
        /// Raw votes after the change
        new_balance: U256,
    },

    /// `Borrow(address borrower, uint borrowAmount, uint accountBorrows, uint totalBorrows)`
    Borrow {
        /// Account that borrowed
        borrower: Address,
        /// Raw amount borrowed
        borrow_amount: U256,
        /// Raw outstanding borrow of the account
        account_borrows: U256,
        /// Raw outstanding borrows of the market
        total_borrows: U256,
    },
}

/// A log decoded into a typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Origin of the log
    pub meta: LogMeta,

    /// Decoded parameters
    pub kind: EventKind,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Alert category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Informational change
    Info,
    /// Change worth a closer look
    Suspicious,
}

/// Alert emitted by a monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier for this alert
    pub id: Uuid,

    /// Stable identifier of the alert type
    pub alert_id: String,

    /// Short title
    pub name: String,

    /// Human readable description
    pub description: String,

    /// Severity
    pub severity: AlertSeverity,

    /// Category
    pub kind: AlertKind,

    /// Structured details
    pub metadata: serde_json::Value,

    /// Block of the triggering event
    pub block_number: u64,

    /// Transaction of the triggering event
    pub transaction_hash: String,

    /// When the alert was raised
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Create an alert for an event
    pub fn new(
        alert_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        meta: &LogMeta,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id: alert_id.into(),
            name: name.into(),
            description: description.into(),
            severity: AlertSeverity::Info,
            kind: AlertKind::Info,
            metadata: serde_json::Value::Null,
            block_number: meta.block_number,
            transaction_hash: meta.transaction_hash.clone(),
            created_at: Utc::now(),
        }
    }

    /// Set severity
    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set category
    pub fn with_kind(mut self, kind: AlertKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set structured details
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} ({}): {}",
            self.severity, self.name, self.alert_id, self.description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> LogMeta {
        LogMeta {
            contract_address: Address::repeat_byte(0x01),
            block_number: 17_000_000,
            transaction_hash: "0xabc".to_string(),
            log_index: 3,
        }
    }

    #[test]
    fn test_alert_builder() {
        let alert = Alert::new("COMP-TEST", "Test", "something happened", &meta())
            .with_severity(AlertSeverity::High)
            .with_kind(AlertKind::Suspicious)
            .with_metadata(serde_json::json!({ "threshold": "proposal" }));

        assert_eq!(alert.block_number, 17_000_000);
        assert_eq!(alert.transaction_hash, "0xabc");
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.metadata["threshold"], "proposal");
        assert_eq!(
            alert.to_string(),
            "[High] Test (COMP-TEST): something happened"
        );
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::new("COMP-TEST", "Test", "d", &meta()).with_severity(AlertSeverity::Medium);
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["kind"], "info");

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, alert.id);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::Info < AlertSeverity::Low);
    }
}
