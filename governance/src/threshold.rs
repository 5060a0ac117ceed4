//! Threshold-crossing detection for governance token balances.
//!
//! A [`ThresholdSet`] holds named amounts (e.g. the proposal threshold and
//! the voting quorum) in normalized token units. Given an account's balance
//! before and after a change, [`ThresholdSet::crossed`] reports the
//! thresholds that were newly reached: `previous < min_amount <= new`.
//! Thresholds already exceeded before the change are never reported again.

use crate::error::{GovernanceError, Result};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// GovernorBravo `proposalThreshold`, in COMP
pub const COMP_PROPOSAL_THRESHOLD: u64 = 25_000;

/// GovernorBravo `quorumVotes`, in COMP
pub const COMP_VOTING_QUORUM: u64 = 400_000;

/// A named governance-relevant amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    /// Threshold name, e.g. `proposal` or `votingQuorum`
    pub name: String,
    /// Amount (inclusive) an account has to reach
    pub min_amount: BigDecimal,
}

impl Threshold {
    /// Create a new threshold
    pub fn new(name: impl Into<String>, min_amount: impl Into<BigDecimal>) -> Self {
        Self {
            name: name.into(),
            min_amount: min_amount.into(),
        }
    }
}

/// Thresholds kept in ascending order of `min_amount`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Threshold>", into = "Vec<Threshold>")]
pub struct ThresholdSet {
    thresholds: Vec<Threshold>,
}

impl ThresholdSet {
    /// Build a set from thresholds in any order.
    ///
    /// Thresholds with equal amounts keep their relative order.
    pub fn new(mut thresholds: Vec<Threshold>) -> Self {
        thresholds.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));
        Self { thresholds }
    }

    /// Proposal threshold and voting quorum of Compound's GovernorBravo
    pub fn compound_governance() -> Self {
        Self::new(vec![
            Threshold::new("proposal", COMP_PROPOSAL_THRESHOLD),
            Threshold::new("votingQuorum", COMP_VOTING_QUORUM),
        ])
    }

    /// Thresholds in ascending order
    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Number of thresholds
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    /// Whether the set holds no thresholds
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Thresholds newly reached by a balance moving from `previous` to `new`
    pub fn crossed(&self, previous: &BigDecimal, new: &BigDecimal) -> Vec<Threshold> {
        if new <= previous {
            return Vec::new();
        }

        self.thresholds
            .iter()
            .filter(|t| previous < &t.min_amount && &t.min_amount <= new)
            .cloned()
            .collect()
    }
}

impl From<Vec<Threshold>> for ThresholdSet {
    fn from(thresholds: Vec<Threshold>) -> Self {
        Self::new(thresholds)
    }
}

impl From<ThresholdSet> for Vec<Threshold> {
    fn from(set: ThresholdSet) -> Self {
        set.thresholds
    }
}

/// Thresholds newly reached by a balance moving from `previous` to `new`
pub fn crossed(previous: &BigDecimal, new: &BigDecimal, thresholds: &ThresholdSet) -> Vec<Threshold> {
    thresholds.crossed(previous, new)
}

/// Convert an on-chain integer amount into token units.
///
/// `raw` is the decimal string of an unsigned integer (e.g. a `uint256`
/// balance) and `decimals` the token's decimals. No floating point is
/// involved, so 18-decimal balances keep every digit.
pub fn from_base_units(raw: &str, decimals: u32) -> Result<BigDecimal> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GovernanceError::InvalidAmount(format!(
            "expected unsigned integer, got {:?}",
            raw
        )));
    }

    BigDecimal::from_str(&format!("{}e-{}", raw, decimals))
        .map(|amount| amount.normalized())
        .map_err(|e| GovernanceError::InvalidAmount(e.to_string()))
}
