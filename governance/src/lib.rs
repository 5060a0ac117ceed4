//! Compound Governance Decision Core
//!
//! Pure decision logic shared by the Compound monitors and automations:
//!
//! - **Threshold crossing**: which named governance amounts (proposal
//!   threshold, voting quorum) an account newly reached after a balance
//!   change, computed with arbitrary-precision decimals
//! - **Proposal lifecycle**: typed GovernorBravo proposal states and the
//!   queue/execute decision for each state
//! - **Proposal tracking**: the poll cycle that keeps an ignore-set of
//!   terminal proposals and submits each action at most once
//!
//! Chain access, transaction submission and persistence are injected
//! through the [`ProposalSource`], [`ActionSubmitter`] and
//! [`KeyValueStore`] traits.
//!
//! # Example
//!
//! ```rust
//! use compound_governance::{Threshold, ThresholdSet};
//! use bigdecimal::BigDecimal;
//!
//! let thresholds = ThresholdSet::new(vec![
//!     Threshold::new("proposal", 1100),
//!     Threshold::new("votingQuorum", 4400),
//! ]);
//!
//! let crossed = thresholds.crossed(&BigDecimal::from(1099), &BigDecimal::from(4401));
//! assert_eq!(crossed.len(), 2);
//! assert_eq!(crossed[0].name, "proposal");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod ignore_set;
pub mod proposal;
pub mod store;
pub mod threshold;
pub mod tracker;

pub use error::{GovernanceError, Result};
pub use ignore_set::IgnoreSet;
pub use proposal::{
    decide, Decision, ProposalAction, ProposalId, ProposalSnapshot, ProposalState,
};
pub use store::{KeyValueStore, MemoryStore};
pub use threshold::{crossed, from_base_units, Threshold, ThresholdSet};
pub use tracker::{
    ActionSubmitter, PollReport, ProposalScope, ProposalSource, ProposalTracker, TrackerConfig,
};

pub use bigdecimal::BigDecimal;
