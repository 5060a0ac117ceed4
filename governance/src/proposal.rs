//! Governance proposal lifecycle model.
//!
//! `Pending → Active → {Canceled | Defeated | Succeeded → Queued → Executed | Expired}`

use crate::error::GovernanceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-chain proposal identifier
pub type ProposalId = u64;

/// Proposal state as reported by GovernorBravo's `state(uint256)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Voting has not started
    Pending,
    /// Voting is open
    Active,
    /// Proposal was canceled
    Canceled,
    /// Proposal lost the vote or missed quorum
    Defeated,
    /// Proposal passed and can be queued
    Succeeded,
    /// Proposal is queued in the timelock
    Queued,
    /// Proposal was not executed within the grace period
    Expired,
    /// Proposal was executed
    Executed,
}

impl ProposalState {
    /// Terminal states are never polled again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Canceled
                | ProposalState::Defeated
                | ProposalState::Expired
                | ProposalState::Executed
        )
    }
}

impl TryFrom<u8> for ProposalState {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ProposalState::Pending),
            1 => Ok(ProposalState::Active),
            2 => Ok(ProposalState::Canceled),
            3 => Ok(ProposalState::Defeated),
            4 => Ok(ProposalState::Succeeded),
            5 => Ok(ProposalState::Queued),
            6 => Ok(ProposalState::Expired),
            7 => Ok(ProposalState::Executed),
            other => Err(GovernanceError::UnknownProposalState(other)),
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Canceled => "Canceled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Queued => "Queued",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
        };
        write!(f, "{}", name)
    }
}

/// Point-in-time view of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSnapshot {
    /// Proposal ID
    pub id: ProposalId,
    /// Current state
    pub state: ProposalState,
    /// Earliest execution timestamp, `None` until queued
    pub eta: Option<u64>,
}

impl ProposalSnapshot {
    /// Create a snapshot; an on-chain `eta` of zero means unset
    pub fn new(id: ProposalId, state: ProposalState, eta: u64) -> Self {
        Self {
            id,
            state,
            eta: (eta != 0).then_some(eta),
        }
    }
}

/// Transaction the automation wants submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalAction {
    /// Call `queue(id)` on the governor
    Queue(ProposalId),
    /// Call `execute(id)` on the governor
    Execute(ProposalId),
}

impl ProposalAction {
    /// Action name, used in marker keys
    pub fn name(&self) -> &'static str {
        match self {
            ProposalAction::Queue(_) => "queue",
            ProposalAction::Execute(_) => "execute",
        }
    }

    /// Proposal the action targets
    pub fn proposal_id(&self) -> ProposalId {
        match self {
            ProposalAction::Queue(id) | ProposalAction::Execute(id) => *id,
        }
    }
}

impl fmt::Display for ProposalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.proposal_id())
    }
}

/// Outcome of evaluating one proposal snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Terminal state, add to the ignore set
    Ignore,
    /// Submit this action (at most once)
    Submit(ProposalAction),
    /// Nothing to do yet, poll again next cycle
    Wait,
}

/// Decide what to do with a proposal at unix time `now`
pub fn decide(snapshot: &ProposalSnapshot, now: u64) -> Decision {
    match snapshot.state {
        state if state.is_terminal() => Decision::Ignore,
        ProposalState::Succeeded => Decision::Submit(ProposalAction::Queue(snapshot.id)),
        ProposalState::Queued => match snapshot.eta {
            Some(eta) if now >= eta => Decision::Submit(ProposalAction::Execute(snapshot.id)),
            _ => Decision::Wait,
        },
        _ => Decision::Wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, ProposalState::Pending ; "pending")]
    #[test_case(1, ProposalState::Active ; "active")]
    #[test_case(2, ProposalState::Canceled ; "canceled")]
    #[test_case(3, ProposalState::Defeated ; "defeated")]
    #[test_case(4, ProposalState::Succeeded ; "succeeded")]
    #[test_case(5, ProposalState::Queued ; "queued")]
    #[test_case(6, ProposalState::Expired ; "expired")]
    #[test_case(7, ProposalState::Executed ; "executed")]
    fn test_state_from_ordinal(ordinal: u8, expected: ProposalState) {
        assert_eq!(ProposalState::try_from(ordinal).unwrap(), expected);
    }

    #[test]
    fn test_unknown_ordinal() {
        assert_eq!(
            ProposalState::try_from(8),
            Err(GovernanceError::UnknownProposalState(8))
        );
    }

    #[test_case(ProposalState::Canceled, Decision::Ignore ; "canceled is terminal")]
    #[test_case(ProposalState::Defeated, Decision::Ignore ; "defeated is terminal")]
    #[test_case(ProposalState::Expired, Decision::Ignore ; "expired is terminal")]
    #[test_case(ProposalState::Executed, Decision::Ignore ; "executed is terminal")]
    #[test_case(ProposalState::Pending, Decision::Wait ; "pending waits")]
    #[test_case(ProposalState::Active, Decision::Wait ; "active waits")]
    #[test_case(ProposalState::Succeeded, Decision::Submit(ProposalAction::Queue(1)) ; "succeeded queues")]
    fn test_decide(state: ProposalState, expected: Decision) {
        let snapshot = ProposalSnapshot::new(1, state, 0);
        assert_eq!(decide(&snapshot, 100), expected);
    }

    #[test]
    fn test_queued_executes_once_eta_passed() {
        let ready = ProposalSnapshot::new(3, ProposalState::Queued, 99);
        assert_eq!(
            decide(&ready, 100),
            Decision::Submit(ProposalAction::Execute(3))
        );

        let exact = ProposalSnapshot::new(3, ProposalState::Queued, 100);
        assert_eq!(
            decide(&exact, 100),
            Decision::Submit(ProposalAction::Execute(3))
        );

        let early = ProposalSnapshot::new(3, ProposalState::Queued, 101);
        assert_eq!(decide(&early, 100), Decision::Wait);
    }

    #[test]
    fn test_queued_without_eta_waits() {
        let snapshot = ProposalSnapshot::new(3, ProposalState::Queued, 0);
        assert_eq!(snapshot.eta, None);
        assert_eq!(decide(&snapshot, u64::MAX), Decision::Wait);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(ProposalAction::Queue(12).to_string(), "queue(12)");
        assert_eq!(ProposalAction::Execute(4).to_string(), "execute(4)");
    }
}
