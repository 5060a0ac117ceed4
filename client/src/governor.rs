//! GovernorBravo contract reader.
//!
//! Reads proposal count, state and eta through `eth_call`, and builds the
//! calldata for the `queue` and `execute` transactions submitted by the
//! automation.

use crate::error::{ClientError, Result};
use crate::rpc::EthRpcClient;
use async_trait::async_trait;
use compound_governance::{
    GovernanceError, ProposalId, ProposalSnapshot, ProposalSource, ProposalState,
};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use tracing::debug;

/// Revert message GovernorBravo uses for IDs that do not exist yet
const INVALID_PROPOSAL_ID: &str = "invalid proposal id";

/// Encode a call to `name(uint256)`
fn encode_uint_call(name: &str, value: u64) -> Bytes {
    let selector = abi::short_signature(name, &[ParamType::Uint(256)]);
    let mut data = selector.to_vec();
    data.extend(abi::encode(&[Token::Uint(U256::from(value))]));
    Bytes::from(data)
}

/// Encode a call without arguments
fn encode_call(name: &str) -> Bytes {
    Bytes::from(abi::short_signature(name, &[]).to_vec())
}

fn decode_single_uint(output: &[u8], what: &str) -> Result<U256> {
    abi::decode(&[ParamType::Uint(256)], output)?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| ClientError::AbiError(format!("Missing {} in output", what)))
}

/// Layout of the `proposals(uint256)` getter
fn proposal_struct_layout() -> Vec<ParamType> {
    vec![
        ParamType::Uint(256), // id
        ParamType::Address,   // proposer
        ParamType::Uint(256), // eta
        ParamType::Uint(256), // startBlock
        ParamType::Uint(256), // endBlock
        ParamType::Uint(256), // forVotes
        ParamType::Uint(256), // againstVotes
        ParamType::Uint(256), // abstainVotes
        ParamType::Bool,      // canceled
        ParamType::Bool,      // executed
    ]
}

fn to_u64(value: U256, what: &str) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(ClientError::AbiError(format!(
            "{} does not fit in 64 bits: {}",
            what, value
        )));
    }
    Ok(value.as_u64())
}

/// Read access to a GovernorBravo deployment
#[derive(Clone)]
pub struct GovernorBravo {
    rpc: EthRpcClient,
    address: Address,
}

impl GovernorBravo {
    /// Create a reader for the governor at `address`
    pub fn new(rpc: EthRpcClient, address: Address) -> Self {
        Self { rpc, address }
    }

    /// Governor contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Number of proposals created
    pub async fn proposal_count(&self) -> Result<u64> {
        let output = self
            .rpc
            .call(self.address, encode_call("proposalCount"))
            .await?;
        to_u64(decode_single_uint(&output, "proposalCount")?, "proposalCount")
    }

    /// Current state of a proposal
    pub async fn state(&self, id: ProposalId) -> Result<ProposalState> {
        let output = self
            .rpc
            .call(self.address, encode_uint_call("state", id))
            .await?;
        let ordinal = decode_single_uint(&output, "state")?;
        if ordinal > U256::from(u8::MAX) {
            return Err(ClientError::AbiError(format!(
                "State ordinal out of range: {}",
                ordinal
            )));
        }

        Ok(ProposalState::try_from(ordinal.as_u32() as u8)?)
    }

    /// Earliest execution time of a proposal, 0 until queued
    pub async fn eta(&self, id: ProposalId) -> Result<u64> {
        let output = self
            .rpc
            .call(self.address, encode_uint_call("proposals", id))
            .await?;
        let tokens = abi::decode(&proposal_struct_layout(), &output)?;
        let eta = tokens
            .into_iter()
            .nth(2)
            .and_then(Token::into_uint)
            .ok_or_else(|| ClientError::AbiError("Missing eta in proposal".to_string()))?;
        to_u64(eta, "eta")
    }

    /// State and eta of a proposal, `None` if the ID does not exist yet
    pub async fn snapshot(&self, id: ProposalId) -> Result<Option<ProposalSnapshot>> {
        match futures::try_join!(self.state(id), self.eta(id)) {
            Ok((state, eta)) => {
                debug!("Proposal {} is {} (eta {})", id, state, eta);
                Ok(Some(ProposalSnapshot::new(id, state, eta)))
            }
            Err(ClientError::ExecutionReverted(reason)) if reason.contains(INVALID_PROPOSAL_ID) => {
                Ok(None)
            }
            // Some nodes drop the revert reason
            Err(ClientError::ExecutionReverted(reason)) => {
                let count = self.proposal_count().await?;
                if id == 0 || id > count {
                    debug!("Proposal {} is past the proposal count {}", id, count);
                    Ok(None)
                } else {
                    Err(ClientError::ExecutionReverted(reason))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Calldata for `queue(id)`
    pub fn queue_calldata(id: ProposalId) -> Bytes {
        encode_uint_call("queue", id)
    }

    /// Calldata for `execute(id)`
    pub fn execute_calldata(id: ProposalId) -> Bytes {
        encode_uint_call("execute", id)
    }
}

#[async_trait]
impl ProposalSource for GovernorBravo {
    async fn proposal_count(&self) -> compound_governance::Result<ProposalId> {
        GovernorBravo::proposal_count(self)
            .await
            .map_err(|e| GovernanceError::ProposalCount(e.to_string()))
    }

    async fn snapshot(
        &self,
        id: ProposalId,
    ) -> compound_governance::Result<Option<ProposalSnapshot>> {
        GovernorBravo::snapshot(self, id)
            .await
            .map_err(|e| proposal_query_error(id, e))
    }
}

/// Decode failures repeat on every cycle, everything else may clear up
fn proposal_query_error(id: ProposalId, error: ClientError) -> GovernanceError {
    match error {
        ClientError::Governance(e) => e,
        ClientError::AbiError(message) => GovernanceError::InvalidProposalData { id, message },
        other => GovernanceError::ProposalQuery {
            id,
            message: other.to_string(),
        },
    }
}
