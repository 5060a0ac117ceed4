//! COMP token reader.

use crate::error::{ClientError, Result};
use crate::rpc::EthRpcClient;
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};

fn encode_address_call(name: &str, account: Address) -> Bytes {
    let mut data = abi::short_signature(name, &[ParamType::Address]).to_vec();
    data.extend(abi::encode(&[Token::Address(account)]));
    Bytes::from(data)
}

fn decode_uint(output: &[u8]) -> Result<U256> {
    abi::decode(&[ParamType::Uint(256)], output)?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| ClientError::AbiError("Expected a uint256 output".to_string()))
}

/// Read access to the COMP token (ERC20 with checkpointed votes)
#[derive(Clone)]
pub struct CompToken {
    rpc: EthRpcClient,
    address: Address,
}

impl CompToken {
    /// Create a reader for the token at `address`
    pub fn new(rpc: EthRpcClient, address: Address) -> Self {
        Self { rpc, address }
    }

    /// Token contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Token decimals
    pub async fn decimals(&self) -> Result<u32> {
        let data = Bytes::from(abi::short_signature("decimals", &[]).to_vec());
        let output = self.rpc.call(self.address, data).await?;
        let decimals = decode_uint(&output)?;
        if decimals > U256::from(u8::MAX) {
            return Err(ClientError::InvalidResponse(format!(
                "Unexpected decimals: {}",
                decimals
            )));
        }
        Ok(decimals.as_u32())
    }

    /// Raw token balance of an account
    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        let output = self
            .rpc
            .call(self.address, encode_address_call("balanceOf", account))
            .await?;
        decode_uint(&output)
    }

    /// Raw voting power currently delegated to an account
    pub async fn get_current_votes(&self, account: Address) -> Result<U256> {
        let output = self
            .rpc
            .call(self.address, encode_address_call("getCurrentVotes", account))
            .await?;
        decode_uint(&output)
    }
}
