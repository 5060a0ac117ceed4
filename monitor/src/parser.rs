/// Event parser for decoding COMP and cCOMP logs
use crate::error::{MonitorError, MonitorResult};
use crate::models::{DecodedEvent, EventKind, LogMeta};
use ethers::abi::{Abi, Event as AbiEvent, Log as AbiLog, RawLog, Token};
use ethers::prelude::*;
use std::collections::HashMap;

/// `DelegateVotesChanged` event of the COMP token
pub const DELEGATE_VOTES_CHANGED_ABI: &str = r#"
{
  "anonymous": false,
  "inputs": [
    {"indexed": true, "name": "delegate", "type": "address"},
    {"indexed": false, "name": "previousBalance", "type": "uint256"},
    {"indexed": false, "name": "newBalance", "type": "uint256"}
  ],
  "name": "DelegateVotesChanged",
  "type": "event"
}
"#;

/// `Borrow` event of a Compound v2 cToken
pub const CTOKEN_BORROW_ABI: &str = r#"
{
  "anonymous": false,
  "inputs": [
    {"indexed": false, "name": "borrower", "type": "address"},
    {"indexed": false, "name": "borrowAmount", "type": "uint256"},
    {"indexed": false, "name": "accountBorrows", "type": "uint256"},
    {"indexed": false, "name": "totalBorrows", "type": "uint256"}
  ],
  "name": "Borrow",
  "type": "event"
}
"#;

/// Event parser that decodes logs of registered contracts into typed events
pub struct EventParser {
    /// Events each contract is watched for, keyed by topic0
    contracts: HashMap<Address, HashMap<H256, AbiEvent>>,
}

impl EventParser {
    /// Create a new event parser
    pub fn new() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    /// Parser for the COMP token and the cCOMP market
    pub fn compound(comp: Address, ccomp: Address) -> MonitorResult<Self> {
        let mut parser = Self::new();
        parser.register_contract(comp, &format!("[{}]", DELEGATE_VOTES_CHANGED_ABI.trim()))?;
        parser.register_contract(ccomp, &format!("[{}]", CTOKEN_BORROW_ABI.trim()))?;
        Ok(parser)
    }

    /// Register the events of a contract ABI
    ///
    /// # Arguments
    /// * `contract_address` - Contract address
    /// * `abi_json` - ABI as JSON string
    pub fn register_contract(
        &mut self,
        contract_address: Address,
        abi_json: &str,
    ) -> MonitorResult<()> {
        let abi: Abi = serde_json::from_str(abi_json)
            .map_err(|e| MonitorError::EventParsing(format!("Invalid ABI: {}", e)))?;

        let events = self.contracts.entry(contract_address).or_default();
        for event in abi.events() {
            events.insert(event.signature(), event.clone());
        }

        Ok(())
    }

    /// Addresses with registered events
    pub fn registered_contracts(&self) -> Vec<Address> {
        self.contracts.keys().copied().collect()
    }

    /// Topic0 hashes of every registered event
    pub fn signatures(&self) -> Vec<H256> {
        let mut signatures: Vec<H256> = self
            .contracts
            .values()
            .flat_map(|events| events.keys().copied())
            .collect();
        signatures.sort();
        signatures.dedup();
        signatures
    }

    /// Parse a log into a typed event
    ///
    /// # Returns
    /// Decoded event, or None if the log is not one the monitors watch
    pub fn parse_log(&self, log: &Log) -> MonitorResult<Option<DecodedEvent>> {
        let events = match self.contracts.get(&log.address) {
            Some(events) => events,
            None => return Ok(None), // Unknown contract, skip
        };

        let event_def = match log.topics.first().and_then(|topic| events.get(topic)) {
            Some(def) => def,
            None => return Ok(None), // Unknown event, skip
        };

        let decoded = event_def
            .parse_log(RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            })
            .map_err(|e| MonitorError::EventParsing(format!("Failed to decode event: {}", e)))?;

        let kind = match event_def.name.as_str() {
            "DelegateVotesChanged" => EventKind::DelegateVotesChanged {
                delegate: address_param(&decoded, "delegate")?,
                previous_balance: uint_param(&decoded, "previousBalance")?,
                new_balance: uint_param(&decoded, "newBalance")?,
            },
            "Borrow" => EventKind::Borrow {
                borrower: address_param(&decoded, "borrower")?,
                borrow_amount: uint_param(&decoded, "borrowAmount")?,
                account_borrows: uint_param(&decoded, "accountBorrows")?,
                total_borrows: uint_param(&decoded, "totalBorrows")?,
            },
            _ => return Ok(None),
        };

        Ok(Some(DecodedEvent {
            meta: log_meta(log)?,
            kind,
        }))
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

fn log_meta(log: &Log) -> MonitorResult<LogMeta> {
    Ok(LogMeta {
        contract_address: log.address,
        block_number: log
            .block_number
            .ok_or_else(|| MonitorError::EventParsing("Missing block number".to_string()))?
            .as_u64(),
        transaction_hash: format!(
            "{:?}",
            log.transaction_hash
                .ok_or_else(|| MonitorError::EventParsing("Missing transaction hash".to_string()))?
        ),
        log_index: log
            .log_index
            .ok_or_else(|| MonitorError::EventParsing("Missing log index".to_string()))?
            .as_u64(),
    })
}

fn param<'a>(decoded: &'a AbiLog, name: &str) -> MonitorResult<&'a Token> {
    decoded
        .params
        .iter()
        .find(|p| p.name == name)
        .map(|p| &p.value)
        .ok_or_else(|| MonitorError::EventParsing(format!("Missing parameter {}", name)))
}

fn address_param(decoded: &AbiLog, name: &str) -> MonitorResult<Address> {
    param(decoded, name)?
        .clone()
        .into_address()
        .ok_or_else(|| MonitorError::EventParsing(format!("{} is not an address", name)))
}

fn uint_param(decoded: &AbiLog, name: &str) -> MonitorResult<U256> {
    param(decoded, name)?
        .clone()
        .into_uint()
        .ok_or_else(|| MonitorError::EventParsing(format!("{} is not a uint", name)))
}
