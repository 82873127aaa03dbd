//! Decoded events.

use alloy_primitives::Address;
use serde::{Serialize, Serializer};
use std::sync::Arc;

use crate::args::DecodedArgs;
use crate::chain::{Block, Tx};
use crate::error::DecodeError;
use crate::log::LogRecord;
use crate::types::hash_hex;

/// The result of decoding a log before it is attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub name: String,
    pub address: Address,
    pub args: DecodedArgs,
    pub log_index: u64,
}

/// A fully decoded event, the unit passed to filters and templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    #[serde(serialize_with = "serialize_checksum")]
    pub address: Address,
    pub args: DecodedArgs,
    pub log_index: u64,
    pub tx: Arc<Tx>,
}

impl Event {
    /// Attach decoded data to its transaction.
    ///
    /// Without `tx`, the transaction is rebuilt from the log's hash and index
    /// under `block`. A supplied `tx` must carry the log's transaction hash.
    pub fn from_event_data(
        data: EventData,
        log: &LogRecord,
        block: &Arc<Block>,
        tx: Option<&Arc<Tx>>,
    ) -> Result<Self, DecodeError> {
        let tx = match tx {
            Some(tx) if tx.hash != log.transaction_hash => {
                return Err(DecodeError::TxMismatch {
                    log_tx: hash_hex(&log.transaction_hash),
                    supplied_tx: hash_hex(&tx.hash),
                });
            }
            Some(tx) => Arc::clone(tx),
            None => Arc::new(Tx::new(
                log.transaction_hash,
                log.transaction_index,
                Arc::clone(block),
            )),
        };
        Ok(Self {
            name: data.name,
            address: data.address,
            args: data.args,
            log_index: data.log_index,
            tx,
        })
    }

    pub fn block(&self) -> &Block {
        &self.tx.block
    }

    /// (block number, tx index, log index)
    pub fn sort_key(&self) -> (u64, u64, u64) {
        (self.tx.block.number, self.tx.index, self.log_index)
    }
}

fn serialize_checksum<S: Serializer>(a: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&a.to_checksum(None))
}

/// One transaction, its raw logs and the decoded event for each log.
///
/// `decoded_logs[i]` corresponds to `raw_logs[i]`; logs that did not decode
/// are `None`.
#[derive(Debug, Clone)]
pub struct DecodedTxLogs {
    pub tx: Arc<Tx>,
    pub raw_logs: Vec<LogRecord>,
    pub decoded_logs: Vec<Option<Event>>,
}

impl DecodedTxLogs {
    /// Decoded events only, in log order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.decoded_logs.iter().flatten()
    }
}
