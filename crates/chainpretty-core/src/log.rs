//! The canonical log record every decoder consumes.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The raw representation a log arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Typed receipt logs from an RPC client
    RpcCall,
    /// Hex-string JSON as returned by `eth_getLogs` / receipts
    RpcJson,
    /// Alchemy-style GraphQL webhook payload
    Graphql,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogFormat::RpcCall => "rpc-call",
            LogFormat::RpcJson => "rpc-json",
            LogFormat::Graphql => "graphql",
        };
        f.write_str(s)
    }
}

/// A log in canonical form.
///
/// `topics[0]` is the event signature topic. A record with no topics is an
/// anonymous log and is never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: u64,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub block_hash: B256,
    pub block_number: u64,
    #[serde(default)]
    pub removed: bool,
}

impl LogRecord {
    /// The signature topic, if any.
    pub fn signature_topic(&self) -> Option<&B256> {
        self.topics.first()
    }

    /// Key used to order logs deterministically across a block range.
    pub fn sort_key(&self) -> (u64, u64, u64) {
        (self.block_number, self.transaction_index, self.log_index)
    }
}
