//! Log normalization: three raw log representations → `LogRecord`.
//!
//! | format     | source                                    | numbers          |
//! |------------|-------------------------------------------|------------------|
//! | `rpc-call` | typed receipt logs from the RPC client    | typed            |
//! | `rpc-json` | raw `eth_getLogs` / receipt JSON          | hex quantities   |
//! | `graphql`  | Alchemy GraphQL webhook (`event.data.block`) | JSON integers |
//!
//! Each converter fails with a `LogFormatError` naming the format and the
//! offending key. Identity fields (hashes, address, indices) are never
//! defaulted; `removed` defaults to `false` when absent.

use alloy_primitives::{Address, Bytes, B256, U64};
use chainpretty_core::{Block, Chain, LogFormat, LogFormatError, LogRecord};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

// ─── RPC-call (typed) ─────────────────────────────────────────────────────────

/// A receipt log as returned by a typed RPC client. Position fields are
/// optional because pending logs carry none of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCallLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: Option<U64>,
    pub transaction_hash: Option<B256>,
    pub transaction_index: Option<U64>,
    pub block_hash: Option<B256>,
    pub block_number: Option<U64>,
    #[serde(default)]
    pub removed: bool,
}

pub fn from_rpc_call(log: &RpcCallLog) -> Result<LogRecord, LogFormatError> {
    let missing = |field: &str| LogFormatError::MissingField {
        format: LogFormat::RpcCall,
        field: field.to_string(),
    };
    Ok(LogRecord {
        address: log.address,
        topics: log.topics.clone(),
        data: log.data.clone(),
        log_index: log.log_index.ok_or_else(|| missing("logIndex"))?.to::<u64>(),
        transaction_hash: log.transaction_hash.ok_or_else(|| missing("transactionHash"))?,
        transaction_index: log
            .transaction_index
            .ok_or_else(|| missing("transactionIndex"))?
            .to::<u64>(),
        block_hash: log.block_hash.ok_or_else(|| missing("blockHash"))?,
        block_number: log.block_number.ok_or_else(|| missing("blockNumber"))?.to::<u64>(),
        removed: log.removed,
    })
}

// ─── RPC JSON (hex strings) ───────────────────────────────────────────────────

pub fn from_rpc_json(log: &Value) -> Result<LogRecord, LogFormatError> {
    let f = Fields::new(LogFormat::RpcJson, log);
    Ok(LogRecord {
        address: f.address("address")?,
        topics: f.topics("topics")?,
        data: f.bytes("data")?,
        log_index: f.quantity("logIndex")?,
        transaction_hash: f.hash("transactionHash")?,
        transaction_index: f.quantity("transactionIndex")?,
        block_hash: f.hash("blockHash")?,
        block_number: f.quantity("blockNumber")?,
        removed: f.flag("removed")?,
    })
}

// ─── GraphQL webhook ──────────────────────────────────────────────────────────

/// Block-level fields of a GraphQL webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub hash: B256,
    pub number: u64,
    pub timestamp: Option<u64>,
}

impl BlockHeader {
    pub fn into_block(self, chain: Arc<Chain>) -> Block {
        let block = Block::new(self.hash, self.number, chain);
        match self.timestamp {
            Some(ts) => block.with_timestamp(ts),
            None => block,
        }
    }
}

/// Convert one GraphQL log. Block hash and number come from `block`.
pub fn from_graphql(log: &Value, block: &Value) -> Result<LogRecord, LogFormatError> {
    let f = Fields::new(LogFormat::Graphql, log);
    let header = graphql_header(block)?;
    let account = f.object("account")?;
    let tx = f.object("transaction")?;
    Ok(LogRecord {
        address: account.address("address")?,
        topics: f.topics("topics")?,
        data: f.bytes("data")?,
        log_index: f.quantity("index")?,
        transaction_hash: tx.hash("hash")?,
        transaction_index: tx.quantity("index")?,
        block_hash: header.hash,
        block_number: header.number,
        removed: false,
    })
}

/// Parse the block object of a GraphQL payload.
pub fn graphql_header(block: &Value) -> Result<BlockHeader, LogFormatError> {
    let f = Fields::new(LogFormat::Graphql, block);
    Ok(BlockHeader {
        hash: f.hash("hash")?,
        number: f.quantity("number")?,
        timestamp: f.optional_quantity("timestamp")?,
    })
}

/// Split a full webhook payload (`{"event": {"data": {"block": ...}}}`) into
/// the block header and its logs.
pub fn decode_graphql_payload(payload: &Value) -> Result<(BlockHeader, Vec<LogRecord>), LogFormatError> {
    let block = payload
        .pointer("/event/data/block")
        .ok_or_else(|| LogFormatError::MissingField {
            format: LogFormat::Graphql,
            field: "event.data.block".into(),
        })?;
    let header = graphql_header(block)?;
    let logs = Fields::new(LogFormat::Graphql, block)
        .array("logs")?
        .iter()
        .map(|log| from_graphql(log, block))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((header, logs))
}

// ─── Field access ─────────────────────────────────────────────────────────────

/// Typed accessors over a JSON object that report errors with the format.
struct Fields<'a> {
    format: LogFormat,
    obj: &'a Value,
}

impl<'a> Fields<'a> {
    fn new(format: LogFormat, obj: &'a Value) -> Self {
        Self { format, obj }
    }

    fn missing(&self, field: &str) -> LogFormatError {
        LogFormatError::MissingField {
            format: self.format,
            field: field.to_string(),
        }
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> LogFormatError {
        LogFormatError::InvalidField {
            format: self.format,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn get(&self, field: &str) -> Result<&'a Value, LogFormatError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Err(self.missing(field)),
            Some(v) => Ok(v),
        }
    }

    fn str(&self, field: &str) -> Result<&'a str, LogFormatError> {
        self.get(field)?
            .as_str()
            .ok_or_else(|| self.invalid(field, "expected a string"))
    }

    fn object(&self, field: &str) -> Result<Fields<'a>, LogFormatError> {
        let v = self.get(field)?;
        if v.is_object() {
            Ok(Fields::new(self.format, v))
        } else {
            Err(self.invalid(field, "expected an object"))
        }
    }

    fn array(&self, field: &str) -> Result<&'a Vec<Value>, LogFormatError> {
        self.get(field)?
            .as_array()
            .ok_or_else(|| self.invalid(field, "expected an array"))
    }

    fn address(&self, field: &str) -> Result<Address, LogFormatError> {
        self.str(field)?
            .parse::<Address>()
            .map_err(|e| self.invalid(field, e.to_string()))
    }

    fn hash(&self, field: &str) -> Result<B256, LogFormatError> {
        parse_b256(self.str(field)?).map_err(|reason| self.invalid(field, reason))
    }

    fn bytes(&self, field: &str) -> Result<Bytes, LogFormatError> {
        let s = self.str(field)?;
        let digits = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(digits)
            .map(Bytes::from)
            .map_err(|e| self.invalid(field, e.to_string()))
    }

    fn topics(&self, field: &str) -> Result<Vec<B256>, LogFormatError> {
        self.array(field)?
            .iter()
            .map(|t| {
                t.as_str()
                    .ok_or_else(|| "topic is not a string".to_string())
                    .and_then(parse_b256)
                    .map_err(|reason| self.invalid(field, reason))
            })
            .collect()
    }

    /// Integer given either as a JSON number or a `0x` hex quantity.
    fn quantity(&self, field: &str) -> Result<u64, LogFormatError> {
        match self.get(field)? {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| self.invalid(field, "not an unsigned integer")),
            Value::String(s) => parse_quantity(s).map_err(|reason| self.invalid(field, reason)),
            _ => Err(self.invalid(field, "expected a number or hex string")),
        }
    }

    fn optional_quantity(&self, field: &str) -> Result<Option<u64>, LogFormatError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.quantity(field).map(Some),
        }
    }

    fn flag(&self, field: &str) -> Result<bool, LogFormatError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.invalid(field, "expected a boolean")),
        }
    }
}

fn parse_b256(s: &str) -> Result<B256, String> {
    let digits = s.strip_prefix("0x").ok_or_else(|| format!("'{s}' has no 0x prefix"))?;
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
    B256::try_from(bytes.as_slice()).map_err(|_| format!("'{s}' is not 32 bytes"))
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u64, String> {
    let digits = s.strip_prefix("0x").ok_or_else(|| format!("'{s}' has no 0x prefix"))?;
    u64::from_str_radix(digits, 16).map_err(|e| format!("'{s}': {e}"))
}
