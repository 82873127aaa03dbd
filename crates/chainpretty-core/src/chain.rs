//! Chain, block and transaction value objects.
//!
//! Ownership runs one way: an `Event` holds an `Arc<Tx>`, a `Tx` holds an
//! `Arc<Block>`, a `Block` holds an `Arc<Chain>`.

use alloy_primitives::B256;
use serde::{Serialize, Serializer};
use std::sync::Arc;

use crate::types::hash_hex;

/// Chain identity plus optional metadata (an entry of a chainid.network
/// style chains file).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chain {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Chain {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            metadata: None,
        }
    }

    /// Chain with the placeholder name used when nothing better is known.
    pub fn unnamed(id: u64) -> Self {
        Self::new(id, format!("chain-{id}"))
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Base URL of the first block explorer listed in the metadata.
    pub fn explorer_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get("explorers")?
            .as_array()?
            .first()?
            .get("url")?
            .as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    #[serde(serialize_with = "serialize_hash")]
    pub hash: B256,
    pub number: u64,
    /// Unix seconds
    pub timestamp: Option<u64>,
    pub chain: Arc<Chain>,
}

impl Block {
    pub fn new(hash: B256, number: u64, chain: Arc<Chain>) -> Self {
        Self {
            hash,
            number,
            timestamp: None,
            chain,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tx {
    #[serde(serialize_with = "serialize_hash")]
    pub hash: B256,
    pub index: u64,
    pub block: Arc<Block>,
}

impl Tx {
    pub fn new(hash: B256, index: u64, block: Arc<Block>) -> Self {
        Self { hash, index, block }
    }
}

pub(crate) fn serialize_hash<S: Serializer>(h: &B256, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hash_hex(h))
}
