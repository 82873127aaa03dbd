//! Rendering environment: the chain being rendered, the known chains, the
//! address book and the bytes32 rainbow table.

use alloy_primitives::B256;
use chainpretty_core::{parse_hash, AddressBook, Chain, ConfigError, InMemoryAddressBook};
use chainpretty_registry::keccak256_signature;
use serde_json::Value;
use std::{collections::HashMap, path::Path, sync::Arc};

// ─── Chain id ─────────────────────────────────────────────────────────────────

/// Reconcile the chain id given on the command line with the one reported by
/// the node. Either alone is used as-is; both must agree.
pub fn resolve_chain_id(explicit: Option<u64>, node: Option<u64>) -> Result<u64, ConfigError> {
    match (explicit, node) {
        (Some(explicit), Some(node)) if explicit != node => {
            Err(ConfigError::ChainIdMismatch { explicit, node })
        }
        (Some(id), _) | (None, Some(id)) => Ok(id),
        (None, None) => Err(ConfigError::MissingChainId),
    }
}

// ─── Chains ───────────────────────────────────────────────────────────────────

/// Chains by id, read from a <https://chainid.network/chains.json> style list.
#[derive(Debug, Clone, Default)]
pub struct ChainDirectory {
    chains: HashMap<u64, Arc<Chain>>,
}

impl ChainDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let entries = value
            .as_array()
            .ok_or_else(|| ConfigError::Chains("expected a JSON list".into()))?;
        let mut dir = Self::new();
        for entry in entries {
            let id = entry
                .get("chainId")
                .and_then(Value::as_u64)
                .ok_or_else(|| ConfigError::Chains(format!("entry without 'chainId': {entry}")))?;
            let chain = match entry.get("name").and_then(Value::as_str) {
                Some(name) => Chain::new(id, name),
                None => Chain::unnamed(id),
            };
            dir.insert(chain.with_metadata(entry.clone()));
        }
        Ok(dir)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&read_json(path)?)
    }

    pub fn insert(&mut self, chain: Chain) {
        self.chains.insert(chain.id, Arc::new(chain));
    }

    pub fn get(&self, id: u64) -> Option<&Arc<Chain>> {
        self.chains.get(&id)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

// ─── Rainbow table ────────────────────────────────────────────────────────────

/// Known preimages of bytes32 values (role names and the like).
#[derive(Debug, Clone, Default)]
pub struct Rainbow {
    names: HashMap<B256, String>,
}

impl Rainbow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an object `hash → name`, an object `name → hash`, or a list of
    /// names that are hashed with keccak256.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let mut rainbow = Self::new();
        match value {
            Value::Array(names) => {
                for name in names {
                    let name = name
                        .as_str()
                        .ok_or_else(|| ConfigError::Rainbow(format!("{name} is not a string")))?;
                    rainbow.insert_name(name);
                }
            }
            Value::Object(obj) => {
                let keys_are_hashes = obj.keys().next().map_or(true, |k| parse_hash(k).is_ok());
                for (k, v) in obj {
                    let v = v
                        .as_str()
                        .ok_or_else(|| ConfigError::Rainbow(format!("value for '{k}' is not a string")))?;
                    let (hash, name) = if keys_are_hashes { (k.as_str(), v) } else { (v, k.as_str()) };
                    let hash = parse_hash(hash).map_err(|e| ConfigError::Rainbow(e.to_string()))?;
                    rainbow.insert(hash, name);
                }
            }
            _ => return Err(ConfigError::Rainbow("expected a JSON object or list".into())),
        }
        Ok(rainbow)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&read_json(path)?)
    }

    pub fn insert(&mut self, hash: B256, name: impl Into<String>) {
        self.names.insert(hash, name.into());
    }

    pub fn insert_name(&mut self, name: &str) {
        self.insert(keccak256_signature(name), name);
    }

    pub fn get(&self, hash: &B256) -> Option<&str> {
        self.names.get(hash).map(String::as_str)
    }
}

// ─── Globals ──────────────────────────────────────────────────────────────────

/// Everything the template filters look up.
#[derive(Clone)]
pub struct EnvGlobals {
    pub chain_id: u64,
    pub chains: ChainDirectory,
    pub address_book: Arc<dyn AddressBook>,
    pub rainbow: Rainbow,
}

impl EnvGlobals {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            chains: ChainDirectory::new(),
            address_book: Arc::new(InMemoryAddressBook::new()),
            rainbow: Rainbow::new(),
        }
    }

    pub fn with_chains(mut self, chains: ChainDirectory) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_address_book(mut self, book: Arc<dyn AddressBook>) -> Self {
        self.address_book = book;
        self
    }

    pub fn with_rainbow(mut self, rainbow: Rainbow) -> Self {
        self.rainbow = rainbow;
        self
    }

    /// The chain being rendered, named from the chains file when known.
    pub fn chain(&self) -> Arc<Chain> {
        self.chains
            .get(self.chain_id)
            .cloned()
            .unwrap_or_else(|| Arc::new(Chain::unnamed(self.chain_id)))
    }

    /// Explorer base URL for the current chain. An empty string when the
    /// chain lists no explorers; an error when the chain is unknown.
    pub fn explorer_url(&self) -> Result<&str, ConfigError> {
        let chain = self
            .chains
            .get(self.chain_id)
            .ok_or(ConfigError::UnknownChain(self.chain_id))?;
        Ok(chain.explorer_url().unwrap_or(""))
    }
}

impl std::fmt::Debug for EnvGlobals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvGlobals")
            .field("chain_id", &self.chain_id)
            .field("chains", &self.chains.len())
            .finish_non_exhaustive()
    }
}

fn read_json(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}
