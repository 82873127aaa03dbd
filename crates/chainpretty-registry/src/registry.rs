//! In-memory, topic-indexed `EventRegistry`.
//!
//! Thread-safe via `parking_lot::RwLock`. A lazily created process-wide
//! instance is available through [`EventRegistry::global`]; independent
//! instances can be built freely with [`EventRegistry::new`].

use alloy_primitives::B256;
use chainpretty_core::{error::RegistryError, AbiItem, EventShape, ShapeError};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use crate::fingerprint::event_topic;

/// All event shapes sharing one topic hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    pub topic: B256,
    /// Name of the first registered shape
    pub name: String,
    /// Collision set, in registration order
    pub shapes: Vec<EventShape>,
}

impl EventDefinition {
    fn new(topic: B256, shape: EventShape) -> Self {
        Self {
            topic,
            name: shape.name.clone(),
            shapes: vec![shape],
        }
    }

    /// Append `shape` unless a structurally equal one is already present.
    /// Returns `true` if the set grew.
    fn merge(&mut self, shape: EventShape) -> bool {
        if self.shapes.contains(&shape) {
            false
        } else {
            self.shapes.push(shape);
            true
        }
    }
}

static GLOBAL: Lazy<EventRegistry> = Lazy::new(EventRegistry::new);

/// Thread-safe registry of event definitions keyed by topic.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<RwLock<HashMap<B256, Arc<EventDefinition>>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static EventRegistry {
        &GLOBAL
    }

    /// Register every event declaration in `items`.
    ///
    /// All declarations are validated before anything is inserted, so a
    /// malformed entry leaves the registry untouched. Returns the number of
    /// event declarations processed (including ones that were already known).
    pub fn load(&self, items: &[AbiItem]) -> Result<usize, RegistryError> {
        let mut shapes = Vec::new();
        for item in items {
            match EventShape::from_abi_item(item)? {
                Some(shape) => shapes.push(shape),
                None if item.anonymous => {
                    debug!(event = item.name.as_deref().unwrap_or(""), "anonymous event skipped");
                }
                None => {}
            }
        }
        let count = shapes.len();

        let mut inner = self.inner.write();
        for shape in shapes {
            let topic = event_topic(&shape);
            match inner.get_mut(&topic) {
                Some(def) => {
                    if Arc::make_mut(def).merge(shape) {
                        debug!(topic = %topic, shapes = def.shapes.len(), "collision set grew");
                    }
                }
                None => {
                    inner.insert(topic, Arc::new(EventDefinition::new(topic, shape)));
                }
            }
        }
        Ok(count)
    }

    /// Register the declarations of a JSON ABI array.
    pub fn load_json(&self, abi: &serde_json::Value) -> Result<usize, RegistryError> {
        let items: Vec<AbiItem> =
            serde_json::from_value(abi.clone()).map_err(|e| ShapeError::Malformed {
                reason: e.to_string(),
            })?;
        self.load(&items)
    }

    pub fn lookup(&self, topic: &B256) -> Option<Arc<EventDefinition>> {
        self.inner.read().get(topic).cloned()
    }

    /// Remove every definition.
    pub fn reset(&self) {
        self.inner.write().clear();
    }

    /// Number of distinct topics.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event names, sorted and deduplicated.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut names: Vec<String> = inner
            .values()
            .flat_map(|d| d.shapes.iter().map(|s| s.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpretty_core::hash_hex;
    use serde_json::json;

    fn erc20_transfer() -> serde_json::Value {
        json!([{
            "type": "event", "name": "Transfer", "anonymous": false,
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]
        }, {
            "type": "function", "name": "transfer", "inputs": [], "outputs": []
        }])
    }

    fn erc721_transfer() -> serde_json::Value {
        json!([{
            "type": "event", "name": "Transfer", "anonymous": false,
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "tokenId", "type": "uint256", "indexed": true}
            ]
        }])
    }

    #[test]
    fn load_and_lookup() {
        let reg = EventRegistry::new();
        assert_eq!(reg.load_json(&erc20_transfer()).unwrap(), 1);
        let topic: B256 = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
            .parse()
            .unwrap();
        let def = reg.lookup(&topic).unwrap();
        assert_eq!(def.name, "Transfer");
        assert_eq!(hash_hex(&def.topic), hash_hex(&topic));
        assert!(reg.lookup(&B256::ZERO).is_none());
    }

    #[test]
    fn merge_is_idempotent() {
        let reg = EventRegistry::new();
        reg.load_json(&erc20_transfer()).unwrap();
        let before = reg.lookup(&event_topic_of(&reg)).unwrap();
        assert_eq!(reg.load_json(&erc20_transfer()).unwrap(), 1);
        let after = reg.lookup(&event_topic_of(&reg)).unwrap();
        assert_eq!(before, after);
        assert_eq!(after.shapes.len(), 1);
    }

    #[test]
    fn collisions_accumulate() {
        let reg = EventRegistry::new();
        reg.load_json(&erc20_transfer()).unwrap();
        reg.load_json(&erc721_transfer()).unwrap();
        reg.load_json(&erc721_transfer()).unwrap();
        assert_eq!(reg.len(), 1);
        let def = reg.lookup(&event_topic_of(&reg)).unwrap();
        assert_eq!(def.shapes.len(), 2);
        assert_eq!(def.shapes[0].indexed_count(), 2);
        assert_eq!(def.shapes[1].indexed_count(), 3);
    }

    #[test]
    fn malformed_load_is_atomic() {
        let reg = EventRegistry::new();
        let bad = json!([
            {"type": "event", "name": "Good", "inputs": []},
            {"type": "event", "name": "Bad", "inputs": [{"name": "x", "type": "fixed"}]}
        ]);
        assert!(reg.load_json(&bad).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn anonymous_events_are_not_indexed() {
        let reg = EventRegistry::new();
        let abi = json!([{"type": "event", "name": "Raw", "anonymous": true, "inputs": [
            {"name": "x", "type": "uint256", "indexed": true}
        ]}]);
        assert_eq!(reg.load_json(&abi).unwrap(), 0);
        assert!(reg.is_empty());
    }

    #[test]
    fn reset_clears() {
        let reg = EventRegistry::new();
        reg.load_json(&erc20_transfer()).unwrap();
        reg.reset();
        assert!(reg.is_empty());
        assert!(reg.names().is_empty());
    }

    fn event_topic_of(reg: &EventRegistry) -> B256 {
        *reg.inner.read().keys().next().unwrap()
    }
}
