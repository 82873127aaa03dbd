//! Address book: human names for well-known addresses.

use alloy_primitives::Address;
use std::collections::HashMap;

use crate::error::ConfigError;
use crate::types::parse_address;

/// Lookup of names by address and addresses by name.
pub trait AddressBook: Send + Sync {
    fn addr_to_name(&self, addr: &Address) -> Option<String>;

    fn name_to_addr(&self, name: &str) -> Option<Address>;

    fn has_addr(&self, addr: &Address) -> bool {
        self.addr_to_name(addr).is_some()
    }
}

/// `AddressBook` backed by two hash maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAddressBook {
    by_addr: HashMap<Address, String>,
    by_name: HashMap<String, Address>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, addr: Address, name: impl Into<String>) {
        let name = name.into();
        self.by_name.insert(name.clone(), addr);
        self.by_addr.insert(addr, name);
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }

    /// Build from a JSON object mapping either address → name or
    /// name → address. The orientation is detected from the first key.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ConfigError::AddressBook("expected a JSON object".into()))?;
        let keys_are_addresses = obj
            .keys()
            .next()
            .map(|k| parse_address(k).is_ok())
            .unwrap_or(true);

        let mut book = Self::new();
        for (k, v) in obj {
            let v = v.as_str().ok_or_else(|| {
                ConfigError::AddressBook(format!("value for '{k}' is not a string"))
            })?;
            let (addr, name) = if keys_are_addresses { (k.as_str(), v) } else { (v, k.as_str()) };
            let addr = parse_address(addr).map_err(|e| ConfigError::AddressBook(e.to_string()))?;
            book.insert(addr, name);
        }
        Ok(book)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&value)
    }
}

impl AddressBook for InMemoryAddressBook {
    fn addr_to_name(&self, addr: &Address) -> Option<String> {
        self.by_addr.get(addr).cloned()
    }

    fn name_to_addr(&self, name: &str) -> Option<Address> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USDC: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";

    #[test]
    fn both_orientations() {
        let a = InMemoryAddressBook::from_json(&json!({ USDC: "USDC" })).unwrap();
        let b = InMemoryAddressBook::from_json(&json!({ "USDC": USDC })).unwrap();
        let addr = parse_address(USDC).unwrap();
        for book in [a, b] {
            assert_eq!(book.addr_to_name(&addr).as_deref(), Some("USDC"));
            assert_eq!(book.name_to_addr("USDC"), Some(addr));
            assert!(book.has_addr(&addr));
            assert!(!book.has_addr(&Address::ZERO));
        }
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(InMemoryAddressBook::from_json(&json!(["x"])).is_err());
        assert!(InMemoryAddressBook::from_json(&json!({ "USDC": "nope" })).is_err());
    }
}
