//! Tera filters available to every template.
//!
//! | filter | input | output |
//! |---|---|---|
//! | `amount(decimals="auto")` | integer | decimal text, `infinite` for max uint256 |
//! | `loss_prob` | integer | `amount(decimals=18)` |
//! | `address` | address | address-book name or the address |
//! | `address_link` | address | markdown link to the explorer |
//! | `tx_link` / `block_link` | hash / number | markdown link to the explorer |
//! | `unhash` | bytes32 | rainbow-table name as a link, or the hash |
//! | `role` | bytes32 | like `unhash`, zero is `DEFAULT_ADMIN_ROLE` |
//! | `timestamp` | unix seconds | RFC 3339 UTC |

use alloy_primitives::{Address, B256, U256};
use chainpretty_core::parse_address;
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tera::{Filter, Tera, Value};

use crate::env::EnvGlobals;

const KECCAK_TOOL: &str = "https://emn178.github.io/online-tools/keccak_256.html";

/// Register every filter on `tera`.
pub fn add_filters(tera: &mut Tera, globals: &Arc<EnvGlobals>) {
    tera.register_filter("amount", Amount { fixed: None });
    tera.register_filter("loss_prob", Amount { fixed: Some(18) });
    tera.register_filter("timestamp", Timestamp);
    tera.register_filter("address", AddressName(Arc::clone(globals)));
    tera.register_filter("address_link", ExplorerLink::address(globals));
    tera.register_filter("tx_link", ExplorerLink::tx(globals));
    tera.register_filter("block_link", ExplorerLink::block(globals));
    tera.register_filter("unhash", Unhash { globals: Arc::clone(globals), role: false });
    tera.register_filter("role", Unhash { globals: Arc::clone(globals), role: true });
}

// ─── Numbers ──────────────────────────────────────────────────────────────────

/// Integer argument values arrive as JSON numbers when they fit 64 bits and
/// as decimal strings otherwise.
fn integer(value: &Value) -> tera::Result<(bool, U256)> {
    let parsed = match value {
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => Some((false, U256::from(u))),
            (None, Some(i)) => Some((i < 0, U256::from(i.unsigned_abs()))),
            _ => None,
        },
        Value::String(s) => {
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.as_str()),
            };
            let parsed = match digits.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16),
                None => U256::from_str_radix(digits, 10),
            };
            parsed.ok().map(|m| (negative, m))
        }
        _ => None,
    };
    parsed.ok_or_else(|| tera::Error::msg(format!("expected an integer, got {value}")))
}

/// `magnitude / 10^decimals` as plain decimal text without trailing zeros.
pub fn format_units(negative: bool, magnitude: U256, decimals: u32) -> String {
    let digits = magnitude.to_string();
    let decimals = decimals as usize;
    let (int_part, frac_part) = if digits.len() > decimals {
        let (i, f) = digits.split_at(digits.len() - decimals);
        (i.to_string(), f.to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };
    let frac_part = frac_part.trim_end_matches('0');
    let sign = if negative && !magnitude.is_zero() { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{frac_part}")
    }
}

struct Amount {
    fixed: Option<u32>,
}

impl Filter for Amount {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let (negative, magnitude) = integer(value)?;
        if !negative && magnitude == U256::MAX {
            return Ok(Value::from("infinite"));
        }
        let decimals = match (self.fixed, args.get("decimals")) {
            (Some(d), _) => d,
            (None, None) => auto_decimals(magnitude),
            (None, Some(Value::String(s))) if s == "auto" => auto_decimals(magnitude),
            (None, Some(Value::Number(n))) => n
                .as_u64()
                .and_then(|d| u32::try_from(d).ok())
                .ok_or_else(|| tera::Error::msg(format!("invalid decimals {n}")))?,
            (None, Some(Value::String(s))) => s
                .parse()
                .map_err(|_| tera::Error::msg(format!("invalid decimals '{s}'")))?,
            (None, Some(other)) => return Err(tera::Error::msg(format!("invalid decimals {other}"))),
        };
        Ok(Value::from(format_units(negative, magnitude, decimals)))
    }
}

/// Small values are taken as 6-decimal stablecoin amounts, everything else as
/// 18-decimal token amounts.
fn auto_decimals(magnitude: U256) -> u32 {
    if magnitude < U256::from(14u64).pow(U256::from(10u64)) {
        6
    } else {
        18
    }
}

struct Timestamp;

impl Filter for Timestamp {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let (negative, secs) = integer(value)?;
        let secs = i64::try_from(secs)
            .ok()
            .map(|s| if negative { -s } else { s })
            .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
            .ok_or_else(|| tera::Error::msg(format!("timestamp {value} out of range")))?;
        Ok(Value::from(secs.format("%Y-%m-%dT%H:%M:%SZ").to_string()))
    }
}

// ─── Addresses and links ──────────────────────────────────────────────────────

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn address_name(globals: &EnvGlobals, value: &str) -> Option<String> {
    let addr: Address = parse_address(value).ok()?;
    globals.address_book.addr_to_name(&addr)
}

struct AddressName(Arc<EnvGlobals>);

impl Filter for AddressName {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let value = text(value);
        Ok(Value::from(address_name(&self.0, &value).unwrap_or(value)))
    }
}

#[derive(Clone, Copy)]
enum LinkKind {
    Address,
    Tx,
    Block,
}

struct ExplorerLink {
    globals: Arc<EnvGlobals>,
    kind: LinkKind,
}

impl ExplorerLink {
    fn address(globals: &Arc<EnvGlobals>) -> Self {
        Self { globals: Arc::clone(globals), kind: LinkKind::Address }
    }

    fn tx(globals: &Arc<EnvGlobals>) -> Self {
        Self { globals: Arc::clone(globals), kind: LinkKind::Tx }
    }

    fn block(globals: &Arc<EnvGlobals>) -> Self {
        Self { globals: Arc::clone(globals), kind: LinkKind::Block }
    }
}

impl Filter for ExplorerLink {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let value = text(value);
        if let LinkKind::Address = self.kind {
            if parse_address(&value).map_or(false, |a| a == Address::ZERO) {
                return Ok(Value::from(format!("[{value}]")));
            }
        }
        let url = self
            .globals
            .explorer_url()
            .map_err(|e| tera::Error::msg(e.to_string()))?;
        let link = match self.kind {
            LinkKind::Address => {
                let label = address_name(&self.globals, &value).unwrap_or_else(|| value.clone());
                format!("[{label}]({url}/address/{value})")
            }
            LinkKind::Tx => format!("[{value}]({url}/tx/{value})"),
            LinkKind::Block => format!("[{value}]({url}/block/{value})"),
        };
        Ok(Value::from(link))
    }
}

// ─── Hashes ───────────────────────────────────────────────────────────────────

struct Unhash {
    globals: Arc<EnvGlobals>,
    role: bool,
}

impl Filter for Unhash {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let value = text(value);
        let Ok(hash) = value.parse::<B256>() else {
            return Ok(Value::from(value));
        };
        if self.role && hash == B256::ZERO {
            return Ok(Value::from("DEFAULT_ADMIN_ROLE"));
        }
        Ok(Value::from(match self.globals.rainbow.get(&hash) {
            Some(name) => format!(
                "[{name}]({KECCAK_TOOL}?input={name}&input_type=utf-8&output_type=hex)"
            ),
            None => value,
        }))
    }
}
