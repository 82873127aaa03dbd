//! Decoded argument values and address/hash parsing.
//!
//! Every ABI value that survives decoding is represented as an `ArgValue`.
//! The mapping from Solidity types is fixed:
//!
//! | ABI type          | `ArgValue`          |
//! |-------------------|---------------------|
//! | `bool`            | `Bool`              |
//! | `uintN` / `intN`  | `Uint` / `Int`      |
//! | `bytes32`         | `Hash`              |
//! | `bytesN`, `bytes` | `Bytes` (0x hex)    |
//! | `address`         | `Address`           |
//! | `string`          | `Str`               |
//! | `T[]`, `T[N]`     | `Array`             |
//! | `tuple`           | `Tuple`             |

use alloy_primitives::{Address, B256, I256, U256};
use serde::{ser::SerializeSeq, Serialize, Serializer};
use std::fmt;

use crate::args::DecodedArgs;

/// A decoded, normalized event argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Bool(bool),
    Uint(U256),
    Int(I256),
    /// 32-byte value (`bytes32` or the hash of an indexed reference type)
    Hash(B256),
    /// Any other byte array, as lowercase `0x`-prefixed hex text
    Bytes(String),
    Address(Address),
    Str(String),
    Array(Vec<ArgValue>),
    Tuple(DecodedArgs),
}

impl ArgValue {
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            ArgValue::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            ArgValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&DecodedArgs> {
        match self {
            ArgValue::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Bool(_) => "bool",
            ArgValue::Uint(_) => "uint",
            ArgValue::Int(_) => "int",
            ArgValue::Hash(_) => "bytes32",
            ArgValue::Bytes(_) => "bytes",
            ArgValue::Address(_) => "address",
            ArgValue::Str(_) => "string",
            ArgValue::Array(_) => "array",
            ArgValue::Tuple(_) => "tuple",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{v}"),
            ArgValue::Uint(v) => write!(f, "{v}"),
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Hash(h) => write!(f, "{}", hash_hex(h)),
            ArgValue::Bytes(b) => write!(f, "{b}"),
            ArgValue::Address(a) => write!(f, "{}", a.to_checksum(None)),
            ArgValue::Str(s) => write!(f, "{s}"),
            ArgValue::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ArgValue::Tuple(t) => {
                let parts: Vec<_> = t.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Serializes into the plain JSON shape templates expect: integers that fit
/// 64 bits become JSON numbers, larger ones decimal strings; addresses are
/// checksummed; tuples become objects.
impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArgValue::Bool(v) => serializer.serialize_bool(*v),
            ArgValue::Uint(v) => match u64::try_from(*v) {
                Ok(small) => serializer.serialize_u64(small),
                Err(_) => serializer.serialize_str(&v.to_string()),
            },
            ArgValue::Int(v) => match i64::try_from(*v) {
                Ok(small) => serializer.serialize_i64(small),
                Err(_) => serializer.serialize_str(&v.to_string()),
            },
            ArgValue::Hash(h) => serializer.serialize_str(&hash_hex(h)),
            ArgValue::Bytes(b) => serializer.serialize_str(b),
            ArgValue::Address(a) => serializer.serialize_str(&a.to_checksum(None)),
            ArgValue::Str(s) => serializer.serialize_str(s),
            ArgValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ArgValue::Tuple(t) => t.serialize(serializer),
        }
    }
}

/// Lowercase `0x`-prefixed hex of a 32-byte value.
pub fn hash_hex(h: &B256) -> String {
    format!("0x{}", hex::encode(h.as_slice()))
}

/// Error returned when a string is not an acceptable address or hash literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {what}")]
pub struct ParseLiteralError {
    pub value: String,
    pub what: &'static str,
}

/// Parse an address literal.
///
/// All-lowercase input is accepted as-is; mixed-case input must carry a
/// valid EIP-55 checksum.
pub fn parse_address(value: &str) -> Result<Address, ParseLiteralError> {
    let err = || ParseLiteralError {
        value: value.to_string(),
        what: "address",
    };
    if value.len() != 42 || !value.starts_with("0x") {
        return Err(err());
    }
    if value == value.to_lowercase() {
        value.parse::<Address>().map_err(|_| err())
    } else {
        Address::parse_checksummed(value, None).map_err(|_| err())
    }
}

/// Parse a 32-byte hash literal (`0x` + 64 hex chars, any case).
pub fn parse_hash(value: &str) -> Result<B256, ParseLiteralError> {
    let err = || ParseLiteralError {
        value: value.to_string(),
        what: "hash",
    };
    if value.len() != 66 || !value.starts_with("0x") {
        return Err(err());
    }
    value.parse::<B256>().map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_address_is_checksummed() {
        let a = parse_address("0x9aa7fec87ca69695dd1f879567ccf49f3ba417e2").unwrap();
        assert_eq!(
            a.to_checksum(None),
            "0x9aa7fEc87CA69695Dd1f879567CcF49F3ba417E2"
        );
    }

    #[test]
    fn bad_checksum_rejected() {
        assert!(parse_address("0x9AA7fEc87CA69695Dd1f879567CcF49F3ba417E2").is_err());
        assert!(parse_address("0x9aa7fEc87CA69695Dd1f879567CcF49F3ba417E2").is_ok());
        assert!(parse_address("USDC").is_err());
    }

    #[test]
    fn hash_is_lowercased() {
        let h = parse_hash("0x81145F3E891AB54554D964F901F122635BA4B00E22066157C6CABB647F959506")
            .unwrap();
        assert_eq!(
            hash_hex(&h),
            "0x81145f3e891ab54554d964f901f122635ba4b00e22066157c6cabb647f959506"
        );
        assert!(parse_hash("0x1234").is_err());
    }

    #[test]
    fn big_uint_serializes_as_string() {
        let small = serde_json::to_value(ArgValue::Uint(U256::from(10_000_000_000u64))).unwrap();
        assert_eq!(small, serde_json::json!(10_000_000_000u64));
        let big = serde_json::to_value(ArgValue::Uint(U256::MAX)).unwrap();
        assert_eq!(big, serde_json::json!(U256::MAX.to_string()));
    }
}
