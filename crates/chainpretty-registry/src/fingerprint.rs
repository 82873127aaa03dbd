//! Event topic computation.
//!
//! The topic of an EVM event is the keccak256 hash of its canonical
//! signature string, e.g.:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use alloy_primitives::B256;
use chainpretty_core::EventShape;
use tiny_keccak::{Hasher, Keccak};

/// keccak256 of an arbitrary signature string.
pub fn keccak256_signature(signature: &str) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Topic hash of an event shape. The indexed flags do not take part.
pub fn event_topic(shape: &EventShape) -> B256 {
    keccak256_signature(&shape.signature())
}
