//! # chainpretty-evm
//!
//! EVM event decoding for ChainPretty.
//!
//! ## Implementation notes
//! - Uses `alloy-core` dyn-abi for ABI decode
//! - `topics[0]` → registry lookup (keccak256 of the canonical signature)
//! - `topics[1..]` → indexed parameters (each 32 bytes, ABI-encoded or hashed)
//! - `data` → non-indexed parameters (ABI-encoded parameter sequence)
//! - three raw log formats are normalized into `LogRecord` first

pub mod batch;
pub mod decoder;
pub mod logs;
pub mod normalizer;

pub use decoder::{decode_with_shape, to_dyn, EventDecoder};
pub use logs::{
    decode_graphql_payload, from_graphql, from_rpc_call, from_rpc_json, graphql_header,
    BlockHeader, RpcCallLog,
};
