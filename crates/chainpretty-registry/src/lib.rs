//! # chainpretty-registry
//!
//! Registry of event definitions for ChainPretty.
//!
//! Every event declaration found in a JSON ABI is indexed by its topic hash
//! (keccak256 of the canonical signature). Declarations that hash to the same
//! topic but differ in layout, such as the ERC-20 and ERC-721 `Transfer`
//! events, are kept together as a collision set and tried in order by the
//! decoder.

pub mod fingerprint;
pub mod loader;
pub mod registry;

pub use fingerprint::{event_topic, keccak256_signature};
pub use registry::{EventDefinition, EventRegistry};
