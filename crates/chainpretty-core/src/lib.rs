//! # chainpretty-core
//!
//! Value types shared across all ChainPretty crates: ABI shapes, decoded
//! arguments, canonical log records, chain/block/tx/event objects, the
//! address book interface and the error enums every stage reports with.

pub mod address_book;
pub mod args;
pub mod chain;
pub mod error;
pub mod event;
pub mod log;
pub mod shape;
pub mod types;

pub use address_book::{AddressBook, InMemoryAddressBook};
pub use args::{safe_field_name, DecodedArgs};
pub use chain::{Block, Chain, Tx};
pub use error::{
    ConfigError, DecodeError, FilterConfigError, LogFormatError, RegistryError, RenderError,
    ShapeError,
};
pub use event::{DecodedTxLogs, Event, EventData};
pub use log::{LogFormat, LogRecord};
pub use shape::{AbiItem, AbiParam, ArgumentShape, Component, EventShape, SolType};
pub use types::{hash_hex, parse_address, parse_hash, ArgValue, ParseLiteralError};
