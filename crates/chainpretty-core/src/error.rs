//! Error types for the ChainPretty decode pipeline.

use thiserror::Error;

use crate::log::LogFormat;

/// Errors raised while building an argument shape from an ABI declaration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Unsupported ABI type '{ty}' for argument '{name}'")]
    UnsupportedType { name: String, ty: String },

    #[error("Tuple argument '{name}' has no components")]
    MissingComponents { name: String },

    #[error("Malformed ABI declaration: {reason}")]
    Malformed { reason: String },
}

/// Errors that can occur while converting a raw log into a `LogRecord`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogFormatError {
    #[error("{format} log is missing required field '{field}'")]
    MissingField { format: LogFormat, field: String },

    #[error("{format} log has invalid field '{field}': {reason}")]
    InvalidField {
        format: LogFormat,
        field: String,
        reason: String,
    },
}

/// Errors that can occur while decoding a single log.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The number of indexed arguments in the shape does not match the
    /// number of topics after the signature topic. Decoders move on to the
    /// next candidate shape when they see this.
    #[error("Event '{event}' expects {expected} indexed topics, log has {got}")]
    TopicCountMismatch {
        event: String,
        expected: usize,
        got: usize,
    },

    #[error("ABI decode failed for '{event}': {reason}")]
    AbiDecodeFailed { event: String, reason: String },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Transaction mismatch: log belongs to {log_tx}, supplied transaction is {supplied_tx}")]
    TxMismatch { log_tx: String, supplied_tx: String },

    #[error("Invalid log: {0}")]
    Format(#[from] LogFormatError),
}

impl DecodeError {
    /// Returns `true` for the recoverable topic-count mismatch.
    pub fn is_topic_mismatch(&self) -> bool {
        matches!(self, Self::TopicCountMismatch { .. })
    }
}

/// Errors from the event registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid event declaration: {0}")]
    Shape(#[from] ShapeError),

    #[error("ABI file {path} is not an artifact with an 'abi' array nor a bare ABI array")]
    NotAnAbi { path: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while building filters and template rules from configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterConfigError {
    #[error("Unknown filter type '{0}'")]
    UnknownTag(String),

    #[error("Filter type '{0}' is already registered")]
    DuplicateTag(String),

    #[error("Can't build a filter from {0}")]
    UnknownShape(String),

    #[error("Filter '{tag}' requires parameter '{param}'")]
    MissingParam { tag: String, param: String },

    #[error("Filter '{tag}' has invalid parameter '{param}': {reason}")]
    InvalidParam {
        tag: String,
        param: String,
        reason: String,
    },

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),

    #[error("Operator '{operator}' needs a numeric value, got '{value}'")]
    NonNumericOrdering { operator: String, value: String },

    #[error("'{0}' is neither an address nor a name in the address book")]
    UnknownAddress(String),

    #[error("Invalid rules document: {0}")]
    Document(String),
}

/// Errors from the rendering glue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Failed to render '{template}': {reason}")]
    Render { template: String, reason: String },

    #[error("Failed to load templates: {0}")]
    Load(String),
}

/// Errors in environment configuration (chain resolution, address book,
/// auxiliary lookup files).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Either --chain-id or --rpc-url must be specified")]
    MissingChainId,

    #[error("The chain id specified ({explicit}) differs with the id of the RPC connection ({node})")]
    ChainIdMismatch { explicit: u64, node: u64 },

    #[error("Chain id {0} not found in the chains file")]
    UnknownChain(u64),

    #[error("Invalid address book: {0}")]
    AddressBook(String),

    #[error("Invalid chains file: {0}")]
    Chains(String),

    #[error("Invalid bytes32 rainbow table: {0}")]
    Rainbow(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
