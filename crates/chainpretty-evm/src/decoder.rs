//! `EventDecoder`: turns canonical log records into decoded events.
//!
//! ## Algorithm
//! 1. No topics → not an event (`None`).
//! 2. Look up `topics[0]` in the registry; unknown → `None`.
//! 3. Try each shape of the collision set in registration order:
//!    indexed components come from `topics[1..]`, the rest from `data`.
//!    A topic-count mismatch moves on to the next shape; any other error
//!    propagates. The first shape that decodes wins.
//! 4. If every shape mismatched, the last mismatch is returned.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::B256;
use chainpretty_core::{
    ArgValue, Block, DecodeError, DecodedArgs, Event, EventData, EventShape, LogRecord, SolType,
    Tx,
};
use chainpretty_registry::EventRegistry;
use std::sync::Arc;

use crate::normalizer;

/// Decoder bound to one registry.
#[derive(Clone)]
pub struct EventDecoder {
    registry: EventRegistry,
}

impl EventDecoder {
    pub fn new(registry: EventRegistry) -> Self {
        Self { registry }
    }

    /// Decoder over the process-wide registry.
    pub fn global() -> Self {
        Self::new(EventRegistry::global().clone())
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Decode a log into its name, address and arguments.
    pub fn decode(&self, log: &LogRecord) -> Result<Option<EventData>, DecodeError> {
        let Some(topic) = log.signature_topic() else {
            return Ok(None);
        };
        let Some(definition) = self.registry.lookup(topic) else {
            return Ok(None);
        };

        let mut last_mismatch = None;
        for shape in &definition.shapes {
            match decode_with_shape(shape, log) {
                Ok(args) => {
                    return Ok(Some(EventData {
                        name: shape.name.clone(),
                        address: log.address,
                        args,
                        log_index: log.log_index,
                    }))
                }
                Err(e) if e.is_topic_mismatch() => last_mismatch = Some(e),
                Err(e) => return Err(e),
            }
        }
        match last_mismatch {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Decode a log and attach it to its transaction.
    ///
    /// When `tx` is given its hash must match the log's transaction hash.
    pub fn decode_event(
        &self,
        log: &LogRecord,
        block: &Arc<Block>,
        tx: Option<&Arc<Tx>>,
    ) -> Result<Option<Event>, DecodeError> {
        match self.decode(log)? {
            Some(data) => Event::from_event_data(data, log, block, tx).map(Some),
            None => Ok(None),
        }
    }
}

/// Decode `log` under one specific shape.
pub fn decode_with_shape(shape: &EventShape, log: &LogRecord) -> Result<DecodedArgs, DecodeError> {
    let expected = shape.indexed_count();
    let got = log.topics.len().saturating_sub(1);
    if expected != got {
        return Err(DecodeError::TopicCountMismatch {
            event: shape.name.clone(),
            expected,
            got,
        });
    }

    let data_types: Vec<DynSolType> = shape.inputs.non_indexed().map(|c| to_dyn(&c.ty)).collect();
    let mut data_values = if data_types.is_empty() {
        Vec::new().into_iter()
    } else {
        match DynSolType::Tuple(data_types).abi_decode_sequence(&log.data) {
            Ok(DynSolValue::Tuple(vals)) => vals.into_iter(),
            Ok(other) => vec![other].into_iter(),
            Err(e) => {
                return Err(DecodeError::AbiDecodeFailed {
                    event: shape.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    };
    let mut topics = log.topics[1..].iter();

    let mut args = DecodedArgs::with_capacity(shape.inputs.len());
    for component in &shape.inputs.components {
        let value = if component.indexed {
            let topic = topics.next().ok_or_else(|| DecodeError::TopicCountMismatch {
                event: shape.name.clone(),
                expected,
                got,
            })?;
            decode_topic(&shape.name, topic, &component.ty)?
        } else {
            let raw = data_values.next().ok_or_else(|| DecodeError::AbiDecodeFailed {
                event: shape.name.clone(),
                reason: format!("no data value for '{}'", component.name),
            })?;
            normalizer::normalize(raw, &component.ty)?
        };
        args.push(&component.name, value);
    }
    Ok(args)
}

/// Decode a single indexed topic.
///
/// Value types are stored padded to 32 bytes and decode normally. Reference
/// types (string, bytes, arrays, tuples) are stored as the keccak256 of
/// their encoding; the original value is unrecoverable and the topic itself
/// is returned as a hash.
fn decode_topic(event: &str, topic: &B256, ty: &SolType) -> Result<ArgValue, DecodeError> {
    if ty.is_reference() {
        return Ok(ArgValue::Hash(*topic));
    }
    let value = to_dyn(ty)
        .abi_decode(topic.as_slice())
        .map_err(|e| DecodeError::AbiDecodeFailed {
            event: event.to_string(),
            reason: format!("topic decode: {e}"),
        })?;
    normalizer::normalize(value, ty)
}

/// Build alloy `DynSolType` from a ChainPretty `SolType`.
pub fn to_dyn(ty: &SolType) -> DynSolType {
    match ty {
        SolType::Bool => DynSolType::Bool,
        SolType::Address => DynSolType::Address,
        SolType::Uint(bits) => DynSolType::Uint(*bits),
        SolType::Int(bits) => DynSolType::Int(*bits),
        SolType::FixedBytes(n) => DynSolType::FixedBytes(*n),
        SolType::Bytes => DynSolType::Bytes,
        SolType::String => DynSolType::String,
        SolType::Array(inner) => DynSolType::Array(Box::new(to_dyn(inner))),
        SolType::FixedArray(inner, n) => DynSolType::FixedArray(Box::new(to_dyn(inner)), *n),
        SolType::Tuple(shape) => {
            DynSolType::Tuple(shape.components.iter().map(|c| to_dyn(&c.ty)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use chainpretty_core::Chain;
    use serde_json::json;

    fn b256(s: &str) -> B256 {
        s.parse().unwrap()
    }

    fn registry() -> EventRegistry {
        let reg = EventRegistry::new();
        reg.load_json(&json!([
            {"type": "event", "name": "Transfer", "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]},
            {"type": "event", "name": "Named", "inputs": [
                {"name": "label", "type": "string", "indexed": true},
                {"name": "text", "type": "string", "indexed": false},
                {"name": "flags", "type": "bytes4", "indexed": false}
            ]}
        ]))
        .unwrap();
        reg
    }

    fn transfer_log() -> LogRecord {
        LogRecord {
            address: "0x9aa7fec87ca69695dd1f879567ccf49f3ba417e2".parse().unwrap(),
            topics: vec![
                b256("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"),
                b256("0x000000000000000000000000d758af6bfc2f0908d7c5f89942be52c36a6b3cab"),
                b256("0x0000000000000000000000008fca634a6edec7161def4478e94b930ea275a8a2"),
            ],
            data: Bytes::from(U256::from(10_000_000_000u64).to_be_bytes::<32>().to_vec()),
            log_index: 2,
            transaction_hash: b256(
                "0x37a50ac80e26cbf0005469713177e3885800188d80b92134f150685e931aa4bf",
            ),
            transaction_index: 1,
            block_hash: b256("0x81145f3e891ab54554d964f901f122635ba4b00e22066157c6cabb647f959506"),
            block_number: 34_530_281,
            removed: false,
        }
    }

    #[test]
    fn decodes_erc20_transfer() {
        let decoder = EventDecoder::new(registry());
        let data = decoder.decode(&transfer_log()).unwrap().unwrap();
        assert_eq!(data.name, "Transfer");
        assert_eq!(data.log_index, 2);
        let from: Address = "0xd758af6bfc2f0908d7c5f89942be52c36a6b3cab".parse().unwrap();
        assert_eq!(data.args.get("from"), Some(&ArgValue::Address(from)));
        assert_eq!(
            data.args.get("value"),
            Some(&ArgValue::Uint(U256::from(10_000_000_000u64)))
        );
    }

    #[test]
    fn absent_topics_and_unknown_events() {
        let decoder = EventDecoder::new(registry());
        let mut log = transfer_log();
        log.topics.clear();
        assert!(decoder.decode(&log).unwrap().is_none());
        log.topics.push(B256::repeat_byte(0x11));
        assert!(decoder.decode(&log).unwrap().is_none());
    }

    #[test]
    fn topic_count_mismatch_surfaces() {
        let decoder = EventDecoder::new(registry());
        let mut log = transfer_log();
        log.topics.push(B256::ZERO);
        let err = decoder.decode(&log).unwrap_err();
        assert!(err.is_topic_mismatch());
    }

    #[test]
    fn corrupt_data_is_not_masked() {
        let decoder = EventDecoder::new(registry());
        let mut log = transfer_log();
        log.data = Bytes::from(vec![0u8; 5]);
        assert!(matches!(
            decoder.decode(&log),
            Err(DecodeError::AbiDecodeFailed { .. })
        ));
    }

    #[test]
    fn indexed_reference_type_is_hash() {
        let reg = registry();
        let shape = EventShape::from_abi_item(
            &serde_json::from_value(json!({"type": "event", "name": "Named", "inputs": [
                {"name": "label", "type": "string", "indexed": true},
                {"name": "text", "type": "string", "indexed": false},
                {"name": "flags", "type": "bytes4", "indexed": false}
            ]}))
            .unwrap(),
        )
        .unwrap()
        .unwrap();
        let topic0 = chainpretty_registry::event_topic(&shape);
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::String("hello".into()),
            DynSolValue::FixedBytes(B256::right_padding_from(&[0xde, 0xad, 0xbe, 0xef]), 4),
        ])
        .abi_encode_params();
        let mut log = transfer_log();
        log.topics = vec![topic0, B256::repeat_byte(0x42)];
        log.data = Bytes::from(encoded);

        let data = EventDecoder::new(reg).decode(&log).unwrap().unwrap();
        assert_eq!(data.args.get("label"), Some(&ArgValue::Hash(B256::repeat_byte(0x42))));
        assert_eq!(data.args.get("text"), Some(&ArgValue::Str("hello".into())));
        assert_eq!(data.args.get("flags"), Some(&ArgValue::Bytes("0xdeadbeef".into())));
    }

    #[test]
    fn reserved_rename_keeps_every_component() {
        let reg = EventRegistry::new();
        reg.load_json(&json!([{"type": "event", "name": "Kinds", "inputs": [
            {"name": "type", "type": "uint8", "indexed": false},
            {"name": "type_", "type": "uint8", "indexed": false}
        ]}]))
        .unwrap();
        let topic0 = chainpretty_registry::keccak256_signature("Kinds(uint8,uint8)");
        let mut log = transfer_log();
        log.topics = vec![topic0];
        log.data = Bytes::from(
            DynSolValue::Tuple(vec![
                DynSolValue::Uint(U256::from(1u8), 8),
                DynSolValue::Uint(U256::from(2u8), 8),
            ])
            .abi_encode_params(),
        );

        let data = EventDecoder::new(reg).decode(&log).unwrap().unwrap();
        assert_eq!(data.args.len(), 2);
        assert_eq!(data.args.at(0), Some(&ArgValue::Uint(U256::from(1u8))));
        assert_eq!(data.args.at(1), Some(&ArgValue::Uint(U256::from(2u8))));
    }

    #[test]
    fn supplied_tx_is_reconciled() {
        let decoder = EventDecoder::new(registry());
        let log = transfer_log();
        let block = Arc::new(Block::new(log.block_hash, log.block_number, Arc::new(Chain::unnamed(137))));
        let other = Arc::new(Tx::new(B256::ZERO, 1, Arc::clone(&block)));
        assert!(matches!(
            decoder.decode_event(&log, &block, Some(&other)),
            Err(DecodeError::TxMismatch { .. })
        ));
        let event = decoder.decode_event(&log, &block, None).unwrap().unwrap();
        assert_eq!(event.tx.hash, log.transaction_hash);
        assert_eq!(event.tx.index, 1);
    }
}
