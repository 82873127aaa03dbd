//! Multi-log decode helpers: whole transactions and webhook payloads.

use chainpretty_core::{Block, Chain, DecodeError, DecodedTxLogs, Event, LogRecord, Tx};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::decoder::EventDecoder;
use crate::logs::decode_graphql_payload;

impl EventDecoder {
    /// Decode every log of one transaction.
    ///
    /// Logs that are not events, are unknown, or fail to decode become
    /// `None`, so `decoded_logs[i]` always lines up with `raw_logs[i]`.
    pub fn decode_tx_logs(&self, tx: Arc<Tx>, raw_logs: Vec<LogRecord>) -> DecodedTxLogs {
        let decoded_logs = raw_logs
            .iter()
            .map(|log| match self.decode_event(log, &tx.block, Some(&tx)) {
                Ok(event) => event,
                Err(e) => {
                    warn!(log_index = log.log_index, error = %e, "log decode failed");
                    None
                }
            })
            .collect();
        DecodedTxLogs {
            tx,
            raw_logs,
            decoded_logs,
        }
    }

    /// Decode a block's logs, dropping non-events and unknown events.
    /// Decode errors abort the whole set.
    pub fn decode_logs(
        &self,
        block: &Arc<Block>,
        logs: &[LogRecord],
    ) -> Result<Vec<Event>, DecodeError> {
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match self.decode_event(log, block, None)? {
                Some(event) => events.push(event),
                None => debug!(log_index = log.log_index, "log skipped"),
            }
        }
        Ok(events)
    }

    /// Decode a block's logs grouped per transaction, transactions in the
    /// order their first log appears. Non-events and unknown events are
    /// `None`; decode errors abort the whole set.
    pub fn decode_block_txs(
        &self,
        block: &Arc<Block>,
        logs: Vec<LogRecord>,
    ) -> Result<Vec<DecodedTxLogs>, DecodeError> {
        let mut groups: Vec<(Arc<Tx>, Vec<LogRecord>)> = Vec::new();
        for log in logs {
            match groups.iter_mut().find(|(tx, _)| tx.hash == log.transaction_hash) {
                Some((_, raw)) => raw.push(log),
                None => {
                    let tx = Tx::new(log.transaction_hash, log.transaction_index, Arc::clone(block));
                    groups.push((Arc::new(tx), vec![log]));
                }
            }
        }
        groups
            .into_iter()
            .map(|(tx, raw_logs)| {
                let decoded_logs = raw_logs
                    .iter()
                    .map(|log| self.decode_event(log, block, Some(&tx)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DecodedTxLogs {
                    tx,
                    raw_logs,
                    decoded_logs,
                })
            })
            .collect()
    }

    /// Like [`decode_graphql`](Self::decode_graphql), keeping the raw logs
    /// of each transaction.
    pub fn decode_graphql_txs(
        &self,
        payload: &Value,
        chain: Arc<Chain>,
    ) -> Result<Vec<DecodedTxLogs>, DecodeError> {
        let (header, logs) = decode_graphql_payload(payload)?;
        let block = Arc::new(header.into_block(chain));
        self.decode_block_txs(&block, logs)
    }

    /// Decode all events of a GraphQL webhook payload.
    pub fn decode_graphql(
        &self,
        payload: &Value,
        chain: Arc<Chain>,
    ) -> Result<Vec<Event>, DecodeError> {
        let (header, logs) = decode_graphql_payload(payload)?;
        let block = Arc::new(header.into_block(chain));
        self.decode_logs(&block, &logs)
    }
}
