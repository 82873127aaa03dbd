//! Raw-log publishing: each transaction's undecoded logs as one JSON message
//! on a Pub/Sub topic.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chainpretty_core::DecodedTxLogs;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{io::Write, sync::Arc};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("publish rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("publish response carried no message id")]
    MissingId,

    #[error("writing dry-run output: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The message published for one transaction.
pub fn raw_logs_message(tx_logs: &DecodedTxLogs) -> Value {
    let tx = &tx_logs.tx;
    let logs: Vec<Value> = tx_logs
        .raw_logs
        .iter()
        .map(|log| {
            json!({
                "address": log.address.to_checksum(None),
                "topics": log.topics,
                "data": log.data,
                "logIndex": log.log_index,
            })
        })
        .collect();
    json!({
        "transactionHash": tx.hash,
        "blockHash": tx.block.hash,
        "blockNumber": tx.block.number,
        "logs": logs,
    })
}

/// Publishes a payload to a topic and returns the message id.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic_path: &str, data: Vec<u8>) -> Result<String, PublishError>;
}

/// Writes what would be published instead of publishing it.
pub struct DryRunPublisher {
    out: Mutex<Box<dyn Write + Send>>,
}

impl DryRunPublisher {
    pub const MESSAGE_ID: &'static str = "dry-run-message-id";

    pub fn stdout() -> Self {
        Self::to_writer(Box::new(std::io::stdout()))
    }

    pub fn to_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, topic_path: &str, data: Vec<u8>) -> Result<String, PublishError> {
        let mut out = self.out.lock();
        writeln!(out, "[Dry Run] Publishing to {topic_path}:")?;
        out.write_all(&data)?;
        writeln!(out)?;
        out.flush()?;
        Ok(Self::MESSAGE_ID.to_string())
    }
}

/// Google Cloud Pub/Sub over its REST API.
pub struct PubSubPublisher {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl PubSubPublisher {
    pub const DEFAULT_ENDPOINT: &'static str = "https://pubsub.googleapis.com";

    /// `token` is an OAuth2 access token; emulators need none.
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            token,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Publisher for PubSubPublisher {
    async fn publish(&self, topic_path: &str, data: Vec<u8>) -> Result<String, PublishError> {
        let url = format!("{}/v1/{topic_path}:publish", self.endpoint);
        let body = json!({ "messages": [{ "data": STANDARD.encode(data) }] });
        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PublishError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let reply: Value = resp.json().await?;
        reply
            .pointer("/messageIds/0")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(PublishError::MissingId)
    }
}

/// Publishes the raw logs of each transaction to one topic.
#[derive(Clone)]
pub struct RawLogsOutput {
    publisher: Arc<dyn Publisher>,
    topic_path: String,
}

impl RawLogsOutput {
    pub fn new(publisher: Arc<dyn Publisher>, project_id: &str, topic: &str) -> Self {
        Self {
            publisher,
            topic_path: format!("projects/{project_id}/topics/{topic}"),
        }
    }

    pub fn topic_path(&self) -> &str {
        &self.topic_path
    }

    pub async fn send(&self, tx_logs: &DecodedTxLogs) -> Result<String, PublishError> {
        let payload = serde_json::to_vec_pretty(&raw_logs_message(tx_logs))?;
        let id = self.publisher.publish(&self.topic_path, payload).await?;
        info!(tx = %tx_logs.tx.hash, message_id = %id, "raw logs published");
        Ok(id)
    }

    /// Publish every transaction in order. Failures are logged and counted.
    pub async fn send_all(&self, txs: &[DecodedTxLogs]) -> usize {
        let mut failed = 0;
        for tx_logs in txs {
            if let Err(e) = self.send(tx_logs).await {
                error!(tx = %tx_logs.tx.hash, error = %e, "raw logs publish failed");
                failed += 1;
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256};
    use chainpretty_core::{Block, Chain, LogRecord, Tx};

    fn tx_logs() -> DecodedTxLogs {
        let block = Arc::new(Block::new(B256::repeat_byte(0xbb), 42, Arc::new(Chain::unnamed(1))));
        let tx = Arc::new(Tx::new(B256::repeat_byte(0xaa), 3, block));
        let log = |index: u64| LogRecord {
            address: "0xd758af6bfc2f0908d7c5f89942be52c36a6b3cab".parse::<Address>().unwrap(),
            topics: vec![B256::repeat_byte(0x01)],
            data: Bytes::from(vec![0xde, 0xad]),
            log_index: index,
            transaction_hash: tx.hash,
            transaction_index: 3,
            block_hash: tx.block.hash,
            block_number: 42,
            removed: false,
        };
        DecodedTxLogs {
            raw_logs: vec![log(7), log(8)],
            decoded_logs: vec![None, None],
            tx,
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn message_layout() {
        let msg = raw_logs_message(&tx_logs());
        assert_eq!(msg["transactionHash"], format!("0x{}", "aa".repeat(32)));
        assert_eq!(msg["blockHash"], format!("0x{}", "bb".repeat(32)));
        assert_eq!(msg["blockNumber"], 42);
        let logs = msg["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["address"], "0xD758aF6BFC2f0908D7C5f89942be52C36a6b3cab");
        assert_eq!(logs[0]["topics"][0], format!("0x{}", "01".repeat(32)));
        assert_eq!(logs[0]["data"], "0xdead");
        assert_eq!(logs[1]["logIndex"], 8);
        let keys: Vec<_> = msg.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["transactionHash", "blockHash", "blockNumber", "logs"]);
    }

    #[tokio::test]
    async fn dry_run_writes_instead_of_publishing() {
        let buf = SharedBuf::default();
        let publisher = Arc::new(DryRunPublisher::to_writer(Box::new(buf.clone())));
        let output = RawLogsOutput::new(publisher, "acme", "raw-logs");
        assert_eq!(output.topic_path(), "projects/acme/topics/raw-logs");

        let id = output.send(&tx_logs()).await.unwrap();
        assert_eq!(id, DryRunPublisher::MESSAGE_ID);

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        let (header, body) = text.split_once('\n').unwrap();
        assert_eq!(header, "[Dry Run] Publishing to projects/acme/topics/raw-logs:");
        let published: Value = serde_json::from_str(body).unwrap();
        assert_eq!(published, raw_logs_message(&tx_logs()));
    }

    struct Failing;

    #[async_trait]
    impl Publisher for Failing {
        async fn publish(&self, _: &str, _: Vec<u8>) -> Result<String, PublishError> {
            Err(PublishError::MissingId)
        }
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let output = RawLogsOutput::new(Arc::new(Failing), "p", "t");
        assert_eq!(output.send_all(&[tx_logs(), tx_logs()]).await, 2);
    }
}
