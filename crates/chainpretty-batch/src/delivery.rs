//! Message delivery.
//!
//! Transactions are dispatched concurrently; the messages of one transaction
//! are sent one after another, in packing order.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::TxBatches;
use crate::message::Message;

/// What the receiving end answered. `status` is `None` when no HTTP response
/// was received at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: Option<u16>,
    pub body: String,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(s) if (200..300).contains(&s))
    }
}

/// Destination for rendered messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message. Failures are reported in the outcome.
    async fn send(&self, message: &Message) -> DeliveryOutcome;
}

/// Posts messages to a Discord webhook URL.
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl MessageSink for DiscordWebhook {
    async fn send(&self, message: &Message) -> DeliveryOutcome {
        match self.client.post(&self.url).json(message).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                DeliveryOutcome {
                    status: Some(status),
                    body,
                }
            }
            Err(e) => DeliveryOutcome {
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            },
        }
    }
}

/// Send every batch through `sink`, at most `concurrency` transactions in
/// flight. Outcomes are grouped per transaction in input order.
pub async fn dispatch(
    sink: Arc<dyn MessageSink>,
    batches: &[TxBatches],
    concurrency: usize,
) -> Vec<Vec<DeliveryOutcome>> {
    // each future owns its sink handle and batch, so the set is 'static + Send
    let pending: Vec<_> = batches
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, batch)| send_tx(Arc::clone(&sink), i, batch))
        .collect();
    let mut indexed: Vec<(usize, Vec<DeliveryOutcome>)> = stream::iter(pending)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    indexed.sort_by_key(|(i, _)| *i);

    let outcomes: Vec<Vec<DeliveryOutcome>> = indexed.into_iter().map(|(_, o)| o).collect();
    let failed = outcomes.iter().flatten().filter(|o| !o.is_success()).count();
    info!(
        transactions = outcomes.len(),
        messages = outcomes.iter().map(Vec::len).sum::<usize>(),
        failed,
        "delivery complete"
    );
    outcomes
}

/// The messages of one transaction, one after another.
async fn send_tx(
    sink: Arc<dyn MessageSink>,
    index: usize,
    batch: TxBatches,
) -> (usize, Vec<DeliveryOutcome>) {
    let mut outcomes = Vec::with_capacity(batch.messages.len());
    for (n, message) in batch.messages.iter().enumerate() {
        let outcome = sink.send(message).await;
        if !outcome.is_success() {
            warn!(
                tx = %batch.tx_hash,
                part = n + 1,
                status = ?outcome.status,
                body = %outcome.body,
                "message delivery failed"
            );
        }
        outcomes.push(outcome);
    }
    (index, outcomes)
}
