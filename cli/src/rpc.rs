//! Minimal JSON-RPC client: chain id, receipts and blocks.

use alloy_primitives::{B256, U64};
use anyhow::{anyhow, Context, Result};
use chainpretty_core::{Block, Chain, DecodedTxLogs, LogRecord, Tx};
use chainpretty_evm::{from_rpc_call, EventDecoder, RpcCallLog};
use serde::{de::DeserializeOwned, Deserialize};
use std::{sync::Arc, time::Duration};

// ─── JSON-RPC types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub transaction_index: U64,
    pub block_hash: B256,
    pub block_number: U64,
    pub logs: Vec<RpcCallLog>,
}

#[derive(Debug, Deserialize)]
pub struct BlockSummary {
    pub hash: B256,
    pub number: U64,
    pub timestamp: U64,
    /// Hashes only (`eth_getBlockByNumber(n, false)`)
    pub transactions: Vec<B256>,
}

// ─── Client ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });
        let resp: JsonRpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("failed to parse {method} response"))?;
        if let Some(err) = resp.error {
            anyhow::bail!("RPC error in {method}: {err}");
        }
        Ok(resp.result)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self
            .call("eth_chainId", serde_json::json!([]))
            .await?
            .ok_or_else(|| anyhow!("eth_chainId returned null"))?;
        Ok(id.to::<u64>())
    }

    pub async fn receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        self.call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await?
            .ok_or_else(|| anyhow!("RPC returned null for tx {tx_hash} (not found or pending)"))
    }

    pub async fn block(&self, number: u64) -> Result<BlockSummary> {
        self.call(
            "eth_getBlockByNumber",
            serde_json::json!([format!("{number:#x}"), false]),
        )
        .await?
        .ok_or_else(|| anyhow!("block {number} not found"))
    }

    /// Fetch and decode every log of one transaction.
    pub async fn tx_logs(
        &self,
        decoder: &EventDecoder,
        chain: &Arc<Chain>,
        tx_hash: B256,
    ) -> Result<DecodedTxLogs> {
        let receipt = self.receipt(tx_hash).await?;
        let header = self.block(receipt.block_number.to::<u64>()).await?;
        decode_receipt(decoder, receipt, &header.into_block(chain))
    }

    /// Decode every transaction of a block, in block order.
    pub async fn block_logs(
        &self,
        decoder: &EventDecoder,
        chain: &Arc<Chain>,
        number: u64,
    ) -> Result<Vec<DecodedTxLogs>> {
        let summary = self.block(number).await?;
        let tx_hashes = summary.transactions.clone();
        let block = summary.into_block(chain);
        let mut out = Vec::with_capacity(tx_hashes.len());
        for tx_hash in tx_hashes {
            let receipt = self.receipt(tx_hash).await?;
            out.push(decode_receipt(decoder, receipt, &block)?);
        }
        Ok(out)
    }
}

impl BlockSummary {
    fn into_block(self, chain: &Arc<Chain>) -> Arc<Block> {
        Arc::new(
            Block::new(self.hash, self.number.to::<u64>(), Arc::clone(chain))
                .with_timestamp(self.timestamp.to::<u64>()),
        )
    }
}

fn decode_receipt(
    decoder: &EventDecoder,
    receipt: TransactionReceipt,
    block: &Arc<Block>,
) -> Result<DecodedTxLogs> {
    let tx_hash = receipt.transaction_hash;
    let tx = Arc::new(Tx::new(
        tx_hash,
        receipt.transaction_index.to::<u64>(),
        Arc::clone(block),
    ));
    let logs = receipt
        .logs
        .iter()
        .map(from_rpc_call)
        .collect::<Result<Vec<LogRecord>, _>>()
        .with_context(|| format!("malformed logs in receipt of {tx_hash}"))?;
    Ok(decoder.decode_tx_logs(tx, logs))
}
