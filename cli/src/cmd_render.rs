//! `chainpretty render-events`: decode events from a webhook payload, a
//! receipt file, a transaction or a block, then print or deliver them.

use alloy_primitives::B256;
use anyhow::{anyhow, Context, Result};
use chainpretty_core::{Block, DecodedTxLogs};
use chainpretty_evm::{from_rpc_json, logs::parse_quantity};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

use crate::{pipeline, settings::RenderEnv};

/// What `render-events` was pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Webhook payload or transaction receipt saved as JSON
    File(PathBuf),
    TxHash(B256),
    Block(u64),
}

impl Input {
    pub fn parse(input: &str) -> Result<Self> {
        if input.ends_with(".json") {
            Ok(Input::File(PathBuf::from(input)))
        } else if input.starts_with("0x") && input.len() == 66 {
            let hash = input
                .parse()
                .with_context(|| format!("invalid transaction hash '{input}'"))?;
            Ok(Input::TxHash(hash))
        } else if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            Ok(Input::Block(input.parse()?))
        } else {
            Err(anyhow!("Unknown input '{input}'"))
        }
    }
}

pub async fn run(env: &RenderEnv, input: &str, output: Option<&Path>) -> Result<()> {
    let txs = load_txs(env, &Input::parse(input)?).await?;
    info!(transactions = txs.len(), "logs decoded");

    let default_output;
    let outputs = if env.outputs.is_empty() {
        default_output = [pipeline::print_to(output.map(Path::to_path_buf))];
        &default_output[..]
    } else {
        if output.is_some() {
            warn!("--output is ignored when outputs are configured");
        }
        env.outputs.as_slice()
    };
    pipeline::deliver(env, &txs, outputs).await?;
    Ok(())
}

pub async fn load_txs(env: &RenderEnv, input: &Input) -> Result<Vec<DecodedTxLogs>> {
    match input {
        Input::File(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let value: Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            txs_from_json(env, &value)
        }
        Input::TxHash(hash) => {
            let tx_logs = env.rpc()?.tx_logs(&env.decoder, &env.chain, *hash).await?;
            Ok(vec![tx_logs])
        }
        Input::Block(number) => env.rpc()?.block_logs(&env.decoder, &env.chain, *number).await,
    }
}

/// A webhook payload (`event.data.block`) or an RPC receipt (`logs`).
fn txs_from_json(env: &RenderEnv, value: &Value) -> Result<Vec<DecodedTxLogs>> {
    if value.pointer("/event/data/block").is_some() {
        return Ok(env.decoder.decode_graphql_txs(value, Arc::clone(&env.chain))?);
    }
    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("expected a webhook payload or a transaction receipt"))?;
    let records = logs
        .iter()
        .map(from_rpc_json)
        .collect::<Result<Vec<_>, _>>()?;
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let mut block = Block::new(first.block_hash, first.block_number, Arc::clone(&env.chain));
    if let Some(ts) = value.get("timestamp").and_then(Value::as_str) {
        block = block.with_timestamp(parse_quantity(ts).map_err(|e| anyhow!(e))?);
    }
    Ok(env.decoder.decode_block_txs(&Arc::new(block), records)?)
}
