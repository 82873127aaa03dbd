//! Render decoded transactions once and hand them to every configured output.

use anyhow::{Context, Result};
use chainpretty_batch::{dispatch, BatchResult};
use chainpretty_core::{DecodedTxLogs, Event};
use serde::Serialize;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

use crate::settings::{Output, RenderEnv};

const SEPARATOR: &str = "--------------------------";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub events: usize,
    pub messages: usize,
    pub unmatched: usize,
    pub render_failures: usize,
    /// Messages or publishes an output did not accept
    pub failed: usize,
}

pub async fn deliver(env: &RenderEnv, txs: &[DecodedTxLogs], outputs: &[Output]) -> Result<Summary> {
    let events: Vec<Event> = txs.iter().flat_map(|t| t.events().cloned()).collect();
    let chain = env.chain.name.as_str();
    env.metrics.record_decoded(chain, events.len() as u64);

    let mut summary = Summary {
        events: events.len(),
        ..Summary::default()
    };
    let result = env.batch_engine().build(events);
    summary.messages = result.message_count();
    summary.unmatched = result.unmatched;
    summary.render_failures = result.render_failures;
    env.metrics
        .record_skipped(chain, "no_template", result.unmatched as u64);
    env.metrics
        .record_render_failures(chain, result.render_failures as u64);

    for output in outputs {
        match output {
            Output::Print { file } => print_rendered(&result, file.as_deref())?,
            Output::Discord(sink) => {
                let outcomes = dispatch(Arc::clone(sink), &result.batches, env.concurrency).await;
                let failed = outcomes.iter().flatten().filter(|o| !o.is_success()).count();
                env.metrics
                    .record_delivery("discord", summary.messages as u64, failed as u64);
                summary.failed += failed;
            }
            Output::RawLogs(raw) => {
                let failed = raw.send_all(txs).await;
                env.metrics
                    .record_delivery("pubsub", txs.len() as u64, failed as u64);
                summary.failed += failed;
            }
        }
    }

    if summary.failed > 0 {
        warn!(failed = summary.failed, "some outputs were not delivered");
    }
    info!(
        transactions = txs.len(),
        events = summary.events,
        messages = summary.messages,
        outputs = outputs.len(),
        "delivered"
    );
    Ok(summary)
}

/// Each rendered event followed by a separator line.
pub fn write_rendered(result: &BatchResult, out: &mut dyn Write) -> Result<()> {
    for embed in result.messages().flat_map(|m| m.embeds.iter()) {
        writeln!(out, "{}", embed.description)?;
        writeln!(out, "{SEPARATOR}")?;
    }
    out.flush()?;
    Ok(())
}

fn print_rendered(result: &BatchResult, file: Option<&Path>) -> Result<()> {
    match file {
        Some(path) => {
            let mut f = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_rendered(result, &mut f)
        }
        None => write_rendered(result, &mut std::io::stdout().lock()),
    }
}

/// The default output of `render-events`.
pub fn print_to(file: Option<PathBuf>) -> Output {
    Output::Print { file }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpretty_batch::{Embed, Message, TxBatches};
    use alloy_primitives::B256;

    #[test]
    fn rendered_text_is_separated() {
        let result = BatchResult {
            batches: vec![TxBatches {
                tx_hash: B256::ZERO,
                messages: vec![
                    Message { embeds: vec![Embed::new("one"), Embed::new("two")] },
                    Message { embeds: vec![Embed::new("three")] },
                ],
            }],
            ..BatchResult::default()
        };
        let mut out = Vec::new();
        write_rendered(&result, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("one\n{SEPARATOR}\ntwo\n{SEPARATOR}\nthree\n{SEPARATOR}\n")
        );
    }
}
