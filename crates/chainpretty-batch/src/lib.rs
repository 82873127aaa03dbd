//! # chainpretty-batch
//!
//! Turns decoded events into webhook messages and delivers them.
//!
//! - Events are ordered by (block, tx index, log index) and grouped by tx
//! - Each event is rendered with the template its rules select
//! - Rendered embeds are packed into messages of at most 9 embeds / 5000 bytes
//! - Transactions are delivered concurrently, their messages in order
//! - Raw logs can be published per transaction to Pub/Sub instead
//! - Outputs are chosen by URL (`print://`, `discord://`, `pubsubrawlogs://`)
//!
//! ## Usage
//! ```no_run
//! use chainpretty_batch::{dispatch, BatchEngine, DiscordWebhook};
//!
//! // let engine = BatchEngine::new(rules, renderer);
//! // let result = engine.build(events);
//! // let outcomes = dispatch(Arc::new(DiscordWebhook::new(url)), &result.batches, 4).await;
//! ```

pub mod delivery;
pub mod engine;
pub mod message;
pub mod output;
pub mod raw_logs;

pub use delivery::{dispatch, DeliveryOutcome, DiscordWebhook, MessageSink};
pub use engine::{group_by_tx, pack, BatchEngine, BatchResult, TxBatches, TxGroup};
pub use message::{BatchLimits, Embed, Message};
pub use output::{OutputSpec, OutputUrlError};
pub use raw_logs::{
    raw_logs_message, DryRunPublisher, PubSubPublisher, PublishError, Publisher, RawLogsOutput,
};
