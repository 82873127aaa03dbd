//! Webhook sample → decode → rules → templates → batches → sink.

use async_trait::async_trait;
use chainpretty_batch::{dispatch, BatchEngine, DeliveryOutcome, Embed, Message, MessageSink};
use chainpretty_evm::EventDecoder;
use chainpretty_filter::{load_rules_file, FilterFactory};
use chainpretty_registry::EventRegistry;
use chainpretty_render::{init_environment, ChainDirectory, EnvGlobals, Renderer};
use parking_lot::Mutex;
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};

fn fixture_path(rel: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures");
    p.push(rel);
    p
}

#[derive(Default)]
struct MemorySink {
    sent: Mutex<Vec<Message>>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&self, message: &Message) -> DeliveryOutcome {
        self.sent.lock().push(message.clone());
        DeliveryOutcome {
            status: Some(204),
            body: String::new(),
        }
    }
}

#[tokio::test]
async fn sample_renders_one_transfer_in_one_batch() {
    let registry = EventRegistry::new();
    registry.load_paths(&[fixture_path("abis")]).unwrap();

    let globals = EnvGlobals::new(137)
        .with_chains(ChainDirectory::from_file(&fixture_path("chains.json")).unwrap());
    let chain = globals.chain();
    let renderer = init_environment(&[fixture_path("templates")], globals).unwrap();
    let rules = load_rules_file(&FilterFactory::default(), &fixture_path("rules.yaml")).unwrap();

    let text = std::fs::read_to_string(fixture_path("samples/alchemy-sample.json")).unwrap();
    let payload: Value = serde_json::from_str(&text).unwrap();
    let events = EventDecoder::new(registry).decode_graphql(&payload, chain).unwrap();
    assert_eq!(events.len(), 3);

    let renderer: Arc<dyn Renderer> = Arc::new(renderer);
    let result = BatchEngine::new(Arc::new(rules), renderer).build(events);
    assert_eq!(result.batches.len(), 1);
    assert_eq!(result.message_count(), 1);
    assert_eq!(result.unmatched, 2);

    let expected = Embed::new(
        "Transfer 10000 from 0xD758aF6BFC2f0908D7C5f89942be52C36a6b3cab \
         to 0x8fca634A6EDEc7161dEF4478e94B930Ea275A8a2",
    );
    assert_eq!(result.batches[0].messages[0].embeds, vec![expected.clone()]);

    let sink = Arc::new(MemorySink::default());
    let outcomes = dispatch(sink.clone(), &result.batches, 4).await;
    assert!(outcomes.iter().flatten().all(DeliveryOutcome::is_success));
    assert_eq!(*sink.sent.lock(), vec![Message { embeds: vec![expected] }]);
}
