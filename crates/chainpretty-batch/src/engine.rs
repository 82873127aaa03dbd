//! `BatchEngine`: orders events, groups them by transaction, renders each one
//! and packs the results into bounded messages.

use alloy_primitives::B256;
use chainpretty_core::{Event, Tx};
use chainpretty_filter::{find_template, TemplateRule};
use chainpretty_render::Renderer;
use std::sync::Arc;
use tracing::{debug, info};

use crate::message::{BatchLimits, Embed, Message};

/// Events of one transaction, in log order.
#[derive(Debug, Clone)]
pub struct TxGroup {
    pub tx: Arc<Tx>,
    pub events: Vec<Event>,
}

/// The messages produced for one transaction, in sending order.
#[derive(Debug, Clone, PartialEq)]
pub struct TxBatches {
    pub tx_hash: B256,
    pub messages: Vec<Message>,
}

/// Result of a batching job.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub batches: Vec<TxBatches>,
    /// Events with no matching template
    pub unmatched: usize,
    /// Events whose templates all failed to render
    pub render_failures: usize,
}

impl BatchResult {
    pub fn message_count(&self) -> usize {
        self.batches.iter().map(|b| b.messages.len()).sum()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.batches.iter().flat_map(|b| b.messages.iter())
    }
}

/// Sort by (block number, tx index, log index) and group consecutive events
/// of the same transaction.
pub fn group_by_tx(mut events: Vec<Event>) -> Vec<TxGroup> {
    events.sort_by_key(Event::sort_key);
    let mut groups: Vec<TxGroup> = Vec::new();
    for event in events {
        match groups.last_mut() {
            Some(group) if group.tx.hash == event.tx.hash => group.events.push(event),
            _ => groups.push(TxGroup {
                tx: Arc::clone(&event.tx),
                events: vec![event],
            }),
        }
    }
    groups
}

/// Pack units into messages under `limits`.
///
/// A unit that would push the open message over either limit closes it
/// first. A unit larger than `max_bytes` on its own gets a message to itself.
pub fn pack(units: Vec<Embed>, limits: BatchLimits) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut current = Message::default();
    let mut bytes = 0usize;

    for unit in units {
        let size = unit.size();
        let over_count = current.embeds.len() + 1 > limits.max_embeds;
        let over_bytes = bytes + size > limits.max_bytes;
        if !current.embeds.is_empty() && (over_count || over_bytes) {
            messages.push(std::mem::take(&mut current));
            bytes = 0;
        }
        current.embeds.push(unit);
        bytes += size;
        if size > limits.max_bytes {
            messages.push(std::mem::take(&mut current));
            bytes = 0;
        }
    }
    if !current.embeds.is_empty() {
        messages.push(current);
    }
    messages
}

/// Renders and packs decoded events for delivery.
pub struct BatchEngine {
    rules: Arc<Vec<TemplateRule>>,
    renderer: Arc<dyn Renderer>,
    on_error_template: Option<String>,
    limits: BatchLimits,
}

impl BatchEngine {
    pub fn new(rules: Arc<Vec<TemplateRule>>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            rules,
            renderer,
            on_error_template: None,
            limits: BatchLimits::default(),
        }
    }

    /// Template tried when the rule's template fails to render.
    pub fn on_error_template(mut self, template: impl Into<String>) -> Self {
        self.on_error_template = Some(template.into());
        self
    }

    pub fn limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Render one event, or `None` if no rule matches or rendering fails.
    fn render_unit(&self, event: &Event, result: &mut BatchResult) -> Option<Embed> {
        let Some(template) = find_template(&self.rules, event) else {
            debug!(event = %event.name, log_index = event.log_index, "no template, skipping");
            result.unmatched += 1;
            return None;
        };
        let mut templates = vec![template];
        if let Some(fallback) = self.on_error_template.as_deref() {
            templates.push(fallback);
        }
        match self.renderer.render_first(&templates, event) {
            Ok(text) => Some(Embed::new(text)),
            Err(_) => {
                result.render_failures += 1;
                None
            }
        }
    }

    pub fn build(&self, events: Vec<Event>) -> BatchResult {
        let total = events.len();
        let mut result = BatchResult::default();
        for group in group_by_tx(events) {
            let units: Vec<Embed> = group
                .events
                .iter()
                .filter_map(|e| self.render_unit(e, &mut result))
                .collect();
            let messages = pack(units, self.limits);
            if !messages.is_empty() {
                result.batches.push(TxBatches {
                    tx_hash: group.tx.hash,
                    messages,
                });
            }
        }
        info!(
            events = total,
            transactions = result.batches.len(),
            messages = result.message_count(),
            unmatched = result.unmatched,
            render_failures = result.render_failures,
            "batching complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use chainpretty_core::{Block, Chain, DecodedArgs, RenderError};
    use chainpretty_filter::{read_template_rules, FilterFactory};
    use serde_json::json;

    fn event(block: u64, tx_index: u64, log_index: u64, name: &str) -> Event {
        let b = Arc::new(Block::new(B256::ZERO, block, Arc::new(Chain::unnamed(1))));
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&block.to_be_bytes());
        hash[8..16].copy_from_slice(&tx_index.to_be_bytes());
        Event {
            name: name.into(),
            address: Address::ZERO,
            args: DecodedArgs::new(),
            log_index,
            tx: Arc::new(Tx::new(B256::from(hash), tx_index, b)),
        }
    }

    fn units(sizes: &[usize]) -> Vec<Embed> {
        // an embed of n description bytes serializes to n + 18 bytes
        sizes.iter().map(|n| Embed::new("x".repeat(n - 18))).collect()
    }

    fn shape(messages: &[Message]) -> Vec<usize> {
        messages.iter().map(|m| m.embeds.len()).collect()
    }

    #[test]
    fn groups_in_chain_order() {
        let events = vec![
            event(2, 0, 5, "c"),
            event(1, 3, 9, "b"),
            event(1, 0, 2, "a2"),
            event(1, 0, 1, "a1"),
        ];
        let groups = group_by_tx(events);
        let names: Vec<Vec<&str>> = groups
            .iter()
            .map(|g| g.events.iter().map(|e| e.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["a1", "a2"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn pack_by_count() {
        let limits = BatchLimits::default();
        assert_eq!(shape(&pack(units(&[20; 9]), limits)), vec![9]);
        assert_eq!(shape(&pack(units(&[20; 10]), limits)), vec![9, 1]);
        assert_eq!(shape(&pack(units(&[20; 19]), limits)), vec![9, 9, 1]);
    }

    #[test]
    fn pack_by_bytes() {
        let limits = BatchLimits::default();
        // exactly at the budget stays together
        assert_eq!(shape(&pack(units(&[2500, 2500]), limits)), vec![2]);
        assert_eq!(shape(&pack(units(&[2500, 2501]), limits)), vec![1, 1]);
        assert_eq!(shape(&pack(units(&[1000, 6000, 1000]), limits)), vec![1, 1, 1]);
        assert!(pack(Vec::new(), limits).is_empty());
    }

    #[test]
    fn pack_tracks_running_total() {
        let limits = BatchLimits::default();
        assert_eq!(shape(&pack(units(&[2000, 2000, 2000]), limits)), vec![2, 1]);
        assert_eq!(shape(&pack(units(&[1500; 4]), limits)), vec![3, 1]);
        assert_eq!(shape(&pack(units(&[2000; 7]), limits)), vec![2, 2, 2, 1]);
        assert_eq!(shape(&pack(units(&[1000, 1000, 3000, 1000]), limits)), vec![3, 1]);
    }

    #[test]
    fn oversized_unit_travels_alone() {
        let limits = BatchLimits::default();
        let alone = pack(units(&[6000]), limits);
        assert_eq!(shape(&alone), vec![1]);
        assert_eq!(alone[0].size(), 6000);
        assert_eq!(shape(&pack(units(&[100, 6000]), limits)), vec![1, 1]);
        assert_eq!(shape(&pack(units(&[6000, 100, 100]), limits)), vec![1, 2]);
    }

    #[derive(Debug)]
    struct NameRenderer;

    impl Renderer for NameRenderer {
        fn render(&self, template: &str, event: &Event) -> Result<String, RenderError> {
            match template {
                "fails" => Err(RenderError::Render {
                    template: template.into(),
                    reason: "boom".into(),
                }),
                _ => Ok(format!("{template}:{}", event.name)),
            }
        }
    }

    fn engine(rules: serde_json::Value) -> BatchEngine {
        let rules = read_template_rules(&FilterFactory::default(), &rules).unwrap();
        BatchEngine::new(Arc::new(rules), Arc::new(NameRenderer))
    }

    #[test]
    fn skips_unmatched_and_failed_events() {
        let engine = engine(json!({"rules": [
            {"match": {"name": "Good"}, "template": "t"},
            {"match": {"name": "Bad"}, "template": "fails"}
        ]}));
        let result = engine.build(vec![
            event(1, 0, 1, "Good"),
            event(1, 0, 2, "Other"),
            event(1, 0, 3, "Bad"),
            event(1, 1, 4, "Other"),
        ]);
        assert_eq!(result.unmatched, 2);
        assert_eq!(result.render_failures, 1);
        assert_eq!(result.batches.len(), 1);
        assert_eq!(result.batches[0].messages[0].embeds, vec![Embed::new("t:Good")]);
    }

    #[test]
    fn fallback_template_rescues_failures() {
        let engine = engine(json!({"rules": [{"match": {"name": "Bad"}, "template": "fails"}]}))
            .on_error_template("fallback");
        let result = engine.build(vec![event(1, 0, 1, "Bad")]);
        assert_eq!(result.render_failures, 0);
        assert_eq!(
            result.messages().next().unwrap().embeds,
            vec![Embed::new("fallback:Bad")]
        );
    }

    #[test]
    fn one_message_list_per_transaction() {
        let engine = engine(json!({"rules": [{"match": {"filter_type": "true"}, "template": "t"}]}))
            .limits(BatchLimits::default().max_embeds(2));
        let events = (0..5).map(|i| event(1, i / 3, i, "E")).collect();
        let result = engine.build(events);
        assert_eq!(result.batches.len(), 2);
        assert_eq!(shape(&result.batches[0].messages), vec![2, 1]);
        assert_eq!(shape(&result.batches[1].messages), vec![2]);
    }
}
