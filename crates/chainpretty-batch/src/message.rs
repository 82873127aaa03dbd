//! Webhook message payloads and packing limits.

use serde::{Deserialize, Serialize};

/// One rendered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub description: String,
}

impl Embed {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// Bytes this embed adds to a message: the length of its compact JSON.
    pub fn size(&self) -> usize {
        serde_json::to_string(self).map_or(0, |s| s.len())
    }
}

/// A single webhook post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub embeds: Vec<Embed>,
}

impl Message {
    pub fn size(&self) -> usize {
        self.embeds.iter().map(Embed::size).sum()
    }
}

/// Bounds on a single message. Discord accepts at most 10 embeds and 6000
/// characters per post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_embeds: usize,
    pub max_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_embeds: 9,
            max_bytes: 5000,
        }
    }
}

impl BatchLimits {
    pub fn max_embeds(mut self, n: usize) -> Self {
        self.max_embeds = n.max(1);
        self
    }

    pub fn max_bytes(mut self, n: usize) -> Self {
        self.max_bytes = n;
        self
    }
}
