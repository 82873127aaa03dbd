//! `chainpretty load-events`: count the event declarations found in ABIs.

use anyhow::{Context, Result};
use chainpretty_registry::EventRegistry;
use std::path::PathBuf;
use tracing::info;

pub fn run(paths: &[PathBuf]) -> Result<usize> {
    let registry = EventRegistry::new();
    let count = registry.load_paths(paths).context("loading ABIs")?;
    for name in registry.names() {
        info!(event = %name, "loaded");
    }
    Ok(count)
}
