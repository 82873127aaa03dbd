//! Load JSON ABIs from disk into an `EventRegistry`.
//!
//! Each search path is walked recursively; every `*.json` file is either a
//! build artifact (`{"abi": [...], ...}`) or a bare ABI array.

use chainpretty_core::error::RegistryError;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::registry::EventRegistry;

impl EventRegistry {
    /// Walk `paths` and load every JSON ABI found. Returns the total number
    /// of event declarations processed.
    pub fn load_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<usize, RegistryError> {
        let mut count = 0;
        for root in paths {
            let root = root.as_ref();
            if !root.exists() {
                warn!(path = %root.display(), "ABI search path does not exist");
                continue;
            }
            for entry in WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            {
                count += self.load_file(entry.path())?;
            }
        }
        info!(events = count, topics = self.len(), "ABIs loaded");
        Ok(count)
    }

    /// Load a single JSON ABI file.
    pub fn load_file(&self, path: &Path) -> Result<usize, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| RegistryError::Json {
                path: path.display().to_string(),
                source,
            })?;
        let abi = match &value {
            serde_json::Value::Object(obj) => match obj.get("abi") {
                Some(abi @ serde_json::Value::Array(_)) => abi,
                _ => {
                    return Err(RegistryError::NotAnAbi {
                        path: path.display().to_string(),
                    })
                }
            },
            serde_json::Value::Array(_) => &value,
            _ => {
                return Err(RegistryError::NotAnAbi {
                    path: path.display().to_string(),
                })
            }
        };
        self.load_json(abi)
    }
}
