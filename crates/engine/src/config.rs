//! Store configuration via `recstore.toml`
//!
//! On first open, a default `recstore.toml` is created in the database
//! directory. To change settings, edit the file and reopen the database.

use recstore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::collection::CollectionOptions;

/// Config file name placed in the database directory.
pub const CONFIG_FILE_NAME: &str = "recstore.toml";

/// Settings for one named collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Payload fields whose values must be unique.
    #[serde(default)]
    pub unique_fields: Vec<String>,
    /// Overrides the store-wide latency for this collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Store configuration loaded from `recstore.toml`.
///
/// # Example
///
/// ```toml
/// # Artificial latency applied to every operation, in milliseconds
/// latency_ms = 0
///
/// [collections.users]
/// unique_fields = ["email"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Artificial latency for every collection, in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
    /// Per-collection settings keyed by collection name.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

impl StoreConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# recstore configuration
#
# Artificial latency applied to every operation, in milliseconds (default: 0).
# Operations wait this long before running; a canceled or expired context
# ends the wait early.
latency_ms = 0

# Per-collection settings.
# [collections.users]
# unique_fields = ["email"]   # values must not repeat across records
# latency_ms = 50             # optional, overrides the global latency
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::InvalidInput(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Encode(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Options for the collection called `name`
    pub fn collection_options(&self, name: &str) -> CollectionOptions {
        let entry = self.collections.get(name);
        let latency_ms = entry
            .and_then(|c| c.latency_ms)
            .unwrap_or(self.latency_ms);

        let mut options = CollectionOptions::new();
        if latency_ms > 0 {
            options = options.with_latency(Duration::from_millis(latency_ms));
        }
        if let Some(entry) = entry {
            for field in &entry.unique_fields {
                options = options.with_unique_field(field.clone());
            }
        }
        options
    }
}
