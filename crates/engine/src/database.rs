//! Database: a directory of named collections
//!
//! The database owns one snapshot backend and hands out one shared
//! [`Collection`] per name. Opening the same name twice returns the same
//! instance, so a single owner mutates each durable location within the
//! process.

use parking_lot::Mutex;
use recstore_core::Result;
use recstore_durability::DurableStore;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::collection::{validate_name, Collection};
use crate::config::{StoreConfig, CONFIG_FILE_NAME};

/// Registry of collections sharing one durable location
pub struct Database {
    dir: Option<PathBuf>,
    config: StoreConfig,
    store: DurableStore,
    collections: Mutex<FxHashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Open (or create) a database in `path`.
    ///
    /// Creates the directory and a default `recstore.toml` if missing, then
    /// reads settings from that file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dir = path.as_ref();
        std::fs::create_dir_all(dir)?;

        let config_path = dir.join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&config_path)?;
        let config = StoreConfig::from_file(&config_path)?;

        Self::open_with_config(dir, config)
    }

    /// Open a database in `path` with an explicit configuration.
    ///
    /// The supplied config is written to `recstore.toml` so later `open`
    /// calls pick up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        config.write_to_file(&dir.join(CONFIG_FILE_NAME))?;

        let store = DurableStore::file(&dir)?;
        info!(path = %dir.display(), latency_ms = config.latency_ms, "Opened database");

        Ok(Database {
            dir: Some(dir),
            config,
            store,
            collections: Mutex::new(FxHashMap::default()),
        })
    }

    /// A database whose snapshots live only in process memory
    pub fn ephemeral() -> Self {
        Self::ephemeral_with_config(StoreConfig::default())
    }

    /// In-memory database with explicit settings
    pub fn ephemeral_with_config(config: StoreConfig) -> Self {
        Database {
            dir: None,
            config,
            store: DurableStore::memory(),
            collections: Mutex::new(FxHashMap::default()),
        }
    }

    /// Directory holding snapshots and config, `None` when ephemeral
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The collection called `name`, opening it on first use
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        validate_name(name)?;

        let mut collections = self.collections.lock();
        if let Some(existing) = collections.get(name) {
            return Ok(Arc::clone(existing));
        }

        let options = self.config.collection_options(name);
        let collection = Arc::new(Collection::open(name, self.store.clone(), options)?);
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Names of collections opened so far, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dir", &self.dir)
            .field("collections", &self.collection_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;
    use crate::context::Context;
    use recstore_core::{ErrorKind, Payload, Record};
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_config() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).unwrap();
        assert!(temp_dir.path().join(CONFIG_FILE_NAME).exists());
        assert_eq!(db.config(), &StoreConfig::default());
        assert_eq!(db.path(), Some(temp_dir.path()));
    }

    #[test]
    fn test_same_name_same_instance() {
        let db = Database::ephemeral();
        let a = db.collection("users").unwrap();
        let b = db.collection("users").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        db.collection("orders").unwrap();
        assert_eq!(db.collection_names(), vec!["orders", "users"]);
    }

    #[test]
    fn test_bad_name_rejected() {
        let db = Database::ephemeral();
        let err = db.collection("../etc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(db.collection_names().is_empty());
    }

    #[test]
    fn test_config_applies_unique_fields() {
        let mut config = StoreConfig::default();
        config.collections.insert(
            "users".to_string(),
            CollectionConfig {
                unique_fields: vec!["email".to_string()],
                latency_ms: None,
            },
        );
        let db = Database::ephemeral_with_config(config);
        let users = db.collection("users").unwrap();
        let ctx = Context::background();

        users
            .insert(&ctx, vec![Record::new(1, "v", Payload::new()).with_field("email", "e")])
            .unwrap();
        let err = users
            .insert(&ctx, vec![Record::new(2, "v", Payload::new()).with_field("email", "e")])
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_reopen_sees_saved_records() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::background();
        {
            let db = Database::open(temp_dir.path()).unwrap();
            let users = db.collection("users").unwrap();
            users
                .insert(&ctx, vec![Record::new("u1", "v1", Payload::new())])
                .unwrap();
        }

        let db = Database::open(temp_dir.path()).unwrap();
        assert_eq!(db.collection("users").unwrap().len(), 1);
    }
}
