//! Collection engine for recstore
//!
//! This crate orchestrates the lower layers:
//! - Collection: guarded record table with the persist-then-reload cycle
//! - Query execution: filter, sort, paginate
//! - Context and latency injection: cancellable artificial delay
//! - Database: directory of collections configured by `recstore.toml`
//!
//! The engine is the only component that knows about:
//! - Locking (one reader/writer lock per collection)
//! - Uniqueness constraints
//! - When a snapshot is written

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod context;
pub mod database;
pub mod latency;
pub mod query;

pub use collection::{validate_name, Collection, CollectionOptions};
pub use config::{CollectionConfig, StoreConfig, CONFIG_FILE_NAME};
pub use context::Context;
pub use database::Database;
pub use latency::LatencyInjector;
pub use query::{QueryExecutor, QueryView};
