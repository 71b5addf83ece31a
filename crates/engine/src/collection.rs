//! Collection: one named, independently persisted record table
//!
//! A collection owns its table behind a single reader/writer lock and its
//! durable location through a [`DurableStore`]. Every mutation follows the
//! same cycle while holding the write lock:
//!
//! 1. Apply the change to a working copy of the table
//! 2. Save the working copy as a full snapshot
//! 3. Load the snapshot back
//! 4. Swap the loaded table in
//!
//! If any step fails the live table is untouched, so memory always equals
//! what a restart would load.

use parking_lot::RwLock;
use recstore_core::{
    Error, Filter, Predicate, Record, RecordId, Result, SortSpec, Value,
};
use recstore_durability::DurableStore;
use recstore_storage::RecordTable;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::latency::LatencyInjector;
use crate::query::{QueryExecutor, QueryView};

/// Per-collection settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOptions {
    /// Artificial delay before every operation
    pub latency: Option<Duration>,
    /// Payload fields whose values must be unique across records
    ///
    /// Values are matched with the same equality as [`Filter`]: variants
    /// never match each other, so `Int(1)` and `Float(1.0)` are distinct
    /// values, and a `NaN` never repeats. Records missing the field, or
    /// holding `Null` in it, are not checked.
    pub unique_fields: Vec<String>,
}

impl CollectionOptions {
    /// Default options: no latency, no uniqueness constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the artificial delay
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a uniqueness constraint on `field`
    pub fn with_unique_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.unique_fields.contains(&field) {
            self.unique_fields.push(field);
        }
        self
    }
}

/// Check that `name` can name a durable location
///
/// Names are non-empty and limited to ASCII letters, digits, `_` and `-`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("collection name is empty".to_string()));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(Error::InvalidInput(format!(
            "collection name '{}' contains invalid character {:?}",
            name, c
        )));
    }
    Ok(())
}

/// A named, durable, concurrently accessible record collection
///
/// `Collection` is `Send + Sync`; share it behind an `Arc`.
pub struct Collection {
    name: String,
    store: DurableStore,
    options: CollectionOptions,
    latency: LatencyInjector,
    table: RwLock<RecordTable>,
}

impl Collection {
    /// Open `name` on `store`, loading its snapshot if one exists
    ///
    /// A collection seen for the first time gets an empty snapshot written
    /// immediately. A snapshot that fails to decode is an error; it is never
    /// replaced by an empty table.
    pub fn open(
        name: impl Into<String>,
        store: DurableStore,
        options: CollectionOptions,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;

        let table = match store.load(&name)? {
            Some(table) => {
                info!(
                    collection = %name,
                    location = %store.location(&name),
                    records = table.len(),
                    "Loaded collection"
                );
                table
            }
            None => {
                let table = RecordTable::new();
                store.save(&name, &table)?;
                info!(
                    collection = %name,
                    location = %store.location(&name),
                    "Created collection"
                );
                table
            }
        };

        Ok(Collection {
            latency: LatencyInjector::new(options.latency),
            name,
            store,
            options,
            table: RwLock::new(table),
        })
    }

    /// Open a collection whose snapshots live only in process memory
    pub fn ephemeral(name: impl Into<String>, options: CollectionOptions) -> Result<Self> {
        Self::open(name, DurableStore::memory(), options)
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Durable location of this collection's snapshot
    pub fn location(&self) -> String {
        self.store.location(&self.name)
    }

    /// Options the collection was opened with
    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// True if no records are stored
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert a batch of new records, all or nothing
    ///
    /// Fails with a conflict if any id is already stored or repeats within
    /// the batch, or if any record repeats a value of a unique field held by
    /// a stored record or an earlier record of the batch.
    pub fn insert(&self, ctx: &Context, records: Vec<Record>) -> Result<()> {
        let mut table = self.table.write();
        self.latency.run(ctx, || {
            if records.is_empty() {
                return Ok(());
            }
            let count = records.len();
            let mut working = table.clone();
            for record in records {
                if working.contains(&record.id) {
                    return Err(Error::DuplicateId { id: record.id });
                }
                self.check_unique(&working, &record)?;
                working.insert(vec![record])?;
            }
            *table = self.persist(&working)?;
            debug!(collection = %self.name, count, "Inserted records");
            Ok(())
        })
    }

    /// Replace `original` with `record`
    ///
    /// `original` identifies the target and carries the version tag the
    /// caller last saw. Fails with `NotFound` if the target is gone and with
    /// a conflict if its stored version tag differs.
    pub fn update(&self, ctx: &Context, record: Record, original: &Record) -> Result<()> {
        let mut table = self.table.write();
        self.latency.run(ctx, || {
            let mut working = table.clone();
            working.update(&original.id, &record, &original.version_tag)?;
            *table = self.persist(&working)?;
            debug!(collection = %self.name, id = %original.id, "Updated record");
            Ok(())
        })
    }

    /// Delete `record`, gated on its version tag
    pub fn delete(&self, ctx: &Context, record: &Record) -> Result<()> {
        let mut table = self.table.write();
        self.latency.run(ctx, || {
            let mut working = table.clone();
            working.delete(&record.id, &record.version_tag)?;
            *table = self.persist(&working)?;
            debug!(collection = %self.name, id = %record.id, "Deleted record");
            Ok(())
        })
    }

    /// Delete every record matching `predicate`, returning how many went
    ///
    /// Version tags are not checked. One snapshot is written per call, none
    /// if nothing matched.
    pub fn clear(&self, ctx: &Context, predicate: &dyn Predicate) -> Result<usize> {
        let mut table = self.table.write();
        self.latency.run(ctx, || {
            let ids: Vec<RecordId> = table.ids().to_vec();
            let mut working = table.clone();
            let mut removed = 0;
            for id in &ids {
                let record = match working.get(id)? {
                    Some(record) => record,
                    None => continue,
                };
                if predicate.matches(&record.payload) && working.remove(id) {
                    removed += 1;
                }
            }
            if removed > 0 {
                *table = self.persist(&working)?;
            }
            debug!(collection = %self.name, removed, "Cleared records");
            Ok(removed)
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Filter, sort and paginate the collection
    ///
    /// See [`QueryExecutor::execute`] for the pagination rules.
    pub fn find(
        &self,
        ctx: &Context,
        predicate: &dyn Predicate,
        sort: &SortSpec,
        page: usize,
        per_page: usize,
    ) -> Result<QueryView> {
        let table = self.table.read();
        self.latency.run(ctx, || {
            QueryExecutor::new(&table).execute(predicate, sort, page, per_page)
        })
    }

    /// Fetch one record by id
    pub fn get(&self, ctx: &Context, id: &RecordId) -> Result<Option<Record>> {
        let table = self.table.read();
        self.latency.run(ctx, || table.get(id))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Reject `record` if it repeats a unique field value already in `table`
    ///
    /// Runs on the table the caller already guards.
    fn check_unique(&self, table: &RecordTable, record: &Record) -> Result<()> {
        for field in &self.options.unique_fields {
            let value = match record.field(field) {
                Some(Value::Null) | None => continue,
                Some(value) => value,
            };
            let filter = Filter::new().eq(field.clone(), value.clone());
            let hit = QueryExecutor::new(table).execute(&filter, &SortSpec::none(), 1, 1)?;
            if hit.total > 0 {
                return Err(Error::UniqueViolation {
                    field: field.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Save `working`, then load it back as the new live table
    fn persist(&self, working: &RecordTable) -> Result<RecordTable> {
        self.store.save(&self.name, working)?;
        match self.store.load(&self.name)? {
            Some(table) => Ok(table),
            None => {
                warn!(collection = %self.name, "Snapshot missing right after save");
                Err(Error::Persistence(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("snapshot for collection '{}' missing after save", self.name),
                )))
            }
        }
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("location", &self.location())
            .field("options", &self.options)
            .finish()
    }
}
