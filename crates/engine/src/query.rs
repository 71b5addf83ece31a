//! Query execution: filter → sort → paginate over a record table
//!
//! The executor borrows the table; it never locks. Callers hold the
//! collection guard (read mode for `find`, write mode for the uniqueness
//! check inside `insert`).

use recstore_core::{Predicate, Record, Result, SortSpec};
use recstore_storage::RecordTable;
use tracing::debug;

/// Result of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryView {
    /// Number of records matching the predicate, before pagination
    pub total: usize,
    /// Page that was served (pages below 1 are served as page 1)
    pub page: usize,
    /// Records on the page, as independent copies
    pub records: Vec<Record>,
}

impl QueryView {
    /// True if the page holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids of the records on the page, in order
    pub fn ids(&self) -> Vec<recstore_core::RecordId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }
}

/// Runs queries against a borrowed table
pub struct QueryExecutor<'a> {
    table: &'a RecordTable,
}

impl<'a> QueryExecutor<'a> {
    /// Executor over `table`
    pub fn new(table: &'a RecordTable) -> Self {
        QueryExecutor { table }
    }

    /// Records matching `predicate`, in insertion order
    pub fn filter(&self, predicate: &dyn Predicate) -> Result<Vec<Record>> {
        let mut matched = Vec::new();
        for record in self.table.iter() {
            let record = record?;
            if predicate.matches(&record.payload) {
                matched.push(record);
            }
        }
        Ok(matched)
    }

    /// Filter, sort, then cut out one page
    ///
    /// `per_page == 0` returns every match. Pages are 1-based; 0 is served
    /// as page 1. A page past the end is empty, `total` still counts every
    /// match.
    pub fn execute(
        &self,
        predicate: &dyn Predicate,
        sort: &SortSpec,
        page: usize,
        per_page: usize,
    ) -> Result<QueryView> {
        let mut matched = self.filter(predicate)?;
        if !sort.is_empty() {
            // Vec::sort_by is stable; ties keep insertion order
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        let total = matched.len();
        let page = page.max(1);
        let records = paginate(matched, page, per_page);

        debug!(
            scanned = self.table.len(),
            total,
            page,
            per_page,
            returned = records.len(),
            "Executed query"
        );
        Ok(QueryView {
            total,
            page,
            records,
        })
    }
}

fn paginate(mut records: Vec<Record>, page: usize, per_page: usize) -> Vec<Record> {
    if per_page == 0 {
        return records;
    }
    let start = (page - 1).saturating_mul(per_page);
    if start >= records.len() {
        return Vec::new();
    }
    let end = start.saturating_add(per_page).min(records.len());
    records.truncate(end);
    records.drain(..start);
    records
}
