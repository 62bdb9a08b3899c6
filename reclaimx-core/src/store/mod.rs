//! Record storage layer
//!
//! A table is a sequence of homogeneous, fixed-schema records. This module
//! provides:
//! - The [`Record`] trait describing a table's schema
//! - The [`RecordStore`] trait that services program against
//! - [`CsvStore`], the durable flat-file implementation
//! - [`MemoryStore`], an in-process implementation for tests and embedding
//!
//! All mutations go through [`RecordStore::transact`] or the single-step
//! helpers built on the same exclusive lock, so a read-modify-write never
//! interleaves with another writer on the same table.

pub mod csv_store;
mod lock;
pub mod memory;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// A strongly typed table row.
///
/// Field serialization order must match [`Record::COLUMNS`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name, used in diagnostics
    const TABLE: &'static str;
    /// Ordered column list written as the header row
    const COLUMNS: &'static [&'static str];
    /// Bumped whenever `COLUMNS` changes
    const SCHEMA_VERSION: u32;
}

/// A row that could not be decoded during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the backing file (header is line 1)
    pub line: u64,
    pub reason: String,
}

/// Result of a full table load.
#[derive(Debug, Clone)]
pub struct Scan<T> {
    /// Decoded records in insertion order
    pub records: Vec<T>,
    /// Rows skipped as malformed
    pub skipped: Vec<SkippedRow>,
}

impl<T> Default for Scan<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Change applied at the end of a [`RecordStore::transact`] cycle.
#[derive(Debug, Clone)]
pub enum Mutation<T> {
    /// Leave the table untouched
    None,
    /// Add one row at the end
    Append(T),
    /// Add several rows at the end, in order
    AppendAll(Vec<T>),
    /// Replace every decoded row. Rows the store could not decode stay put.
    Rewrite(Vec<T>),
}

/// Durable table abstraction.
///
/// Services are generic over this trait so an indexed backend can replace the
/// flat file without changing their contracts.
pub trait RecordStore<T: Record>: Send + Sync {
    /// Loads every row, reporting malformed rows instead of failing.
    fn scan(&self) -> Result<Scan<T>>;

    /// Loads every row in insertion order, skipping malformed rows.
    fn load_all(&self) -> Result<Vec<T>> {
        self.scan().map(|scan| scan.records)
    }

    /// Durably adds one row.
    fn append(&self, record: &T) -> Result<()> {
        self.transact(|_| Ok((Mutation::Append(record.clone()), ())))
    }

    /// Atomically replaces the table contents, undecodable rows included.
    fn rewrite_all(&self, records: &[T]) -> Result<()> {
        self.transact(|_| Ok((Mutation::Rewrite(records.to_vec()), ())))
    }

    /// Runs a read-plan-write cycle under the table's exclusive lock.
    ///
    /// `plan` sees the current rows and returns the mutation to apply plus a
    /// value handed back to the caller. If `plan` fails nothing is written.
    fn transact<R, F>(&self, plan: F) -> Result<R>
    where
        F: FnOnce(&[T]) -> Result<(Mutation<T>, R)>;
}
