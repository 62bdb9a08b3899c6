//! In-process table with the same locking contract as [`super::CsvStore`].

use super::{Mutation, Record, RecordStore, Scan};
use crate::error::Result;
use std::sync::{PoisonError, RwLock};

/// Non-durable [`RecordStore`] backed by a `Vec`.
#[derive(Debug)]
pub struct MemoryStore<T> {
    rows: RwLock<Vec<T>>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Store pre-populated with `rows`
    pub fn with_rows(rows: Vec<T>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn scan(&self) -> Result<Scan<T>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(Scan {
            records: rows.clone(),
            skipped: Vec::new(),
        })
    }

    fn transact<R, F>(&self, plan: F) -> Result<R>
    where
        F: FnOnce(&[T]) -> Result<(Mutation<T>, R)>,
    {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let (mutation, value) = plan(&rows)?;
        match mutation {
            Mutation::None => {}
            Mutation::Append(record) => rows.push(record),
            Mutation::AppendAll(records) => rows.extend(records),
            Mutation::Rewrite(records) => *rows = records,
        }
        Ok(value)
    }
}
