#![forbid(unsafe_code)]

use std::ops::Bound;
use std::path::Path;

use gstate_contracts::wire::SeekRequest;
use gstate_contracts::Validate;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition};
use thiserror::Error;
use tracing::debug;

use crate::repo::{GlobalStateRepo, SeekResult};

const GLOBAL_STATE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("global_state");

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database open failed: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("table open failed: {0}")]
    Table(#[from] redb::TableError),
    #[error("engine error: {0}")]
    Engine(#[from] redb::StorageError),
    #[error("commit failed: {0}")]
    Commit(#[from] redb::CommitError),
}

/// Canonical global-state storage on the owning instance.
///
/// Each primitive runs in its own redb transaction; concurrent callers are isolated by the
/// engine (readers see a snapshot, writers serialize).
pub struct LocalStore {
    db: Database,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening global state database");
        Self::with_database(Database::create(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_database(Database::builder().create_with_backend(InMemoryBackend::new())?)
    }

    fn with_database(db: Database) -> Result<Self, StorageError> {
        // Create the table up front so read transactions never see it missing.
        let txn = db.begin_write()?;
        txn.open_table(GLOBAL_STATE)?;
        txn.commit()?;
        Ok(Self { db })
    }
}

impl GlobalStateRepo for LocalStore {
    type Error = StorageError;

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(GLOBAL_STATE)?;
        let value = table.get(key)?;
        Ok(value.map(|v| v.value().to_vec()).unwrap_or_default())
    }

    fn batch_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, StorageError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(GLOBAL_STATE)?;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = table.get(key.as_slice())?;
            values.push(value.map(|v| v.value().to_vec()).unwrap_or_default());
        }
        Ok(values)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(GLOBAL_STATE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(GLOBAL_STATE)?;
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Forward scans start at `start_prefix`. Reverse scans start at the last key that has
    /// `start_prefix` as a prefix, so a bare kind prefix walks the whole kind newest-first.
    /// Both stop at the first key outside `valid_for_prefix`. A start key outside that prefix,
    /// or a `max_key_len` shorter than it, admits nothing and yields an empty result.
    fn seek(&self, request: &SeekRequest) -> Result<SeekResult, StorageError> {
        let limit = request.num_to_fetch as usize;
        let mut out = SeekResult::default();
        if limit == 0 || request.validate().is_err() {
            return Ok(out);
        }

        let txn = self.db.begin_read()?;
        let table = txn.open_table(GLOBAL_STATE)?;
        let start = request.start_prefix.as_slice();
        let upper = prefix_successor(start);
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = if request.reverse {
            match upper.as_deref() {
                Some(upper) => (Bound::Unbounded, Bound::Excluded(upper)),
                None => (Bound::Unbounded, Bound::Unbounded),
            }
        } else {
            (Bound::Included(start), Bound::Unbounded)
        };

        let mut range = table.range::<&[u8]>(bounds)?;
        loop {
            let entry = if request.reverse {
                range.next_back()
            } else {
                range.next()
            };
            let Some(entry) = entry else {
                break;
            };
            let (key, value) = entry?;
            let key = key.value();
            if !request.admits(key) {
                break;
            }
            out.keys.push(key.to_vec());
            if request.fetch_values {
                out.values.push(value.value().to_vec());
            }
            if out.keys.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}

/// Smallest byte string greater than every string starting with `prefix`, or `None` when
/// no such string exists (empty or all-0xff prefix).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}
