//! Redb backend for durable embedding storage.
//!
//! Redb is a pure Rust, ACID embedded key-value store. Every
//! [`replace_all`](crate::StoreBackend::replace_all) drops and refills the
//! embeddings table inside one write transaction, so readers see either the
//! previous snapshot or the new one, never a mix.
//!
//! ```yaml
//! store:
//!   backend: redb
//!   path: "./data/embeddings.redb"
//! ```

use crate::{BackendError, StoreBackend};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableError};
use std::path::Path;
use std::sync::Arc;

const EMBEDDINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("image_embeddings");

/// Redb-backed persistence. The table only exists once something was saved,
/// which is how [`exists`](StoreBackend::exists) tells "never saved" apart
/// from "saved an empty store".
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create a database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let db = Database::create(path).map_err(BackendError::new)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreBackend for RedbBackend {
    fn replace_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), BackendError> {
        let write_txn = self.db.begin_write().map_err(BackendError::new)?;
        write_txn
            .delete_table(EMBEDDINGS_TABLE)
            .map_err(BackendError::new)?;
        {
            let mut table = write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(BackendError::new)?;
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(BackendError::new)?;
            }
        }
        write_txn.commit().map_err(BackendError::new)?;
        Ok(())
    }

    fn scan(&self, visitor: &mut dyn FnMut(&str, &[u8])) -> Result<(), BackendError> {
        let read_txn = self.db.begin_read().map_err(BackendError::new)?;
        let table = match read_txn.open_table(EMBEDDINGS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(err) => return Err(BackendError::new(err)),
        };

        for item in table.iter().map_err(BackendError::new)? {
            let (key, value) = item.map_err(BackendError::new)?;
            visitor(key.value(), value.value());
        }
        Ok(())
    }

    fn exists(&self) -> Result<bool, BackendError> {
        let read_txn = self.db.begin_read().map_err(BackendError::new)?;
        match read_txn.open_table(EMBEDDINGS_TABLE) {
            Ok(_) => Ok(true),
            Err(TableError::TableDoesNotExist(_)) => Ok(false),
            Err(err) => Err(BackendError::new(err)),
        }
    }
}
