use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

/// Failures of the embedded metadata store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Metadata store error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Record decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Record encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

/// Every redb operation error widens into `redb::Error`.
macro_rules! redb_error {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for DatabaseError {
                fn from(e: $source) -> Self {
                    DatabaseError::Redb(Box::new(e.into()))
                }
            }
        )+
    };
}

redb_error!(
    redb::CommitError,
    redb::DatabaseError,
    redb::StorageError,
    redb::TableError,
    redb::TransactionError,
);

/// Catalog metadata store, cheap to clone
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Database {
    /// Open or create the catalog database inside `data_dir`, creating both tables
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("file-catalog.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(FILE_PATHS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }
}
