//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use veil_store::{ReadTxn, Store, StoreError, Table, WriteTxn};

use crate::transaction::{LmdbReadTxn, LmdbWriteTxn};
use crate::LmdbError;

/// Wraps the LMDB environment and one database handle per table.
pub struct LmdbEnvironment {
    env: Env,
    dbs: Vec<Database<Bytes, Bytes>>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating every
    /// table database that does not exist yet.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment directory is owned by this process; no
        // other code maps the same files with incompatible options.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut dbs = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(table.name()))?;
            dbs.push(db);
        }
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self { env, dbs })
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    pub(crate) fn db(&self, table: Table) -> Database<Bytes, Bytes> {
        self.dbs[table.index()]
    }
}

impl Store for LmdbEnvironment {
    fn read_txn(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError> {
        let txn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(Box::new(LmdbReadTxn::new(self, txn)))
    }

    fn write_txn(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError> {
        let txn = self.env.write_txn().map_err(LmdbError::from)?;
        Ok(Box::new(LmdbWriteTxn::new(self, txn)))
    }
}
