//! Abstract transactional row store for the veil trust core.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The engines depend only on the traits, and every mutating
//! operation takes a [`Session`]: the write transaction plus the events
//! it will emit once committed.

pub mod error;
pub mod key;
pub mod photo;
pub mod record;
pub mod session;
pub mod table;

pub use error::StoreError;
pub use key::KeyBuilder;
pub use photo::PhotoStore;
pub use record::{decode, encode, ReadExt, Record, WriteExt};
pub use session::{EventBatch, Session};
pub use table::Table;

/// Read access to a consistent snapshot of the store.
pub trait ReadTxn {
    /// Point lookup.
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// All rows whose key starts with `prefix`, in key order.
    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Row-level mutation inside a transaction.
pub trait RowWriter: ReadTxn {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Returns whether a row was actually removed.
    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError>;
}

/// A write transaction. Dropping it without calling [`WriteTxn::commit`]
/// rolls every write back.
pub trait WriteTxn: RowWriter {
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// A backend able to open transactions.
pub trait Store: Send + Sync {
    fn read_txn(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError>;

    fn write_txn(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError>;

    /// Open a write transaction wrapped in a fresh [`Session`].
    fn begin(&self) -> Result<Session<'_>, StoreError> {
        Ok(Session::new(self.write_txn()?))
    }
}
