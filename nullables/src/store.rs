//! Nullable store: thread-safe in-memory transactional storage for testing.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use veil_store::{ReadTxn, RowWriter, Store, StoreError, Table, WriteTxn};

type Rows = BTreeMap<(Table, Vec<u8>), Vec<u8>>;

const NO_LIMIT: usize = usize::MAX;

/// An in-memory [`Store`] with snapshot reads and all-or-nothing commits.
///
/// Write transactions are serialized. Each works on a private copy of the
/// rows that replaces the committed rows only on commit, so dropping a
/// transaction leaves nothing behind.
pub struct NullStore {
    rows: Mutex<Rows>,
    writer: Mutex<()>,
    writes_left: AtomicUsize,
    commits: AtomicUsize,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Rows::new()),
            writer: Mutex::new(()),
            writes_left: AtomicUsize::new(NO_LIMIT),
            commits: AtomicUsize::new(0),
        }
    }

    /// Let the next `n` row writes succeed, then fail every following one
    /// with [`StoreError::Backend`].
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.store(n, Ordering::SeqCst);
    }

    /// Remove any injected failure.
    pub fn heal(&self) {
        self.writes_left.store(NO_LIMIT, Ordering::SeqCst);
    }

    /// Number of committed write transactions.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of committed rows in `table`.
    pub fn row_count(&self, table: Table) -> usize {
        self.rows
            .lock()
            .map(|rows| rows.keys().filter(|(t, _)| *t == table).count())
            .unwrap_or(0)
    }

    fn snapshot(&self) -> Result<Rows, StoreError> {
        Ok(lock(&self.rows)?.clone())
    }

    fn consume_write(&self) -> Result<(), StoreError> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == NO_LIMIT {
            return Ok(());
        }
        if left == 0 {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        self.writes_left.store(left - 1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend("null store lock poisoned".into()))
}

fn get_in(rows: &Rows, table: Table, key: &[u8]) -> Option<Vec<u8>> {
    rows.get(&(table, key.to_vec())).cloned()
}

fn scan_in(rows: &Rows, table: Table, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    rows.range((Bound::Included((table, prefix.to_vec())), Bound::Unbounded))
        .take_while(|((t, key), _)| *t == table && key.starts_with(prefix))
        .map(|((_, key), value)| (key.clone(), value.clone()))
        .collect()
}

struct NullReadTxn {
    rows: Rows,
}

impl ReadTxn for NullReadTxn {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(get_in(&self.rows, table, key))
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(scan_in(&self.rows, table, prefix))
    }
}

struct NullWriteTxn<'a> {
    store: &'a NullStore,
    working: Rows,
    _writer: MutexGuard<'a, ()>,
}

impl ReadTxn for NullWriteTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(get_in(&self.working, table, key))
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(scan_in(&self.working, table, prefix))
    }
}

impl RowWriter for NullWriteTxn<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.store.consume_write()?;
        self.working.insert((table, key.to_vec()), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        self.store.consume_write()?;
        Ok(self.working.remove(&(table, key.to_vec())).is_some())
    }
}

impl WriteTxn for NullWriteTxn<'_> {
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let NullWriteTxn {
            store,
            working,
            _writer,
        } = *self;
        *lock(&store.rows)? = working;
        store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Store for NullStore {
    fn read_txn(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError> {
        Ok(Box::new(NullReadTxn {
            rows: self.snapshot()?,
        }))
    }

    fn write_txn(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError> {
        let writer = lock(&self.writer)?;
        Ok(Box::new(NullWriteTxn {
            store: self,
            working: self.snapshot()?,
            _writer: writer,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_writes_are_visible() {
        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Contact, b"k", b"v").unwrap();
        txn.commit().unwrap();

        let read = store.read_txn().unwrap();
        assert_eq!(read.get(Table::Contact, b"k").unwrap().unwrap(), b"v");
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let store = NullStore::new();
        {
            let mut txn = store.write_txn().unwrap();
            txn.put(Table::Contact, b"k", b"v").unwrap();
        }
        assert!(store.read_txn().unwrap().get(Table::Contact, b"k").unwrap().is_none());
    }

    #[test]
    fn scan_is_confined_to_table_and_prefix() {
        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Contact, b"ab1", b"1").unwrap();
        txn.put(Table::Contact, b"ab2", b"2").unwrap();
        txn.put(Table::Contact, b"ac", b"3").unwrap();
        txn.put(Table::ContactDetails, b"ab3", b"4").unwrap();
        let rows = txn.scan_prefix(Table::Contact, b"ab").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, b"ab1");
        assert_eq!(rows[1].0, b"ab2");
    }

    #[test]
    fn injected_failure_hits_after_budget() {
        let store = NullStore::new();
        store.fail_writes_after(1);
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Contact, b"a", b"1").unwrap();
        assert!(matches!(
            txn.put(Table::Contact, b"b", b"2"),
            Err(StoreError::Backend(_))
        ));
        drop(txn);
        store.heal();
        assert_eq!(store.row_count(Table::Contact), 0);
    }

    #[test]
    fn undecodable_row_is_reported_as_corruption() {
        use veil_store::ReadExt;

        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::Contact, b"k", &[1]).unwrap();
        txn.commit().unwrap();

        let read = store.read_txn().unwrap();
        match read.get_row::<u64>(Table::Contact, b"k") {
            Err(StoreError::Corruption(reason)) => assert!(reason.starts_with("contact:"), "{reason}"),
            other => panic!("expected corruption, got {other:?}"),
        }
        assert!(matches!(
            read.scan_rows::<u64>(Table::Contact, b""),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn delete_reports_presence() {
        let store = NullStore::new();
        let mut txn = store.write_txn().unwrap();
        txn.put(Table::GroupV1, b"g", b"1").unwrap();
        assert!(txn.delete(Table::GroupV1, b"g").unwrap());
        assert!(!txn.delete(Table::GroupV1, b"g").unwrap());
    }
}
