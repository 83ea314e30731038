//! Read and write transactions over the LMDB environment.
//!
//! A write transaction dropped without [`WriteTxn::commit`] is aborted by
//! heed, which is exactly the rollback the engines rely on.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};
use veil_store::{ReadTxn, RowWriter, StoreError, Table, WriteTxn};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

fn get_in(
    db: Database<Bytes, Bytes>,
    txn: &RoTxn,
    key: &[u8],
) -> Result<Option<Vec<u8>>, StoreError> {
    let value = db.get(txn, key).map_err(LmdbError::from)?;
    Ok(value.map(|v| v.to_vec()))
}

fn scan_in(
    db: Database<Bytes, Bytes>,
    txn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
    let mut out = Vec::new();
    // LMDB rejects zero-length keys, so an empty prefix is a full scan
    if prefix.is_empty() {
        for item in db.iter(txn).map_err(LmdbError::from)? {
            let (key, value) = item.map_err(LmdbError::from)?;
            out.push((key.to_vec(), value.to_vec()));
        }
        return Ok(out);
    }
    for item in db.prefix_iter(txn, prefix).map_err(LmdbError::from)? {
        let (key, value) = item.map_err(LmdbError::from)?;
        out.push((key.to_vec(), value.to_vec()));
    }
    Ok(out)
}

pub struct LmdbReadTxn<'e> {
    env: &'e LmdbEnvironment,
    txn: RoTxn<'e>,
}

impl<'e> LmdbReadTxn<'e> {
    pub(crate) fn new(env: &'e LmdbEnvironment, txn: RoTxn<'e>) -> Self {
        Self { env, txn }
    }
}

impl ReadTxn for LmdbReadTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        get_in(self.env.db(table), &self.txn, key)
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        scan_in(self.env.db(table), &self.txn, prefix)
    }
}

pub struct LmdbWriteTxn<'e> {
    env: &'e LmdbEnvironment,
    txn: RwTxn<'e>,
}

impl<'e> LmdbWriteTxn<'e> {
    pub(crate) fn new(env: &'e LmdbEnvironment, txn: RwTxn<'e>) -> Self {
        Self { env, txn }
    }
}

impl ReadTxn for LmdbWriteTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        get_in(self.env.db(table), &self.txn, key)
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        scan_in(self.env.db(table), &self.txn, prefix)
    }
}

impl RowWriter for LmdbWriteTxn<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.env
            .db(table)
            .put(&mut self.txn, key, value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        let removed = self
            .env
            .db(table)
            .delete(&mut self.txn, key)
            .map_err(LmdbError::from)?;
        Ok(removed)
    }
}

impl WriteTxn for LmdbWriteTxn<'_> {
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use veil_store::{KeyBuilder, ReadExt, Record, Store, WriteExt};
    use veil_types::Identity;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        owner: Identity,
        n: u64,
    }

    impl Record for Row {
        const TABLE: Table = Table::Contact;

        fn key(&self) -> Vec<u8> {
            KeyBuilder::new().identity(&self.owner).u64(self.n).build()
        }
    }

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    #[test]
    fn committed_rows_are_readable() {
        let (_dir, env) = temp_env();
        let row = Row {
            owner: Identity::new([1u8; 32]),
            n: 7,
        };

        let mut txn = env.write_txn().expect("write_txn");
        txn.put_record(&row).expect("put");
        txn.commit().expect("commit");

        let read = env.read_txn().expect("read_txn");
        let stored: Option<Row> = read.get_record(&row.key()).expect("get");
        assert_eq!(stored, Some(row));
    }

    #[test]
    fn dropped_txn_does_not_persist() {
        let (_dir, env) = temp_env();
        let row = Row {
            owner: Identity::new([2u8; 32]),
            n: 1,
        };

        {
            let mut txn = env.write_txn().expect("write_txn");
            txn.put_record(&row).expect("put");
        }

        let read = env.read_txn().expect("read_txn");
        assert!(!read.contains_record::<Row>(&row.key()).expect("get"));
    }

    #[test]
    fn prefix_scan_is_scoped_and_ordered() {
        let (_dir, env) = temp_env();
        let a = Identity::new([1u8; 32]);
        let b = Identity::new([2u8; 32]);

        let mut txn = env.write_txn().expect("write_txn");
        for n in [3u64, 1, 2] {
            txn.put_record(&Row { owner: a, n }).expect("put");
        }
        txn.put_record(&Row { owner: b, n: 0 }).expect("put");
        txn.commit().expect("commit");

        let read = env.read_txn().expect("read_txn");
        let rows: Vec<Row> = read
            .scan_records(&KeyBuilder::new().identity(&a).build())
            .expect("scan");
        let ns: Vec<u64> = rows.iter().map(|r| r.n).collect();
        assert_eq!(ns, vec![1, 2, 3]);
    }

    #[test]
    fn delete_reports_presence() {
        let (_dir, env) = temp_env();
        let row = Row {
            owner: Identity::new([4u8; 32]),
            n: 9,
        };
        let mut txn = env.write_txn().expect("write_txn");
        txn.put_record(&row).expect("put");
        assert!(txn.delete_record::<Row>(&row.key()).expect("delete"));
        assert!(!txn.delete_record::<Row>(&row.key()).expect("delete"));
        txn.commit().expect("commit");
    }

    #[test]
    fn session_commit_returns_events() {
        let (_dir, env) = temp_env();
        let owned = Identity::new([5u8; 32]);
        let mut session = env.begin().expect("begin");
        session
            .put_record(&Row { owner: owned, n: 0 })
            .expect("put");
        session.emit(veil_types::ChangeEvent::ContactAdded {
            owned,
            contact: owned,
        });
        let events = session.commit().expect("commit");
        assert_eq!(events.len(), 1);
    }
}
