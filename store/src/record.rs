//! Typed rows on top of the byte-level transaction traits.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ReadTxn, RowWriter, StoreError, Table};

/// A row type stored in a fixed table under a key derived from its fields.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: Table;

    fn key(&self) -> Vec<u8>;
}

pub fn encode<R: Serialize + ?Sized>(row: &R) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a stored row. Bytes that do not decode are reported as
/// [`StoreError::Corruption`].
pub fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Corruption(e.to_string()))
}

fn in_table(table: Table, error: StoreError) -> StoreError {
    match error {
        StoreError::Corruption(reason) => StoreError::Corruption(format!("{}: {reason}", table.name())),
        other => other,
    }
}

/// Typed reads, available on every [`ReadTxn`] (including `dyn ReadTxn`).
pub trait ReadExt: ReadTxn {
    fn get_row<R: DeserializeOwned>(
        &self,
        table: Table,
        key: &[u8],
    ) -> Result<Option<R>, StoreError> {
        self.get(table, key)?
            .map(|bytes| decode(&bytes).map_err(|e| in_table(table, e)))
            .transpose()
    }

    fn scan_rows<R: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<R>, StoreError> {
        self.scan_prefix(table, prefix)?
            .into_iter()
            .map(|(_, value)| decode(&value).map_err(|e| in_table(table, e)))
            .collect()
    }

    fn get_record<R: Record>(&self, key: &[u8]) -> Result<Option<R>, StoreError> {
        self.get_row(R::TABLE, key)
    }

    fn scan_records<R: Record>(&self, prefix: &[u8]) -> Result<Vec<R>, StoreError> {
        self.scan_rows(R::TABLE, prefix)
    }

    fn contains_record<R: Record>(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(R::TABLE, key)?.is_some())
    }
}

impl<T: ReadTxn + ?Sized> ReadExt for T {}

/// Typed writes, available on every [`RowWriter`].
pub trait WriteExt: RowWriter {
    fn put_row<R: Serialize>(&mut self, table: Table, key: &[u8], row: &R) -> Result<(), StoreError> {
        let bytes = encode(row)?;
        self.put(table, key, &bytes)
    }

    fn put_record<R: Record>(&mut self, row: &R) -> Result<(), StoreError> {
        self.put_row(R::TABLE, &row.key(), row)
    }

    fn delete_record<R: Record>(&mut self, key: &[u8]) -> Result<bool, StoreError> {
        self.delete(R::TABLE, key)
    }

    /// Delete every row of `table` under `prefix`; returns how many went.
    fn delete_prefix(&mut self, table: Table, prefix: &[u8]) -> Result<usize, StoreError> {
        let rows = self.scan_prefix(table, prefix)?;
        for (key, _) in &rows {
            self.delete(table, key)?;
        }
        Ok(rows.len())
    }
}

impl<T: RowWriter + ?Sized> WriteExt for T {}
