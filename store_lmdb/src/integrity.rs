//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before any reconciliation
//! touches the store.

use veil_store::Table;

use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

impl LmdbEnvironment {
    /// Count the entries of every table database. Read failures are
    /// recorded in the report rather than causing a hard error.
    pub fn check_integrity(&self) -> Result<IntegrityReport, LmdbError> {
        let mut report = IntegrityReport::default();
        let rtxn = self.env().read_txn()?;

        for table in Table::ALL {
            report.databases_checked += 1;
            match self.db(table).len(&rtxn) {
                Ok(count) => report.total_entries += count,
                Err(e) => report
                    .errors
                    .push(format!("failed to read table '{}': {}", table.name(), e)),
            }
        }

        if report.is_healthy() {
            tracing::debug!(
                databases = report.databases_checked,
                entries = report.total_entries,
                "LMDB integrity check passed"
            );
        } else {
            tracing::warn!(errors = report.errors.len(), "LMDB integrity check failed");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_store::{RowWriter, Store};

    #[test]
    fn fresh_environment_is_healthy() {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open");
        let report = env.check_integrity().expect("check");
        assert!(report.is_healthy());
        assert_eq!(report.databases_checked, Table::ALL.len() as u32);
        assert_eq!(report.total_entries, 0);
    }

    #[test]
    fn counts_entries_across_tables() {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open");
        let mut txn = env.write_txn().expect("write_txn");
        txn.put(Table::Contact, b"a", b"1").expect("put");
        txn.put(Table::GroupV2, b"b", b"2").expect("put");
        txn.commit().expect("commit");
        assert_eq!(env.check_integrity().expect("check").total_entries, 2);
    }
}
