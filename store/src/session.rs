//! The per-transaction capability threaded through every mutating call.

use std::collections::HashSet;

use veil_types::ChangeEvent;

use crate::{ReadTxn, RowWriter, StoreError, Table, WriteTxn};

/// Events accumulated while a transaction runs.
///
/// Pushing an event equal to one already pending is a no-op, so observers
/// see each distinct change at most once per commit.
#[derive(Debug, Default)]
pub struct EventBatch {
    events: Vec<ChangeEvent>,
    seen: HashSet<ChangeEvent>,
}

impl EventBatch {
    pub fn push(&mut self, event: ChangeEvent) {
        if self.seen.insert(event.clone()) {
            self.events.push(event);
        }
    }

    pub fn as_slice(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.events
    }
}

/// A write transaction together with the events it will emit on commit.
///
/// Operations that must run atomically take `&mut Session`, so running them
/// outside a transaction does not type-check. Dropping a session (or calling
/// [`Session::rollback`]) discards both the writes and the events.
pub struct Session<'a> {
    txn: Box<dyn WriteTxn + 'a>,
    events: EventBatch,
}

impl<'a> Session<'a> {
    pub fn new(txn: Box<dyn WriteTxn + 'a>) -> Self {
        Self {
            txn,
            events: EventBatch::default(),
        }
    }

    pub fn emit(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> &[ChangeEvent] {
        self.events.as_slice()
    }

    /// Commit the transaction and hand back the events it produced.
    pub fn commit(self) -> Result<Vec<ChangeEvent>, StoreError> {
        let Session { txn, events } = self;
        txn.commit()?;
        Ok(events.into_events())
    }

    pub fn rollback(self) {}
}

impl ReadTxn for Session<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.txn.get(table, key)
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.txn.scan_prefix(table, prefix)
    }
}

impl RowWriter for Session<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.txn.put(table, key, value)
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        self.txn.delete(table, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_types::{Identity, SubjectRef};

    #[test]
    fn batch_coalesces_identical_events() {
        let subject = SubjectRef::OwnedIdentity(Identity::new([1u8; 32]));
        let mut batch = EventBatch::default();
        batch.push(ChangeEvent::NewPublishedDetails {
            subject: subject.clone(),
        });
        batch.push(ChangeEvent::NewPublishedDetails {
            subject: subject.clone(),
        });
        batch.push(ChangeEvent::MembershipChanged { subject });
        assert_eq!(batch.as_slice().len(), 2);
    }

    #[test]
    fn batch_keeps_emission_order() {
        let owned = Identity::new([1u8; 32]);
        let contact = Identity::new([2u8; 32]);
        let mut batch = EventBatch::default();
        batch.push(ChangeEvent::ContactAdded { owned, contact });
        batch.push(ChangeEvent::OneToOneChanged {
            owned,
            contact,
            one_to_one: true,
        });
        let events = batch.into_events();
        assert!(matches!(events[0], ChangeEvent::ContactAdded { .. }));
        assert!(matches!(events[1], ChangeEvent::OneToOneChanged { .. }));
    }
}
