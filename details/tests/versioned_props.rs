//! Properties of the versioned details state machine under arbitrary
//! operation sequences.

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use veil_details::versioned::{self, DetailsUpdate};
use veil_details::{DetailsSubject, IncomingDetails};
use veil_nullables::{NullEntropy, NullStore};
use veil_store::{KeyBuilder, Record, Store, Table};
use veil_types::{Identity, SubjectRef, Timestamp};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Owned {
    identity: Identity,
    published: i32,
    latest: i32,
}

impl Record for Owned {
    const TABLE: Table = Table::OwnedIdentity;

    fn key(&self) -> Vec<u8> {
        KeyBuilder::new().identity(&self.identity).build()
    }
}

impl DetailsSubject for Owned {
    const DETAILS_TABLE: Table = Table::OwnedIdentityDetails;

    fn details_prefix(&self) -> Vec<u8> {
        self.key()
    }

    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::OwnedIdentity(self.identity)
    }

    fn published_version(&self) -> i32 {
        self.published
    }

    fn trusted_version(&self) -> i32 {
        self.latest
    }

    fn set_versions(&mut self, published: i32, trusted: i32) {
        self.published = published;
        self.latest = trusted;
    }
}

const PAYLOADS: [&str; 3] = [
    r#"{"first_name":"Ada"}"#,
    r#"{"first_name":"Bea"}"#,
    r#"{"first_name":"Cy"}"#,
];

#[derive(Clone, Debug)]
enum Op {
    Published {
        version: i32,
        payload: usize,
        allow_downgrade: bool,
    },
    Trust,
    Draft(usize),
    PublishDraft,
    Discard,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i32..8, 0usize..3, any::<bool>()).prop_map(|(version, payload, allow_downgrade)| {
            Op::Published {
                version,
                payload,
                allow_downgrade,
            }
        }),
        Just(Op::Trust),
        (0usize..3).prop_map(Op::Draft),
        Just(Op::PublishDraft),
        Just(Op::Discard),
    ]
}

fn fresh(store: &NullStore) -> Owned {
    let mut subject = Owned {
        identity: Identity::new([7u8; 32]),
        published: 0,
        latest: 0,
    };
    let mut session = store.begin().unwrap();
    versioned::create_initial(&mut session, &mut subject, 0, PAYLOADS[0], None).unwrap();
    session.commit().unwrap();
    subject
}

proptest! {
    #[test]
    fn only_the_two_live_versions_survive(ops in prop::collection::vec(op(), 1..25)) {
        let store = NullStore::new();
        let entropy = NullEntropy::counting();
        let mut subject = fresh(&store);

        for op in ops {
            let mut session = store.begin().unwrap();
            match op {
                Op::Published { version, payload, allow_downgrade } => {
                    versioned::update_published(
                        &mut session,
                        &mut subject,
                        IncomingDetails::new(version, PAYLOADS[payload]),
                        allow_downgrade,
                    ).unwrap();
                }
                Op::Trust => {
                    versioned::trust(&mut session, &mut subject).unwrap();
                }
                Op::Draft(payload) => {
                    versioned::set_draft(&mut session, &mut subject, PAYLOADS[payload], None).unwrap();
                }
                Op::PublishDraft => {
                    versioned::publish_draft(&mut session, &mut subject, &entropy, Timestamp::new(0)).unwrap();
                }
                Op::Discard => {
                    versioned::discard_draft(&mut session, &mut subject).unwrap();
                }
            }
            session.commit().unwrap();

            let read = store.read_txn().unwrap();
            let stored: BTreeSet<i32> = versioned::versions(&*read, &subject)
                .unwrap()
                .into_iter()
                .map(|row| row.version)
                .collect();
            let live: BTreeSet<i32> = [subject.published, subject.latest].into_iter().collect();
            prop_assert_eq!(stored, live);
        }
    }

    #[test]
    fn redelivered_details_change_nothing(
        start in 0i32..6,
        version in 0i32..6,
        payload in 0usize..3,
    ) {
        let store = NullStore::new();
        let mut subject = fresh(&store);
        let mut session = store.begin().unwrap();
        versioned::update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(start, PAYLOADS[0]),
            true,
        ).unwrap();
        session.commit().unwrap();

        let mut session = store.begin().unwrap();
        versioned::update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(version, PAYLOADS[payload]),
            true,
        ).unwrap();
        session.commit().unwrap();
        let before = (subject.published, subject.latest);

        let mut session = store.begin().unwrap();
        let again = versioned::update_published(
            &mut session,
            &mut subject,
            IncomingDetails::new(version, PAYLOADS[payload]),
            true,
        ).unwrap();
        prop_assert_eq!(again, DetailsUpdate::Unchanged);
        prop_assert!(session.commit().unwrap().is_empty());
        prop_assert_eq!((subject.published, subject.latest), before);
    }
}
