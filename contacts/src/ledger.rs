//! Trust origins and the monotonic trust level derived from them.

use tracing::{debug, info};
use veil_store::{KeyBuilder, ReadExt, ReadTxn, Session, StoreError, WriteExt};
use veil_types::{ChangeEvent, Identity, TrustLevel};

use crate::contact::require_contact;
use crate::{ContactError, ContactRow, TrustLevelPolicy, TrustOrigin, TrustOriginRow};

fn origins_prefix(owned: &Identity, contact: &Identity) -> Vec<u8> {
    KeyBuilder::new().identity(owned).identity(contact).build()
}

/// Every origin recorded for a contact, in recording order.
pub fn origins<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
) -> Result<Vec<TrustOriginRow>, StoreError> {
    txn.scan_records(&origins_prefix(owned, contact))
}

pub fn trust_level<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
) -> Result<TrustLevel, ContactError> {
    Ok(require_contact(txn, owned, contact)?.trust_level)
}

/// Level an origin contributes right now. Mediated origins read the
/// mediator's current level; the result is stored with the origin and never
/// recomputed.
fn contribution<R: ReadTxn + ?Sized>(
    txn: &R,
    policy: &TrustLevelPolicy,
    owned: &Identity,
    origin: &TrustOrigin,
) -> Result<TrustLevel, StoreError> {
    use crate::TrustOriginKind::*;
    Ok(match &origin.kind {
        Direct => policy.direct,
        IdentityServer { .. } => policy.identity_server,
        ServerGroupV2 { .. } => policy.server_group_v2,
        Introduction { mediator } | Group { group_owner: mediator } => {
            let mediator_level = if mediator == owned {
                policy.direct
            } else {
                txn.get_record::<ContactRow>(&crate::contact_key(owned, mediator))?
                    .map(|row| row.trust_level)
                    .unwrap_or(TrustLevel::ZERO)
            };
            TrustLevelPolicy::mediated(mediator_level)
        }
    })
}

/// Record `origin` for `contact`. Returns false when an equal origin (same
/// kind and payload) was already recorded; direct origins are always kept.
pub fn add_origin(
    session: &mut Session<'_>,
    policy: &TrustLevelPolicy,
    owned: &Identity,
    contact: &Identity,
    origin: TrustOrigin,
) -> Result<bool, ContactError> {
    let mut row = require_contact(&*session, owned, contact)?;
    record_origin(session, policy, &mut row, origin)
}

pub(crate) fn record_origin(
    session: &mut Session<'_>,
    policy: &TrustLevelPolicy,
    row: &mut ContactRow,
    origin: TrustOrigin,
) -> Result<bool, ContactError> {
    let existing = origins(&*session, &row.owned, &row.contact)?;
    let duplicate = origin.kind != crate::TrustOriginKind::Direct
        && existing.iter().any(|known| known.origin.kind == origin.kind);
    if duplicate {
        debug!(contact = %row.contact, "trust origin already recorded");
        return Ok(false);
    }

    let level = contribution(&*session, policy, &row.owned, &origin)?;
    session.put_record(&TrustOriginRow {
        owned: row.owned,
        contact: row.contact,
        seq: existing.len() as u64,
        origin,
        level,
    })?;

    if level > row.trust_level {
        info!(contact = %row.contact, from = %row.trust_level, to = %level, "trust level increased");
        row.trust_level = level;
        session.put_record(&*row)?;
        session.emit(ChangeEvent::TrustLevelIncreased {
            owned: row.owned,
            contact: row.contact,
            level,
        });
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::create_contact;
    use crate::TrustOriginKind;
    use veil_nullables::NullStore;
    use veil_store::Store;
    use veil_types::Timestamp;

    const DETAILS: &str = r#"{"first_name":"Bea"}"#;

    fn id(b: u8) -> Identity {
        Identity::new([b; 32])
    }

    fn group_origin(owner: Identity, at: u64) -> TrustOrigin {
        TrustOrigin::new(
            Timestamp::new(at),
            TrustOriginKind::Group { group_owner: owner },
        )
    }

    #[test]
    fn equal_group_origins_are_recorded_once() {
        let store = NullStore::new();
        let policy = TrustLevelPolicy::default();
        let (me, mediator, bob) = (id(1), id(2), id(3));
        let mut session = store.begin().unwrap();
        create_contact(&mut session, &policy, &me, &mediator, DETAILS, TrustOrigin::direct(Timestamp::new(1)), true).unwrap();
        create_contact(&mut session, &policy, &me, &bob, DETAILS, group_origin(mediator, 5), false).unwrap();

        assert!(!add_origin(&mut session, &policy, &me, &bob, group_origin(mediator, 5)).unwrap());
        assert_eq!(origins(&session, &me, &bob).unwrap().len(), 1);
    }

    #[test]
    fn direct_origins_are_never_deduplicated() {
        let store = NullStore::new();
        let policy = TrustLevelPolicy::default();
        let (me, bob) = (id(1), id(3));
        let mut session = store.begin().unwrap();
        create_contact(&mut session, &policy, &me, &bob, DETAILS, TrustOrigin::direct(Timestamp::new(1)), true).unwrap();
        assert!(add_origin(&mut session, &policy, &me, &bob, TrustOrigin::direct(Timestamp::new(1))).unwrap());
        assert_eq!(origins(&session, &me, &bob).unwrap().len(), 2);
    }

    #[test]
    fn mediated_level_is_snapshotted() {
        let store = NullStore::new();
        let policy = TrustLevelPolicy::default();
        let (me, mediator, bob) = (id(1), id(2), id(3));
        let mut session = store.begin().unwrap();
        create_contact(
            &mut session,
            &policy,
            &me,
            &mediator,
            DETAILS,
            TrustOrigin::new(
                Timestamp::new(1),
                TrustOriginKind::ServerGroupV2 {
                    group: veil_types::GroupV2Identifier::new(
                        veil_types::Uid::new([9u8; 32]),
                        "https://server",
                        veil_types::GroupV2Category::Server,
                    ),
                },
            ),
            false,
        )
        .unwrap();
        let introduced = TrustOrigin::new(
            Timestamp::new(2),
            TrustOriginKind::Introduction { mediator },
        );
        create_contact(&mut session, &policy, &me, &bob, DETAILS, introduced, false).unwrap();
        assert_eq!(trust_level(&session, &me, &bob).unwrap(), TrustLevel::new(0, 2));

        // raising the mediator later does not touch what bob already got
        add_origin(&mut session, &policy, &me, &mediator, TrustOrigin::direct(Timestamp::new(3))).unwrap();
        assert_eq!(trust_level(&session, &me, &mediator).unwrap(), policy.direct);
        assert_eq!(trust_level(&session, &me, &bob).unwrap(), TrustLevel::new(0, 2));
        assert_eq!(origins(&session, &me, &bob).unwrap()[0].level, TrustLevel::new(0, 2));
    }

    #[test]
    fn raising_the_level_is_announced_once() {
        let store = NullStore::new();
        let policy = TrustLevelPolicy::default();
        let (me, bob) = (id(1), id(3));
        let mut session = store.begin().unwrap();
        create_contact(
            &mut session,
            &policy,
            &me,
            &bob,
            DETAILS,
            TrustOrigin::new(
                Timestamp::new(1),
                TrustOriginKind::IdentityServer {
                    server: "https://id.example".into(),
                },
            ),
            false,
        )
        .unwrap();
        add_origin(&mut session, &policy, &me, &bob, TrustOrigin::direct(Timestamp::new(2))).unwrap();
        add_origin(&mut session, &policy, &me, &bob, group_origin(me, 3)).unwrap();
        let raised: Vec<_> = session
            .commit()
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e, ChangeEvent::TrustLevelIncreased { .. }))
            .collect();
        assert_eq!(raised.len(), 2);
        assert_eq!(
            trust_level(&*store.read_txn().unwrap(), &me, &bob).unwrap(),
            policy.direct
        );
    }
}
