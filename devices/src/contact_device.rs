use serde::{Deserialize, Serialize};
use tracing::debug;
use veil_contacts::contact::require_contact;
use veil_contacts::contact_key;
use veil_store::{ReadExt, ReadTxn, Record, Session, StoreError, Table, WriteExt};
use veil_types::{Identity, Timestamp, Uid};

use crate::record::serialize_capabilities;
use crate::{DeviceError, DeviceRecord, PreKey};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDeviceRow {
    pub owned: Identity,
    pub contact: Identity,
    pub device_uid: Uid,
    pub pre_key: Option<PreKey>,
    pub capabilities: String,
    pub added: Timestamp,
}

fn device_key(owned: &Identity, contact: &Identity, device_uid: &Uid) -> Vec<u8> {
    let mut key = contact_key(owned, contact);
    key.extend_from_slice(device_uid.as_bytes());
    key
}

impl Record for ContactDeviceRow {
    const TABLE: Table = Table::ContactDevice;

    fn key(&self) -> Vec<u8> {
        device_key(&self.owned, &self.contact, &self.device_uid)
    }
}

impl DeviceRecord for ContactDeviceRow {
    fn owned(&self) -> &Identity {
        &self.owned
    }

    fn contact(&self) -> Option<&Identity> {
        Some(&self.contact)
    }

    fn device_uid(&self) -> &Uid {
        &self.device_uid
    }

    fn pre_key(&self) -> Option<&PreKey> {
        self.pre_key.as_ref()
    }

    fn replace_pre_key(&mut self, pre_key: Option<PreKey>) {
        self.pre_key = pre_key;
    }

    fn capabilities(&self) -> &str {
        &self.capabilities
    }

    fn replace_capabilities(&mut self, capabilities: String) {
        self.capabilities = capabilities;
    }
}

pub fn get_contact_device<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
    device_uid: &Uid,
) -> Result<Option<ContactDeviceRow>, StoreError> {
    txn.get_record(&device_key(owned, contact, device_uid))
}

pub fn contact_devices<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    contact: &Identity,
) -> Result<Vec<ContactDeviceRow>, StoreError> {
    txn.scan_records(&contact_key(owned, contact))
}

/// Register a device of an existing contact. Returns the already stored row
/// unchanged when the device is known.
pub fn add_contact_device<S: AsRef<str>>(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    device_uid: Uid,
    pre_key: Option<PreKey>,
    capabilities: &[S],
    now: Timestamp,
) -> Result<ContactDeviceRow, DeviceError> {
    require_contact(&*session, owned, contact)?;
    if let Some(existing) = get_contact_device(&*session, owned, contact, &device_uid)? {
        debug!(device = ?device_uid, "contact device already known");
        return Ok(existing);
    }
    let row = ContactDeviceRow {
        owned: *owned,
        contact: *contact,
        device_uid,
        pre_key,
        capabilities: serialize_capabilities(capabilities),
        added: now,
    };
    session.put_record(&row)?;
    Ok(row)
}

pub fn remove_contact_device(
    session: &mut Session<'_>,
    owned: &Identity,
    contact: &Identity,
    device_uid: &Uid,
) -> Result<bool, DeviceError> {
    Ok(session.delete_record::<ContactDeviceRow>(&device_key(owned, contact, device_uid))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{get_all_with_expired_pre_key, set_capabilities, set_pre_key, PreKeyChange};
    use veil_contacts::contact::create_contact;
    use veil_contacts::{TrustLevelPolicy, TrustOrigin};
    use veil_nullables::NullStore;
    use veil_store::Store;
    use veil_types::{ChangeEvent, EncryptionPublicKey};

    fn pre_key(b: u8, expiration: u64) -> PreKey {
        PreKey {
            key_id: Uid::new([b; 32]),
            encryption_public_key: EncryptionPublicKey::X25519([b; 32]),
            expiration: Timestamp::new(expiration),
        }
    }

    fn setup(store: &NullStore) -> (Identity, Identity) {
        let (me, bob) = (Identity::new([1u8; 32]), Identity::new([2u8; 32]));
        let mut session = store.begin().unwrap();
        create_contact(
            &mut session,
            &TrustLevelPolicy::default(),
            &me,
            &bob,
            r#"{"first_name":"Bob"}"#,
            TrustOrigin::direct(Timestamp::new(1)),
            true,
        )
        .unwrap();
        session.commit().unwrap();
        (me, bob)
    }

    #[test]
    fn devices_require_a_contact() {
        let store = NullStore::new();
        let mut session = store.begin().unwrap();
        let result = add_contact_device::<&str>(
            &mut session,
            &Identity::new([1u8; 32]),
            &Identity::new([9u8; 32]),
            Uid::new([3u8; 32]),
            None,
            &[],
            Timestamp::new(0),
        );
        assert!(matches!(result, Err(DeviceError::Contact(_))));
    }

    #[test]
    fn only_presence_transitions_are_announced() {
        let store = NullStore::new();
        let (me, bob) = setup(&store);
        let mut session = store.begin().unwrap();
        let mut device = add_contact_device::<&str>(
            &mut session,
            &me,
            &bob,
            Uid::new([3u8; 32]),
            None,
            &[],
            Timestamp::new(0),
        )
        .unwrap();

        assert_eq!(set_pre_key(&mut session, &mut device, Some(pre_key(1, 100))).unwrap(), PreKeyChange::Added);
        assert_eq!(set_pre_key(&mut session, &mut device, Some(pre_key(1, 100))).unwrap(), PreKeyChange::Unchanged);
        assert_eq!(set_pre_key(&mut session, &mut device, Some(pre_key(2, 200))).unwrap(), PreKeyChange::Replaced);
        assert_eq!(set_pre_key(&mut session, &mut device, None).unwrap(), PreKeyChange::Removed);

        let availability: Vec<bool> = session
            .commit()
            .unwrap()
            .into_iter()
            .filter_map(|e| match e {
                ChangeEvent::PreKeyAvailabilityChanged { available, .. } => Some(available),
                _ => None,
            })
            .collect();
        assert_eq!(availability, vec![true, false]);
    }

    #[test]
    fn identical_capabilities_are_a_no_op() {
        let store = NullStore::new();
        let (me, bob) = setup(&store);
        let mut session = store.begin().unwrap();
        let mut device = add_contact_device(
            &mut session,
            &me,
            &bob,
            Uid::new([3u8; 32]),
            None,
            &["webrtc", "groups_v2"],
            Timestamp::new(0),
        )
        .unwrap();
        assert!(!set_capabilities(&mut session, &mut device, &["groups_v2", "webrtc"]).unwrap());
        assert!(set_capabilities(&mut session, &mut device, &["groups_v2"]).unwrap());
        let events = session.commit().unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn expired_sweep_lists_only_stale_pre_keys() {
        let store = NullStore::new();
        let (me, bob) = setup(&store);
        let mut session = store.begin().unwrap();
        for (b, expiration) in [(3u8, Some(50)), (4, Some(500)), (5, None)] {
            add_contact_device::<&str>(
                &mut session,
                &me,
                &bob,
                Uid::new([b; 32]),
                expiration.map(|e| pre_key(b, e)),
                &[],
                Timestamp::new(0),
            )
            .unwrap();
        }
        let expired: Vec<ContactDeviceRow> =
            get_all_with_expired_pre_key(&session, &me, Timestamp::new(100)).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].device_uid, Uid::new([3u8; 32]));
        assert!(remove_contact_device(&mut session, &me, &bob, &Uid::new([3u8; 32])).unwrap());
        assert_eq!(contact_devices(&session, &me, &bob).unwrap().len(), 2);
    }
}
