use serde::{Deserialize, Serialize};
use tracing::info;
use veil_crypto::{generate_pre_key_pair, EntropySource};
use veil_store::{KeyBuilder, ReadExt, ReadTxn, Record, Session, StoreError, Table, WriteExt};
use veil_types::{EncryptionPrivateKey, Identity, Timestamp, Uid};

use crate::record::serialize_capabilities;
use crate::{set_pre_key, DeviceError, DeviceRecord, PreKey};

/// A device of an owned identity. Only the current device (this one) keeps
/// the private half of its pre-key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedDeviceRow {
    pub owned: Identity,
    pub device_uid: Uid,
    pub is_current: bool,
    pub display_name: Option<String>,
    pub pre_key: Option<PreKey>,
    pub pre_key_private: Option<EncryptionPrivateKey>,
    pub capabilities: String,
}

fn device_key(owned: &Identity, device_uid: &Uid) -> Vec<u8> {
    KeyBuilder::new().identity(owned).uid(device_uid).build()
}

impl Record for OwnedDeviceRow {
    const TABLE: Table = Table::OwnedDevice;

    fn key(&self) -> Vec<u8> {
        device_key(&self.owned, &self.device_uid)
    }
}

impl DeviceRecord for OwnedDeviceRow {
    fn owned(&self) -> &Identity {
        &self.owned
    }

    fn contact(&self) -> Option<&Identity> {
        None
    }

    fn device_uid(&self) -> &Uid {
        &self.device_uid
    }

    fn pre_key(&self) -> Option<&PreKey> {
        self.pre_key.as_ref()
    }

    fn replace_pre_key(&mut self, pre_key: Option<PreKey>) {
        if pre_key.is_none() {
            self.pre_key_private = None;
        }
        self.pre_key = pre_key;
    }

    fn capabilities(&self) -> &str {
        &self.capabilities
    }

    fn replace_capabilities(&mut self, capabilities: String) {
        self.capabilities = capabilities;
    }
}

pub fn owned_devices<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Vec<OwnedDeviceRow>, StoreError> {
    txn.scan_records(&OwnedDeviceRow::owned_prefix(owned))
}

pub fn get_owned_device<R: ReadTxn + ?Sized>(
    txn: &R,
    owned: &Identity,
    device_uid: &Uid,
) -> Result<Option<OwnedDeviceRow>, StoreError> {
    txn.get_record(&device_key(owned, device_uid))
}

pub fn current_device<R: ReadTxn + ?Sized>(txn: &R, owned: &Identity) -> Result<Option<OwnedDeviceRow>, StoreError> {
    Ok(owned_devices(txn, owned)?
        .into_iter()
        .find(|device| device.is_current))
}

/// Register a device of an owned identity. At most one device is current.
pub fn add_owned_device<S: AsRef<str>>(
    session: &mut Session<'_>,
    owned: &Identity,
    device_uid: Uid,
    is_current: bool,
    display_name: Option<String>,
    capabilities: &[S],
) -> Result<OwnedDeviceRow, DeviceError> {
    if get_owned_device(&*session, owned, &device_uid)?.is_some() {
        return Err(DeviceError::Validation(format!(
            "owned device {device_uid:?} already exists"
        )));
    }
    if is_current && current_device(&*session, owned)?.is_some() {
        return Err(DeviceError::Validation(
            "owned identity already has a current device".into(),
        ));
    }
    let row = OwnedDeviceRow {
        owned: *owned,
        device_uid,
        is_current,
        display_name,
        pre_key: None,
        pre_key_private: None,
        capabilities: serialize_capabilities(capabilities),
    };
    session.put_record(&row)?;
    Ok(row)
}

/// Remove another device of ours. The current device goes only with the
/// identity.
pub fn remove_owned_device(
    session: &mut Session<'_>,
    owned: &Identity,
    device_uid: &Uid,
) -> Result<bool, DeviceError> {
    let Some(device) = get_owned_device(&*session, owned, device_uid)? else {
        return Ok(false);
    };
    if device.is_current {
        return Err(DeviceError::Precondition(
            "the current device cannot be removed".into(),
        ));
    }
    Ok(session.delete_record::<OwnedDeviceRow>(&device.key())?)
}

/// Issue a fresh pre-key for the current device, valid for
/// `validity_millis` from `now`.
pub fn rotate_current_device_pre_key(
    session: &mut Session<'_>,
    entropy: &dyn EntropySource,
    owned: &Identity,
    now: Timestamp,
    validity_millis: u64,
) -> Result<PreKey, DeviceError> {
    let mut device = current_device(&*session, owned)?.ok_or_else(|| {
        DeviceError::Precondition(format!("{owned} has no current device"))
    })?;
    let (private, public) = generate_pre_key_pair(entropy)?;
    let pre_key = PreKey {
        key_id: entropy.random_uid()?,
        encryption_public_key: public,
        expiration: now.saturating_add(validity_millis),
    };
    device.pre_key_private = Some(private);
    set_pre_key(session, &mut device, Some(pre_key.clone()))?;
    // the private half changes even when the pre-key compares equal
    session.put_record(&device)?;
    info!(owned = %owned, expiration = %pre_key.expiration, "rotated current device pre-key");
    Ok(pre_key)
}

/// Cascade for identity deletion: every owned device and every contact
/// device of `owned`.
pub fn delete_all_devices(session: &mut Session<'_>, owned: &Identity) -> Result<usize, DeviceError> {
    let prefix = OwnedDeviceRow::owned_prefix(owned);
    let removed = session.delete_prefix(Table::OwnedDevice, &prefix)?
        + session.delete_prefix(Table::ContactDevice, &prefix)?;
    Ok(removed)
}
