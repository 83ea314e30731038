//! Pre-key and capability bookkeeping shared by both device kinds.

use tracing::debug;
use veil_store::{KeyBuilder, ReadExt, ReadTxn, Record, Session, StoreError, WriteExt};
use veil_types::{ChangeEvent, Identity, Timestamp, Uid};

use crate::{DeviceError, PreKey, PreKeyChange};

pub trait DeviceRecord: Record {
    fn owned(&self) -> &Identity;

    /// `None` for devices of the owned identity itself.
    fn contact(&self) -> Option<&Identity>;

    fn device_uid(&self) -> &Uid;

    fn pre_key(&self) -> Option<&PreKey>;

    fn replace_pre_key(&mut self, pre_key: Option<PreKey>);

    /// Canonical serialized capability set.
    fn capabilities(&self) -> &str;

    fn replace_capabilities(&mut self, capabilities: String);

    /// Prefix under which every device of this kind for `owned` is stored.
    fn owned_prefix(owned: &Identity) -> Vec<u8> {
        KeyBuilder::new().identity(owned).build()
    }
}

/// Capabilities arrive unordered and with repeats; store them sorted,
/// deduplicated and comma-joined.
pub fn serialize_capabilities<S: AsRef<str>>(capabilities: &[S]) -> String {
    let mut sorted: Vec<&str> = capabilities
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| !c.is_empty())
        .collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(",")
}

pub fn parse_capabilities(serialized: &str) -> Vec<String> {
    serialized
        .split(',')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace the device's pre-key atomically with the rest of the session.
pub fn set_pre_key<D: DeviceRecord>(
    session: &mut Session<'_>,
    device: &mut D,
    pre_key: Option<PreKey>,
) -> Result<PreKeyChange, DeviceError> {
    let change = PreKeyChange::between(device.pre_key(), pre_key.as_ref());
    if change == PreKeyChange::Unchanged {
        return Ok(change);
    }
    let available = pre_key.is_some();
    device.replace_pre_key(pre_key);
    session.put_record(&*device)?;
    if change.changes_availability() {
        session.emit(ChangeEvent::PreKeyAvailabilityChanged {
            owned: *device.owned(),
            contact: device.contact().copied(),
            device: *device.device_uid(),
            available,
        });
    }
    Ok(change)
}

/// Returns false without writing when the serialized set is unchanged.
pub fn set_capabilities<D: DeviceRecord, S: AsRef<str>>(
    session: &mut Session<'_>,
    device: &mut D,
    capabilities: &[S],
) -> Result<bool, DeviceError> {
    let serialized = serialize_capabilities(capabilities);
    if serialized == device.capabilities() {
        debug!(device = ?device.device_uid(), "capabilities unchanged");
        return Ok(false);
    }
    device.replace_capabilities(serialized);
    session.put_record(&*device)?;
    session.emit(ChangeEvent::CapabilitiesChanged {
        owned: *device.owned(),
        contact: device.contact().copied(),
        device: *device.device_uid(),
    });
    Ok(true)
}

/// Devices of `owned` whose pre-key expires before `cutoff`.
pub fn get_all_with_expired_pre_key<R: ReadTxn + ?Sized, D: DeviceRecord>(
    txn: &R,
    owned: &Identity,
    cutoff: Timestamp,
) -> Result<Vec<D>, StoreError> {
    Ok(txn
        .scan_records::<D>(&D::owned_prefix(owned))?
        .into_iter()
        .filter(|device| device.pre_key().is_some_and(|p| p.is_expired(cutoff)))
        .collect())
}
