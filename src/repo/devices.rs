use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::domain::{Device, DeviceId, DeviceKind, DeviceStatus, OwnerRef};
use crate::error::{GridError, Result};

/// Optional constraints for device listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceFilter {
    pub owner: Option<OwnerRef>,
    pub kind: Option<DeviceKind>,
}

impl DeviceFilter {
    fn matches(&self, device: &Device) -> bool {
        self.owner.as_ref().map_or(true, |o| &device.owner == o)
            && self.kind.map_or(true, |k| device.kind == k)
    }
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<BTreeMap<DeviceId, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, device: Device) {
        self.devices.write().insert(device.id.clone(), device);
    }

    pub fn get(&self, id: &DeviceId) -> Option<Device> {
        self.devices.read().get(id).cloned()
    }

    pub fn require(&self, id: &DeviceId) -> Result<Device> {
        self.get(id).ok_or_else(|| GridError::not_found("Device", id))
    }

    /// Matching devices, ordered by name then id
    pub fn list(&self, filter: &DeviceFilter) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .devices
            .read()
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        devices
    }

    /// Devices of `kind` installed on `owner`, ordered by id
    pub fn owned_by(&self, owner: &OwnerRef, kind: DeviceKind) -> Vec<Device> {
        self.devices
            .read()
            .values()
            .filter(|d| &d.owner == owner && d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn set_status(&self, id: &DeviceId, status: DeviceStatus) -> Result<Device> {
        let mut devices = self.devices.write();
        let device = devices
            .get_mut(id)
            .ok_or_else(|| GridError::not_found("Device", id))?;
        device.status = status;
        Ok(device.clone())
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MeterId, TransformerId};

    fn registry() -> DeviceRegistry {
        let reg = DeviceRegistry::new();
        let tx = OwnerRef::Transformer(TransformerId::new("TX-A1"));
        reg.insert(Device::new("D3", "TX-A1-RMU", DeviceKind::RingMainUnit, tx.clone()));
        reg.insert(Device::new("D1", "TX-A1-LT-SW", DeviceKind::LtSwitch, tx));
        reg.insert(Device::new(
            "D2",
            "TX-A1-M001-DISC",
            DeviceKind::MeterDisconnect,
            OwnerRef::Meter(MeterId::new("M001")),
        ));
        reg
    }

    #[test]
    fn test_list_filters_and_sorts_by_name() {
        let reg = registry();
        let all: Vec<_> = reg.list(&DeviceFilter::default()).into_iter().map(|d| d.name).collect();
        assert_eq!(all, vec!["TX-A1-LT-SW", "TX-A1-M001-DISC", "TX-A1-RMU"]);

        let filter = DeviceFilter {
            owner: Some(OwnerRef::Transformer(TransformerId::new("TX-A1"))),
            kind: Some(DeviceKind::RingMainUnit),
        };
        let rmus = reg.list(&filter);
        assert_eq!(rmus.len(), 1);
        assert_eq!(rmus[0].id, DeviceId::new("D3"));
    }

    #[test]
    fn test_set_status() {
        let reg = registry();
        let updated = reg.set_status(&DeviceId::new("D1"), DeviceStatus::Open).unwrap();
        assert_eq!(updated.status, DeviceStatus::Open);
        assert_eq!(reg.get(&DeviceId::new("D1")).unwrap().status, DeviceStatus::Open);
        assert!(reg.set_status(&DeviceId::new("D9"), DeviceStatus::Open).is_err());
    }
}
