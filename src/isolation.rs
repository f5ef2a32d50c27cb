//! Isolation strategy selection.
//!
//! Strategies are tried in fixed priority order and the first one with an
//! actionable device wins: the transformer's LT switch, then the RMU feeding
//! it, then a bounded ring of customer disconnects. When nothing can be
//! switched the case is planned as NOTIFY_ONLY.

use tracing::debug;

use crate::domain::{Case, Device, DeviceKind, IsolationPlan, IsolationStrategy, OwnerRef};
use crate::repo::DeviceRegistry;
use crate::topology::Topology;

pub const DEFAULT_MAX_METER_RING_TARGETS: usize = 5;

#[derive(Debug, Clone)]
pub struct IsolationPlanner {
    pub max_meter_ring_targets: usize,
}

impl Default for IsolationPlanner {
    fn default() -> Self {
        Self {
            max_meter_ring_targets: DEFAULT_MAX_METER_RING_TARGETS,
        }
    }
}

impl IsolationPlanner {
    pub fn new(max_meter_ring_targets: usize) -> Self {
        Self { max_meter_ring_targets }
    }

    pub fn plan(&self, case: &Case, topology: &Topology, devices: &DeviceRegistry) -> IsolationPlan {
        if let Some(lt_switch) = self.lt_switch(case, topology, devices) {
            return IsolationPlan {
                strategy: IsolationStrategy::LtSwitch,
                targets: vec![lt_switch.id],
            };
        }

        if let Some(rmu) = self.upstream_rmu(case, devices) {
            return IsolationPlan {
                strategy: IsolationStrategy::Upstream,
                targets: vec![rmu.id],
            };
        }

        let ring = self.meter_ring(case, devices);
        if !ring.is_empty() {
            return IsolationPlan {
                strategy: IsolationStrategy::MeterRing,
                targets: ring.into_iter().map(|d| d.id).collect(),
            };
        }

        debug!(case_id = %case.id, transformer_id = %case.transformer_ref, "no controllable device for isolation");
        IsolationPlan::notify_only()
    }

    fn lt_switch(&self, case: &Case, topology: &Topology, devices: &DeviceRegistry) -> Option<Device> {
        let designated = topology.transformer(&case.transformer_ref)?.lt_switch_device.as_ref()?;
        devices.get(designated).filter(|d| d.capabilities.can_open)
    }

    fn upstream_rmu(&self, case: &Case, devices: &DeviceRegistry) -> Option<Device> {
        let owner = OwnerRef::Transformer(case.transformer_ref.clone());
        devices
            .owned_by(&owner, DeviceKind::RingMainUnit)
            .into_iter()
            .find(|d| d.capabilities.can_open)
    }

    /// Openable disconnects of affected meters, in meter-id order
    fn meter_ring(&self, case: &Case, devices: &DeviceRegistry) -> Vec<Device> {
        case.affected_meter_refs
            .iter()
            .flat_map(|meter| devices.owned_by(&OwnerRef::Meter(meter.clone()), DeviceKind::MeterDisconnect))
            .filter(|d| d.capabilities.can_open)
            .take(self.max_meter_ring_targets)
            .collect()
    }
}
