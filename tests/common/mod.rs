#![allow(dead_code)]
//! Shared fixtures: three identical radial feeders with different isolation
//! levers.
//!
//! ```text
//! TX-n-N0 --E1--> A --E3--> C
//!         --E2--> B
//! ```
//! M1, M2 on A; M3 on C; M4, M5 on B.
//!
//! - TX-1 has a designated LT switch
//! - TX-2 has a ring-main unit
//! - TX-3 has meter disconnects on every meter, M3's cannot open

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use ltgrid::config::Config;
use ltgrid::controller::AppState;
use ltgrid::dispatch::{DeviceGateway, GatewayError, SimulatedGateway};
use ltgrid::domain::{
    CommandKind, Device, DeviceId, DeviceKind, Edge, EdgeId, EventPayload, Meter, MeterId, NewEvent, NodeId,
    OwnerRef, Phase, Transformer, TransformerId, TransformerStatus,
};
use ltgrid::topology::Topology;

pub fn network() -> (Topology, Vec<Device>) {
    let mut topology = Topology::new();
    let mut devices = Vec::new();

    for n in 1..=3 {
        let tx = format!("TX-{n}");
        let id = TransformerId::new(&tx);
        let lt_switch = (n == 1).then(|| DeviceId::new(format!("{tx}-LT-SW")));

        topology.add_transformer(Transformer {
            id: id.clone(),
            name: tx.clone(),
            feeder_id: "FEEDER-1".to_string(),
            root_node: NodeId::new(format!("{tx}-N0")),
            lt_switch_device: lt_switch.clone(),
            status: TransformerStatus::Online,
        });
        for (edge, from, to) in [("E1", "N0", "A"), ("E2", "N0", "B"), ("E3", "A", "C")] {
            topology
                .add_edge(Edge {
                    id: EdgeId::new(format!("{tx}-{edge}")),
                    transformer: id.clone(),
                    from_node: NodeId::new(format!("{tx}-{from}")),
                    to_node: NodeId::new(format!("{tx}-{to}")),
                    phases: Phase::ALL.to_vec(),
                    length_m: 150.0,
                    conductor: "OVERHEAD".to_string(),
                })
                .unwrap();
        }
        for (meter, node) in [("M1", "A"), ("M2", "A"), ("M3", "C"), ("M4", "B"), ("M5", "B")] {
            let meter_id = MeterId::new(format!("{tx}-{meter}"));
            topology
                .add_meter(Meter {
                    id: meter_id.clone(),
                    service_no: format!("SVC-{tx}-{meter}"),
                    node: NodeId::new(format!("{tx}-{node}")),
                    transformer: id.clone(),
                    has_disconnect: n == 3,
                    medical_priority: false,
                })
                .unwrap();

            if n == 3 {
                let device = Device::new(
                    format!("{meter_id}-DISC"),
                    format!("{meter_id}-DISC"),
                    DeviceKind::MeterDisconnect,
                    OwnerRef::Meter(meter_id),
                );
                devices.push(if meter == "M3" { device.with_capabilities(false, true) } else { device });
            }
        }

        let owner = OwnerRef::Transformer(id);
        if let Some(switch) = lt_switch {
            devices.push(Device::new(switch, format!("{tx}-LT-SW"), DeviceKind::LtSwitch, owner));
        } else if n == 2 {
            devices.push(Device::new(format!("{tx}-RMU"), format!("{tx}-RMU"), DeviceKind::RingMainUnit, owner));
        }
    }

    (topology, devices)
}

pub fn state() -> AppState {
    state_with_gateway(Arc::new(SimulatedGateway::instant()))
}

pub fn state_with_gateway(gateway: Arc<dyn DeviceGateway>) -> AppState {
    let (topology, devices) = network();
    AppState::with_gateway(Config::default(), topology, devices, gateway)
}

pub fn last_gasp(tx: &str, meter: &str) -> NewEvent {
    NewEvent::from_meter(format!("{tx}-{meter}"), EventPayload::LastGasp)
}

pub fn sag(tx: &str, meter: &str, delta_voltage: f64) -> NewEvent {
    NewEvent::from_meter(
        format!("{tx}-{meter}"),
        EventPayload::VoltageSag { delta_voltage, phase: None },
    )
}

/// Three last gasps and a -20 V sag, all behind E1: score 7.8, confidence 0.78
pub fn fault_behind_e1(tx: &str) -> Vec<NewEvent> {
    vec![
        last_gasp(tx, "M1"),
        last_gasp(tx, "M2"),
        last_gasp(tx, "M3"),
        sag(tx, "M1", -20.0),
    ]
}

/// Refuses every operation on the listed devices, acknowledges the rest
pub struct RefusingGateway {
    pub refuse: HashSet<DeviceId>,
}

#[async_trait]
impl DeviceGateway for RefusingGateway {
    async fn operate(&self, device: &Device, _kind: CommandKind) -> Result<(), GatewayError> {
        if self.refuse.contains(&device.id) {
            Err(GatewayError::Rejected(device.id.to_string(), "local control selected".to_string()))
        } else {
            Ok(())
        }
    }
}
