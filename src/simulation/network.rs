use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use crate::domain::{
    Device, DeviceId, DeviceKind, Edge, EdgeId, Meter, MeterId, NodeId, OwnerRef, Phase, Transformer,
    TransformerId, TransformerStatus,
};
use crate::error::Result;
use crate::topology::Topology;

#[derive(Debug, Clone)]
pub struct NetworkSeedConfig {
    /// Transformer grid rows, named `TX-A..`
    pub rows: usize,
    /// Transformer grid columns, numbered from 1
    pub cols: usize,
    pub lt_switch_ratio: f64,
    pub rmu_ratio: f64,
    pub disconnect_ratio: f64,
    pub medical_ratio: f64,
    pub edges_per_transformer: (usize, usize),
    pub meters_per_transformer: (usize, usize),
    pub seed: u64,
}

impl Default for NetworkSeedConfig {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 4,
            lt_switch_ratio: 0.3,
            rmu_ratio: 0.2,
            disconnect_ratio: 0.4,
            medical_ratio: 0.05,
            edges_per_transformer: (3, 6),
            meters_per_transformer: (8, 19),
            seed: 42,
        }
    }
}

#[derive(Debug)]
pub struct SeededNetwork {
    pub topology: Topology,
    pub devices: Vec<Device>,
}

/// Generates a small radial LT network. The same config always yields the
/// same network.
pub struct NetworkSeeder {
    config: NetworkSeedConfig,
    rng: StdRng,
}

impl NetworkSeeder {
    pub fn new(config: NetworkSeedConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn generate(mut self) -> Result<SeededNetwork> {
        let mut topology = Topology::new();
        let mut devices = Vec::new();

        for row in 0..self.config.rows {
            for col in 0..self.config.cols {
                let name = format!("TX-{}{}", row_label(row), col + 1);
                let feeder_id = format!("FEEDER-{}", row / 2 + 1);
                self.seed_transformer(&mut topology, &mut devices, &name, feeder_id)?;
            }
        }

        info!(
            transformers = topology.transformers().count(),
            devices = devices.len(),
            "demo network generated"
        );
        Ok(SeededNetwork { topology, devices })
    }

    fn seed_transformer(
        &mut self,
        topology: &mut Topology,
        devices: &mut Vec<Device>,
        name: &str,
        feeder_id: String,
    ) -> Result<()> {
        let id = TransformerId::new(name);
        let owner = OwnerRef::Transformer(id.clone());

        let lt_switch_device = if self.rng.gen_bool(self.config.lt_switch_ratio) {
            let device = Device::new(format!("{name}-LT-SW"), format!("{name}-LT-SW"), DeviceKind::LtSwitch, owner.clone());
            let device_id = device.id.clone();
            devices.push(device);
            Some(device_id)
        } else {
            None
        };
        if self.rng.gen_bool(self.config.rmu_ratio) {
            devices.push(Device::new(format!("{name}-RMU"), format!("{name}-RMU"), DeviceKind::RingMainUnit, owner));
        }

        let root = NodeId::new(format!("{name}-N0"));
        topology.add_transformer(Transformer {
            id: id.clone(),
            name: name.to_string(),
            feeder_id,
            root_node: root.clone(),
            lt_switch_device,
            status: TransformerStatus::Online,
        });

        // Each new node hangs off an existing one, so the feeder stays radial.
        let (min_edges, max_edges) = self.config.edges_per_transformer;
        let edge_count = self.rng.gen_range(min_edges.max(1)..=max_edges.max(min_edges.max(1)));
        let mut nodes = vec![root];
        for k in 1..=edge_count {
            let from_node = nodes[self.rng.gen_range(0..nodes.len())].clone();
            let to_node = NodeId::new(format!("{name}-N{k}"));
            topology.add_edge(Edge {
                id: EdgeId::new(format!("{name}-E{k}")),
                transformer: id.clone(),
                from_node,
                to_node: to_node.clone(),
                phases: Phase::ALL.to_vec(),
                length_m: (self.rng.gen_range(50.0..250.0_f64) * 10.0).round() / 10.0,
                conductor: if self.rng.gen_bool(0.5) { "OVERHEAD" } else { "UNDERGROUND" }.to_string(),
            })?;
            nodes.push(to_node);
        }

        let (min_meters, max_meters) = self.config.meters_per_transformer;
        let meter_count = self.rng.gen_range(min_meters..=max_meters.max(min_meters));
        for i in 1..=meter_count {
            let meter_id = MeterId::new(format!("{name}-M{i:03}"));
            let has_disconnect = self.rng.gen_bool(self.config.disconnect_ratio);
            // Meters never sit on the LT bus itself.
            let node = nodes[self.rng.gen_range(1..nodes.len())].clone();
            topology.add_meter(Meter {
                id: meter_id.clone(),
                service_no: format!("SVC-{name}-{i:03}"),
                node,
                transformer: id.clone(),
                has_disconnect,
                medical_priority: self.rng.gen_bool(self.config.medical_ratio),
            })?;

            if has_disconnect {
                devices.push(Device::new(
                    DeviceId::new(format!("{meter_id}-DISC")),
                    format!("{meter_id}-DISC"),
                    DeviceKind::MeterDisconnect,
                    OwnerRef::Meter(meter_id),
                ));
            }
        }
        Ok(())
    }
}

fn row_label(row: usize) -> char {
    char::from(b'A' + (row % 26) as u8)
}

/// The demo network loaded on boot
pub fn demo_network() -> Result<SeededNetwork> {
    NetworkSeeder::new(NetworkSeedConfig::default()).generate()
}
