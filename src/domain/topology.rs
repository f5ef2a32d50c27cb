use serde::{Deserialize, Serialize};

use super::{DeviceId, EdgeId, MeterId, NodeId, Phase, TransformerId};

/// Operational status of a distribution transformer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformerStatus {
    #[default]
    Online,
    Offline,
    Fault,
}

/// Distribution transformer feeding one LT network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    pub id: TransformerId,
    pub name: String,
    pub feeder_id: String,
    /// LT bus node every feeder edge of this transformer hangs off
    pub root_node: NodeId,
    /// Designated LT switch, if the transformer has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt_switch_device: Option<DeviceId>,
    pub status: TransformerStatus,
}

/// Directed LT conductor segment; power flows from `from_node` to `to_node`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub transformer: TransformerId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub phases: Vec<Phase>,
    pub length_m: f64,
    pub conductor: String,
}

/// Customer service point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    pub id: MeterId,
    pub service_no: String,
    pub node: NodeId,
    pub transformer: TransformerId,
    pub has_disconnect: bool,
    pub medical_priority: bool,
}
