use serde::{Deserialize, Serialize};

use super::{CommandKind, DeviceId, MeterId, TransformerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    LtSwitch,
    RingMainUnit,
    Breaker,
    MeterDisconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Open,
    Closed,
}

/// Network element a device is installed on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerRef {
    Transformer(TransformerId),
    Meter(MeterId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub can_open: bool,
    pub can_close: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            can_open: true,
            can_close: true,
        }
    }
}

/// Controllable network element. Status only changes through acknowledged commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    pub owner: OwnerRef,
    pub status: DeviceStatus,
    pub capabilities: DeviceCapabilities,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, kind: DeviceKind, owner: OwnerRef) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            owner,
            status: DeviceStatus::Closed,
            capabilities: DeviceCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, can_open: bool, can_close: bool) -> Self {
        self.capabilities = DeviceCapabilities { can_open, can_close };
        self
    }

    pub fn supports(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Open => self.capabilities.can_open,
            CommandKind::Close => self.capabilities.can_close,
        }
    }
}
