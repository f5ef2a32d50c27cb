//! In-memory registries for the mutable aggregates.
//!
//! Each registry guards its map with a `parking_lot` lock and exposes
//! single-record atomic updates; cross-record coordination (case dedup)
//! lives in the case manager.

pub mod cases;
pub mod commands;
pub mod devices;

pub use cases::{CasePage, CaseRegistry};
pub use commands::CommandRegistry;
pub use devices::{DeviceFilter, DeviceRegistry};

use std::sync::Arc;

use crate::domain::Device;

#[derive(Clone, Default)]
pub struct Repositories {
    pub cases: Arc<CaseRegistry>,
    pub devices: Arc<DeviceRegistry>,
    pub commands: Arc<CommandRegistry>,
}

impl Repositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let repos = Self::new();
        for device in devices {
            repos.devices.insert(device);
        }
        repos
    }
}
