//! Switching command dispatch.
//!
//! `issue` records a SENT command and returns at once; the device call runs
//! on a tracked task and settles the command exactly once. Only an
//! acknowledged command touches device state. There is no cancellation path
//! and no automatic retry.

pub mod gateway;

pub use gateway::{DeviceGateway, GatewayError, OfflineGateway, SimulatedGateway};

use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::domain::{Actor, CaseId, Command, CommandKind, CommandStatus, Device, DeviceId};
use crate::error::{GridError, Result};
use crate::notify::{Notification, Notifier};
use crate::repo::{CommandRegistry, DeviceRegistry};

struct Settlement {
    devices: Arc<DeviceRegistry>,
    commands: Arc<CommandRegistry>,
    gateway: Arc<dyn DeviceGateway>,
    notifier: Arc<dyn Notifier>,
    ack_timeout: Duration,
}

impl Settlement {
    async fn execute(&self, command: Command, device: Device) {
        let outcome = match timeout(self.ack_timeout, self.gateway.operate(&device, command.kind)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.ack_timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(()) => self.acknowledge(&command, &device),
            Err(e) => self.fail(&command, GridError::from(e)),
        }
    }

    fn acknowledge(&self, command: &Command, device: &Device) {
        let updated = match self.devices.set_status(&device.id, command.kind.resulting_status()) {
            Ok(d) => d,
            Err(e) => return self.fail(command, e),
        };
        let note = match command.kind {
            CommandKind::Open => "Device opened successfully",
            CommandKind::Close => "Device closed successfully",
        };
        match self.commands.settle(&command.id, CommandStatus::Acknowledged, note) {
            Ok(settled) => {
                info!(command_id = %command.id, device_id = %device.id, status = %updated.status, "command acknowledged");
                self.notifier.publish(Notification::DeviceUpdate(updated));
                self.notifier.publish(Notification::CommandUpdate(settled));
            }
            Err(e) => error!(command_id = %command.id, error = %e, "could not record acknowledgement"),
        }
    }

    fn fail(&self, command: &Command, error: GridError) {
        warn!(command_id = %command.id, device_id = %command.target_device, error = %error, "command failed");
        match self.commands.settle(&command.id, CommandStatus::Failed, error.to_string()) {
            Ok(settled) => self.notifier.publish(Notification::CommandUpdate(settled)),
            Err(e) => error!(command_id = %command.id, error = %e, "could not record failure"),
        }
    }
}

pub struct CommandDispatcher {
    settlement: Arc<Settlement>,
    tracker: TaskTracker,
    /// Serializes the close/wait/reopen cycle of `drain`
    draining: tokio::sync::Mutex<()>,
}

impl CommandDispatcher {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        commands: Arc<CommandRegistry>,
        gateway: Arc<dyn DeviceGateway>,
        notifier: Arc<dyn Notifier>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            settlement: Arc::new(Settlement {
                devices,
                commands,
                gateway,
                notifier,
                ack_timeout,
            }),
            tracker: TaskTracker::new(),
            draining: tokio::sync::Mutex::new(()),
        }
    }

    /// Record a SENT command and schedule its execution.
    ///
    /// Must be called from within a tokio runtime.
    pub fn issue(&self, device_id: &DeviceId, kind: CommandKind, actor: Actor, case_ref: Option<CaseId>) -> Result<Command> {
        let device = self.settlement.devices.require(device_id)?;
        if !device.supports(kind) {
            return Err(GridError::validation(format!(
                "device {} ({}) cannot be commanded to {kind}",
                device.id, device.kind
            )));
        }

        let command = Command::sent(kind, device.id.clone(), actor, case_ref);
        self.settlement.commands.insert(command.clone());
        info!(
            command_id = %command.id,
            device_id = %device.id,
            kind = %kind,
            actor = %actor,
            case_id = ?command.case_ref.as_ref().map(|c| c.as_str()),
            "command sent"
        );

        let settlement = Arc::clone(&self.settlement);
        let pending = command.clone();
        self.tracker.spawn(async move {
            settlement.execute(pending, device).await;
        });

        Ok(command)
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every command issued so far to settle.
    ///
    /// Concurrent callers take turns; each returns once the tracker is empty.
    pub async fn drain(&self) {
        let _turn = self.draining.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
