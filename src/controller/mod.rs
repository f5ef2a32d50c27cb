pub mod detector;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cases::{Approval, CaseManager};
use crate::config::Config;
use crate::dispatch::{CommandDispatcher, DeviceGateway};
use crate::domain::{
    Actor, Case, CaseId, Command, CommandKind, Device, DeviceId, Edge, Event, Meter, NewEvent, Transformer, TransformerId,
};
use crate::error::GridError;
use crate::evidence::EvidenceStore;
use crate::isolation::IsolationPlanner;
use crate::notify::{BroadcastNotifier, Notification, Notifier};
use crate::repo::{CasePage, DeviceFilter, Repositories};
use crate::scoring::EdgeScorer;
use crate::topology::Topology;

pub use detector::{Detection, FaultDetector};

pub const DEFAULT_RECENT_EVENTS: usize = 50;

/// Counters reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub transformers: usize,
    pub devices: usize,
    pub events: usize,
    pub active_cases: usize,
    pub commands_in_flight: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub controller: Arc<FaultController>,
    pub notifier: Arc<BroadcastNotifier>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let (topology, devices) = if cfg.seed.on_boot {
            let network = crate::simulation::demo_network()?;
            (network.topology, network.devices)
        } else {
            warn!("demo seed disabled, starting with an empty network");
            (Topology::new(), Vec::new())
        };
        Ok(Self::with_network(cfg, topology, devices))
    }

    pub fn with_network(cfg: Config, topology: Topology, devices: Vec<Device>) -> Self {
        #[cfg(feature = "sim")]
        let gateway: Arc<dyn DeviceGateway> = Arc::new(crate::dispatch::SimulatedGateway::new(
            cfg.dispatch.sim_latency_min_ms..=cfg.dispatch.sim_latency_max_ms,
            cfg.dispatch.sim_failure_rate,
        ));
        #[cfg(not(feature = "sim"))]
        let gateway: Arc<dyn DeviceGateway> = Arc::new(crate::dispatch::OfflineGateway);

        Self::with_gateway(cfg, topology, devices, gateway)
    }

    pub fn with_gateway(cfg: Config, topology: Topology, devices: Vec<Device>, gateway: Arc<dyn DeviceGateway>) -> Self {
        let notifier = Arc::new(BroadcastNotifier::new(cfg.notify.channel_capacity));
        let controller = Arc::new(FaultController::new(
            &cfg,
            topology,
            Repositories::with_devices(devices),
            gateway,
            notifier.clone(),
        ));
        info!(
            transformers = controller.topology.transformers().count(),
            devices = controller.repos.devices.len(),
            "fault controller ready"
        );
        Self {
            cfg,
            controller,
            notifier,
        }
    }
}

/// Entry point for field adapters, the dashboard and operators.
pub struct FaultController {
    topology: Arc<Topology>,
    evidence: Arc<EvidenceStore>,
    repos: Repositories,
    cases: CaseManager,
    detector: FaultDetector,
    dispatcher: Arc<CommandDispatcher>,
    notifier: Arc<dyn Notifier>,
}

impl FaultController {
    pub fn new(
        cfg: &Config,
        topology: Topology,
        repos: Repositories,
        gateway: Arc<dyn DeviceGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let topology = Arc::new(topology);
        let evidence = Arc::new(EvidenceStore::new());
        let dispatcher = Arc::new(CommandDispatcher::new(
            repos.devices.clone(),
            repos.commands.clone(),
            gateway,
            notifier.clone(),
            cfg.dispatch.ack_timeout(),
        ));
        let cases = CaseManager::new(
            repos.cases.clone(),
            repos.devices.clone(),
            topology.clone(),
            IsolationPlanner::new(cfg.isolation.max_meter_ring_targets),
            dispatcher.clone(),
            notifier.clone(),
        );
        let detector = FaultDetector::new(
            evidence.clone(),
            topology.clone(),
            EdgeScorer::new(cfg.detection.min_last_gasps, cfg.detection.confidence_threshold),
            cfg.detection.window(),
        );
        Self {
            topology,
            evidence,
            repos,
            cases,
            detector,
            dispatcher,
            notifier,
        }
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    /// Record a field event, run detection for fault signals and return the
    /// event as processed.
    pub async fn submit_event(&self, mut new: NewEvent) -> crate::Result<Event> {
        new.timestamp.get_or_insert_with(Utc::now);
        if new.transformer_ref.is_none() {
            if let Some(meter) = &new.meter_ref {
                new.transformer_ref = self.topology.transformer_of_meter(meter).cloned();
                if new.transformer_ref.is_none() {
                    warn!(meter_id = %meter, "event from unknown meter, not attributed to a transformer");
                }
            }
        }

        let kind = new.payload.kind();
        let transformer = new.transformer_ref.clone();
        let id = self.evidence.record(new)?;
        info!(event_id = %id, kind = %kind, "event recorded");

        if let (true, Some(transformer)) = (kind.triggers_scoring(), transformer) {
            if let Err(e) = self.detector.check(&transformer, &self.cases).await {
                warn!(event_id = %id, transformer_id = %transformer, error = %e, "fault detection failed");
            }
        }

        let event = self.evidence.mark_processed(&id)?;
        self.notifier.publish(Notification::EventNew(event.clone()));
        Ok(event)
    }

    // =========================================================================
    // Query
    // =========================================================================

    pub fn summary(&self) -> Summary {
        Summary {
            transformers: self.topology.transformers().count(),
            devices: self.repos.devices.len(),
            events: self.evidence.len(),
            active_cases: self.cases.list_active().len(),
            commands_in_flight: self.dispatcher.in_flight(),
        }
    }

    pub fn list_active_cases(&self) -> Vec<Case> {
        self.cases.list_active()
    }

    pub fn get_case(&self, id: &CaseId) -> crate::Result<Case> {
        self.cases.require(id)
    }

    pub fn list_cases(&self, page: usize, limit: usize) -> CasePage {
        self.cases.list(page, limit)
    }

    pub fn list_devices(&self, filter: &DeviceFilter) -> Vec<Device> {
        self.repos.devices.list(filter)
    }

    pub fn get_device(&self, id: &DeviceId) -> crate::Result<Device> {
        self.repos.devices.require(id)
    }

    pub fn list_recent_events(&self, limit: Option<usize>) -> Vec<Event> {
        self.evidence.recent(limit.unwrap_or(DEFAULT_RECENT_EVENTS))
    }

    pub fn list_commands(&self, case: Option<&CaseId>) -> Vec<Command> {
        self.repos.commands.list(case)
    }

    pub fn transformers(&self) -> Vec<Transformer> {
        self.topology.transformers().cloned().collect()
    }

    pub fn transformer_edges(&self, id: &TransformerId) -> crate::Result<Vec<Edge>> {
        self.require_transformer(id)?;
        Ok(self.topology.edges_of(id).into_iter().cloned().collect())
    }

    pub fn transformer_meters(&self, id: &TransformerId) -> crate::Result<Vec<Meter>> {
        self.require_transformer(id)?;
        Ok(self.topology.meters_of(id).into_iter().cloned().collect())
    }

    fn require_transformer(&self, id: &TransformerId) -> crate::Result<&Transformer> {
        self.topology
            .transformer(id)
            .ok_or_else(|| GridError::not_found("Transformer", id))
    }

    // =========================================================================
    // Operator actions
    // =========================================================================

    pub fn approve_case(&self, id: &CaseId) -> crate::Result<Approval> {
        self.cases.approve(id)
    }

    pub fn block_case(&self, id: &CaseId, reason: Option<&str>) -> crate::Result<Case> {
        self.cases.block(id, reason)
    }

    pub fn open_device(&self, id: &DeviceId) -> crate::Result<Command> {
        self.dispatcher.issue(id, CommandKind::Open, Actor::Operator, None)
    }

    pub fn close_device(&self, id: &DeviceId) -> crate::Result<Command> {
        self.dispatcher.issue(id, CommandKind::Close, Actor::Operator, None)
    }

    /// Wait for every issued command to settle.
    pub async fn drain(&self) {
        let pending = self.dispatcher.in_flight();
        if pending > 0 {
            info!(pending, "waiting for in-flight commands");
        }
        self.dispatcher.drain().await;
    }
}
