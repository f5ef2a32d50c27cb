//! Case lifecycle management.
//!
//! `open_case` is the only operation with a cross-record invariant: at most
//! one NEW/PLANNED case per transformer. It runs under a per-transformer
//! async mutex so concurrent bursts for the same transformer serialise while
//! different transformers proceed in parallel.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dispatch::CommandDispatcher;
use crate::domain::{
    Actor, Case, CaseId, CaseState, Command, CommandKind, EdgeId, MeterId, TransformerId, DEFAULT_BLOCK_REASON,
};
use crate::error::{GridError, Result};
use crate::isolation::IsolationPlanner;
use crate::notify::{Notification, Notifier};
use crate::repo::{CasePage, CaseRegistry, DeviceRegistry};
use crate::topology::Topology;

/// Detection result handed to `open_case`
#[derive(Debug, Clone)]
pub struct CaseRequest {
    pub transformer_ref: TransformerId,
    pub edge_ref: EdgeId,
    pub confidence: f64,
    pub affected_meters: BTreeSet<MeterId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOpening {
    Created(Case),
    /// An active case already covered the transformer; nothing was created
    Existing(Case),
}

impl CaseOpening {
    pub fn case(&self) -> &Case {
        match self {
            CaseOpening::Created(c) | CaseOpening::Existing(c) => c,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CaseOpening::Created(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    pub case: Case,
    pub commands: Vec<Command>,
}

#[derive(Default)]
struct TransformerLocks {
    locks: Mutex<HashMap<TransformerId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TransformerLocks {
    fn lock_for(&self, id: &TransformerId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(id.clone()).or_default())
    }
}

pub struct CaseManager {
    cases: Arc<CaseRegistry>,
    devices: Arc<DeviceRegistry>,
    topology: Arc<Topology>,
    planner: IsolationPlanner,
    dispatcher: Arc<CommandDispatcher>,
    notifier: Arc<dyn Notifier>,
    locks: TransformerLocks,
}

impl CaseManager {
    pub fn new(
        cases: Arc<CaseRegistry>,
        devices: Arc<DeviceRegistry>,
        topology: Arc<Topology>,
        planner: IsolationPlanner,
        dispatcher: Arc<CommandDispatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cases,
            devices,
            topology,
            planner,
            dispatcher,
            notifier,
            locks: TransformerLocks::default(),
        }
    }

    /// Open a case and plan its isolation, unless the transformer already has
    /// an active case. The NEW state never leaves this call.
    pub async fn open_case(&self, request: CaseRequest) -> Result<CaseOpening> {
        if !(0.0..=1.0).contains(&request.confidence) {
            return Err(GridError::validation(format!(
                "confidence must be within [0, 1], got {}",
                request.confidence
            )));
        }

        let lock = self.locks.lock_for(&request.transformer_ref);
        let _guard = lock.lock().await;

        if let Some(existing) = self.cases.find_active(&request.transformer_ref) {
            info!(
                transformer_id = %request.transformer_ref,
                case_id = %existing.id,
                "active case already exists"
            );
            return Ok(CaseOpening::Existing(existing));
        }

        let mut case = Case::new(
            request.transformer_ref,
            request.edge_ref,
            request.confidence,
            request.affected_meters,
        );
        let plan = self.planner.plan(&case, &self.topology, &self.devices);
        info!(
            case_id = %case.id,
            transformer_id = %case.transformer_ref,
            edge_id = %case.candidate_edge_ref,
            confidence = case.confidence,
            strategy = %plan.strategy,
            target_count = plan.targets.len(),
            "isolation plan created"
        );
        case.attach_plan(plan)?;
        self.cases.insert(case.clone());

        self.notifier.publish(Notification::CaseNew(case.clone()));
        Ok(CaseOpening::Created(case))
    }

    /// Execute the plan of a PLANNED case. The case becomes EXECUTED without
    /// waiting for any command to settle.
    pub fn approve(&self, id: &CaseId) -> Result<Approval> {
        let current = self.require(id)?;
        if current.state != CaseState::Planned {
            return Err(GridError::invalid_state(format!(
                "case {id} must be PLANNED to approve, is {}",
                current.state
            )));
        }
        for target in current.targets() {
            self.devices.require(target)?;
        }

        let (case, ()) = self.cases.update(id, Case::mark_executed)?;

        let mut commands = Vec::with_capacity(case.targets().len());
        for target in case.targets() {
            match self
                .dispatcher
                .issue(target, CommandKind::Open, Actor::Operator, Some(case.id.clone()))
            {
                Ok(command) => commands.push(command),
                Err(e) => warn!(case_id = %case.id, device_id = %target, error = %e, "isolation command not issued"),
            }
        }

        info!(case_id = %case.id, command_count = commands.len(), "isolation plan executed");
        self.notifier.publish(Notification::CaseUpdate(case.clone()));
        Ok(Approval { case, commands })
    }

    /// Close a non-terminal case. Idempotent on CLOSED cases.
    pub fn block(&self, id: &CaseId, reason: Option<&str>) -> Result<Case> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_BLOCK_REASON);

        let (case, changed) = self.cases.update(id, |c| c.block(reason))?;
        if changed {
            info!(case_id = %case.id, reason, "case blocked");
            self.notifier.publish(Notification::CaseUpdate(case.clone()));
        } else {
            debug!(case_id = %case.id, "case already blocked");
        }
        Ok(case)
    }

    pub fn get(&self, id: &CaseId) -> Option<Case> {
        self.cases.get(id)
    }

    pub fn require(&self, id: &CaseId) -> Result<Case> {
        self.get(id).ok_or_else(|| GridError::not_found("Case", id))
    }

    pub fn has_active(&self, transformer: &TransformerId) -> Option<Case> {
        self.cases.find_active(transformer)
    }

    pub fn list_active(&self) -> Vec<Case> {
        self.cases.list_active()
    }

    pub fn list(&self, page: usize, limit: usize) -> CasePage {
        self.cases.list(page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SimulatedGateway;
    use crate::domain::{CommandStatus, Device, DeviceKind, DeviceStatus, IsolationStrategy, OwnerRef};
    use crate::notify::BroadcastNotifier;
    use crate::repo::CommandRegistry;
    use crate::topology::fixtures::radial;
    use tokio::time::Duration;

    struct Fixture {
        manager: Arc<CaseManager>,
        dispatcher: Arc<CommandDispatcher>,
        devices: Arc<DeviceRegistry>,
        notifier: BroadcastNotifier,
    }

    fn fixture() -> Fixture {
        let devices = Arc::new(DeviceRegistry::new());
        devices.insert(Device::new(
            "RMU-T1",
            "T1-RMU",
            DeviceKind::RingMainUnit,
            OwnerRef::Transformer(TransformerId::new("T1")),
        ));
        let notifier = BroadcastNotifier::new(64);
        let dispatcher = Arc::new(CommandDispatcher::new(
            devices.clone(),
            Arc::new(CommandRegistry::new()),
            Arc::new(SimulatedGateway::instant()),
            Arc::new(notifier.clone()),
            Duration::from_secs(1),
        ));
        let manager = Arc::new(CaseManager::new(
            Arc::new(CaseRegistry::new()),
            devices.clone(),
            Arc::new(radial()),
            IsolationPlanner::default(),
            dispatcher.clone(),
            Arc::new(notifier.clone()),
        ));
        Fixture {
            manager,
            dispatcher,
            devices,
            notifier,
        }
    }

    fn request(transformer: &str) -> CaseRequest {
        CaseRequest {
            transformer_ref: TransformerId::new(transformer),
            edge_ref: EdgeId::new("E1"),
            confidence: 0.78,
            affected_meters: BTreeSet::from([MeterId::new("M1"), MeterId::new("M2")]),
        }
    }

    #[tokio::test]
    async fn test_open_case_plans_immediately() {
        let fx = fixture();
        let mut rx = fx.notifier.subscribe();

        let opening = fx.manager.open_case(request("T1")).await.unwrap();
        assert!(opening.is_created());
        let case = opening.case();
        assert_eq!(case.state, CaseState::Planned);
        assert_eq!(case.plan.as_ref().unwrap().strategy, IsolationStrategy::Upstream);

        match rx.recv().await.unwrap() {
            Notification::CaseNew(c) => assert_eq!(c.state, CaseState::Planned),
            other => panic!("expected case:new, got {}", other.topic()),
        }
    }

    #[tokio::test]
    async fn test_second_open_returns_existing() {
        let fx = fixture();
        let first = fx.manager.open_case(request("T1")).await.unwrap();
        let second = fx.manager.open_case(request("T1")).await.unwrap();
        assert!(!second.is_created());
        assert_eq!(second.case().id, first.case().id);

        let other = fx.manager.open_case(request("T2")).await.unwrap();
        assert!(other.is_created());
        assert_eq!(fx.manager.list_active().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_create_one_case() {
        let fx = fixture();
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let manager = fx.manager.clone();
                tokio::spawn(async move { manager.open_case(request("T1")).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_created() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(fx.manager.list_active().len(), 1);
    }

    #[tokio::test]
    async fn test_open_case_rejects_bad_confidence() {
        let fx = fixture();
        let mut req = request("T1");
        req.confidence = 1.5;
        assert!(matches!(fx.manager.open_case(req).await, Err(GridError::Validation(_))));
        assert!(fx.manager.has_active(&TransformerId::new("T1")).is_none());
    }

    #[tokio::test]
    async fn test_approve_executes_plan() {
        let fx = fixture();
        let case = fx.manager.open_case(request("T1")).await.unwrap().case().clone();

        let approval = fx.manager.approve(&case.id).unwrap();
        assert_eq!(approval.case.state, CaseState::Executed);
        assert_eq!(approval.commands.len(), 1);
        assert_eq!(approval.commands[0].status, CommandStatus::Sent);
        assert_eq!(approval.commands[0].case_ref.as_ref(), Some(&case.id));

        fx.dispatcher.drain().await;
        let rmu = fx.devices.get(&"RMU-T1".into()).unwrap();
        assert_eq!(rmu.status, DeviceStatus::Open);

        // Executed cases free the transformer for a new investigation.
        assert!(fx.manager.open_case(request("T1")).await.unwrap().is_created());
    }

    #[tokio::test]
    async fn test_approve_requires_planned() {
        let fx = fixture();
        let case = fx.manager.open_case(request("T1")).await.unwrap().case().clone();
        fx.manager.approve(&case.id).unwrap();

        let before = fx.manager.get(&case.id).unwrap();
        let err = fx.manager.approve(&case.id).unwrap_err();
        assert!(matches!(err, GridError::InvalidState(_)));
        assert_eq!(fx.manager.get(&case.id).unwrap(), before);

        assert!(matches!(
            fx.manager.approve(&CaseId::new("missing")),
            Err(GridError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_block_is_idempotent() {
        let fx = fixture();
        let case = fx.manager.open_case(request("T1")).await.unwrap().case().clone();

        let blocked = fx.manager.block(&case.id, None).unwrap();
        assert_eq!(blocked.state, CaseState::Closed);
        assert_eq!(blocked.block_reason.as_deref(), Some(DEFAULT_BLOCK_REASON));

        let again = fx.manager.block(&case.id, Some("  crew dispatched ")).unwrap();
        assert_eq!(again.state, CaseState::Closed);
        assert_eq!(again.block_reason.as_deref(), Some("crew dispatched"));

        assert!(matches!(fx.manager.approve(&case.id), Err(GridError::InvalidState(_))));
    }
}
