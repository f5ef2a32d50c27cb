use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{CaseId, DeviceId, EdgeId, MeterId, TransformerId};
use crate::error::{GridError, Result};

/// Reason recorded when a block action arrives without one
pub const DEFAULT_BLOCK_REASON: &str = "Blocked by supervisor";

/// Case lifecycle state
///
/// ```text
/// NEW --plan--> PLANNED --approve--> EXECUTED
///  \               \
///   `----block------`--> CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    New,
    Planned,
    Executed,
    Closed,
}

impl CaseState {
    /// Active cases block new cases on the same transformer
    pub fn is_active(self) -> bool {
        matches!(self, CaseState::New | CaseState::Planned)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// Isolation strategy, in fixed priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationStrategy {
    /// Open the transformer's own LT switch
    LtSwitch,
    /// Open the ring-main unit feeding the transformer
    Upstream,
    /// Disconnect a bounded set of affected customers
    MeterRing,
    /// No actionable lever; manual intervention only
    NotifyOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationPlan {
    pub strategy: IsolationStrategy,
    pub targets: Vec<DeviceId>,
}

impl IsolationPlan {
    pub fn notify_only() -> Self {
        Self {
            strategy: IsolationStrategy::NotifyOnly,
            targets: Vec::new(),
        }
    }
}

/// One suspected-fault investigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transformer_ref: TransformerId,
    pub candidate_edge_ref: EdgeId,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    pub affected_meter_refs: BTreeSet<MeterId>,
    pub plan: Option<IsolationPlan>,
    pub state: CaseState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl Case {
    pub fn new(
        transformer_ref: TransformerId,
        candidate_edge_ref: EdgeId,
        confidence: f64,
        affected_meter_refs: BTreeSet<MeterId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CaseId::generate(),
            started_at: now,
            updated_at: now,
            transformer_ref,
            candidate_edge_ref,
            confidence,
            affected_meter_refs,
            plan: None,
            state: CaseState::New,
            block_reason: None,
        }
    }

    /// NEW -> PLANNED
    pub fn attach_plan(&mut self, plan: IsolationPlan) -> Result<()> {
        self.expect_state(CaseState::New, "attach a plan")?;
        self.plan = Some(plan);
        self.transition(CaseState::Planned);
        Ok(())
    }

    /// PLANNED -> EXECUTED
    pub fn mark_executed(&mut self) -> Result<()> {
        self.expect_state(CaseState::Planned, "approve")?;
        self.transition(CaseState::Executed);
        Ok(())
    }

    /// Any non-terminal state -> CLOSED. Re-blocking a closed case only
    /// refreshes the reason. Returns whether anything changed.
    pub fn block(&mut self, reason: &str) -> Result<bool> {
        match self.state {
            CaseState::New | CaseState::Planned => {
                self.block_reason = Some(reason.to_string());
                self.transition(CaseState::Closed);
                Ok(true)
            }
            CaseState::Closed => {
                if self.block_reason.as_deref() == Some(reason) {
                    return Ok(false);
                }
                self.block_reason = Some(reason.to_string());
                self.updated_at = Utc::now();
                Ok(true)
            }
            CaseState::Executed => Err(GridError::invalid_state(format!(
                "case {} is EXECUTED and can no longer be blocked",
                self.id
            ))),
        }
    }

    pub fn targets(&self) -> &[DeviceId] {
        self.plan.as_ref().map(|p| p.targets.as_slice()).unwrap_or_default()
    }

    fn expect_state(&self, expected: CaseState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(GridError::invalid_state(format!(
                "cannot {action} case {} in state {} (requires {expected})",
                self.id, self.state
            )));
        }
        Ok(())
    }

    fn transition(&mut self, to: CaseState) {
        self.state = to;
        self.updated_at = Utc::now();
    }
}
