//! Fault detection for one transformer: gather the evidence window, score
//! the edges and hand a confident result to the case manager.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cases::{CaseManager, CaseOpening, CaseRequest};
use crate::domain::{Case, CaseId, EdgeId, EventKind, TransformerId};
use crate::error::Result;
use crate::evidence::EvidenceStore;
use crate::scoring::{Assessment, EdgeScorer, Evidence};
use crate::topology::Topology;

/// What a detection pass concluded
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// The transformer already has an active case; scoring was skipped
    ActiveCase(CaseId),
    InsufficientEvidence { last_gasps: usize },
    Inconclusive { edge: Option<EdgeId>, confidence: f64 },
    Opened(Case),
    /// A concurrent pass opened the case first
    Deduplicated(Case),
}

pub struct FaultDetector {
    evidence: Arc<EvidenceStore>,
    topology: Arc<Topology>,
    scorer: EdgeScorer,
    window: chrono::Duration,
}

impl FaultDetector {
    pub fn new(evidence: Arc<EvidenceStore>, topology: Arc<Topology>, scorer: EdgeScorer, window: chrono::Duration) -> Self {
        Self {
            evidence,
            topology,
            scorer,
            window,
        }
    }

    pub async fn check(&self, transformer: &TransformerId, cases: &CaseManager) -> Result<Detection> {
        self.check_at(transformer, cases, Utc::now()).await
    }

    /// Evaluate the window ending at `now`.
    pub async fn check_at(&self, transformer: &TransformerId, cases: &CaseManager, now: DateTime<Utc>) -> Result<Detection> {
        if let Some(active) = cases.has_active(transformer) {
            debug!(transformer_id = %transformer, case_id = %active.id, "active case exists, skipping scoring");
            return Ok(Detection::ActiveCase(active.id));
        }

        let events = self
            .evidence
            .window(transformer, &EventKind::FAULT_EVIDENCE, now - self.window, now);
        let evidence = Evidence::from_events(events);

        match self.scorer.evaluate(&self.topology, transformer, &evidence) {
            Assessment::InsufficientEvidence { last_gasps } => {
                info!(transformer_id = %transformer, last_gasps, "insufficient evidence for fault detection");
                Ok(Detection::InsufficientEvidence { last_gasps })
            }
            Assessment::Inconclusive { top } => {
                let (edge, score, confidence) = top
                    .map(|e| (Some(e.edge_id), e.score, e.confidence))
                    .unwrap_or((None, 0.0, 0.0));
                info!(
                    transformer_id = %transformer,
                    edge_id = ?edge.as_ref().map(|e| e.as_str()),
                    score,
                    confidence,
                    "no confident fault location"
                );
                Ok(Detection::Inconclusive { edge, confidence })
            }
            Assessment::Confident(top) => {
                info!(
                    transformer_id = %transformer,
                    edge_id = %top.edge_id,
                    confidence = top.confidence,
                    affected_meters = top.downstream_meters.len(),
                    last_gasps = evidence.last_gasps.len(),
                    voltage_sags = evidence.voltage_sags.len(),
                    phase_losses = evidence.phase_losses.len(),
                    "fault located"
                );
                let opening = cases
                    .open_case(CaseRequest {
                        transformer_ref: transformer.clone(),
                        edge_ref: top.edge_id,
                        confidence: top.confidence,
                        affected_meters: top.downstream_meters,
                    })
                    .await?;
                Ok(match opening {
                    CaseOpening::Created(case) => Detection::Opened(case),
                    CaseOpening::Existing(case) => Detection::Deduplicated(case),
                })
            }
        }
    }
}
