//! Edge fault-likelihood scoring.
//!
//! For every edge of a transformer the meter cohort is split into the meters
//! fed through that edge (downstream) and the rest (upstream), and three
//! signals are combined:
//!
//! - `s1`: last-gasp count downstream
//! - `s2`: median sag depth downstream minus median sag depth upstream
//! - `s3`: fraction of downstream meters reporting a phase loss
//!
//! `score = 0.6*s1 + 0.3*max(0, s2) + 0.1*s3`, `confidence = min(score/10, 0.95)`.

use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::domain::{EdgeId, Event, EventKind, MeterId, TransformerId};
use crate::topology::Topology;

pub const LAST_GASP_WEIGHT: f64 = 0.6;
pub const SAG_WEIGHT: f64 = 0.3;
pub const PHASE_LOSS_WEIGHT: f64 = 0.1;
pub const SCORE_NORMALIZER: f64 = 10.0;
/// Confidence never reaches certainty
pub const CONFIDENCE_CAP: f64 = 0.95;

/// Fault evidence from one scoring window, split by kind
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub last_gasps: Vec<Event>,
    pub voltage_sags: Vec<Event>,
    pub phase_losses: Vec<Event>,
}

impl Evidence {
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut evidence = Self::default();
        for event in events {
            match event.kind() {
                EventKind::LastGasp => evidence.last_gasps.push(event),
                EventKind::VoltageSag => evidence.voltage_sags.push(event),
                EventKind::PhaseLoss => evidence.phase_losses.push(event),
                EventKind::Telemetry => {}
            }
        }
        evidence
    }

    pub fn last_gasp_count(&self) -> usize {
        self.last_gasps.len()
    }
}

/// Signal breakdown for one edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeSignals {
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl EdgeSignals {
    pub fn score(&self) -> f64 {
        LAST_GASP_WEIGHT * self.s1 + SAG_WEIGHT * self.s2.max(0.0) + PHASE_LOSS_WEIGHT * self.s3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEdge {
    pub edge_id: EdgeId,
    pub signals: EdgeSignals,
    pub score: f64,
    pub confidence: f64,
    /// Meters fed through this edge; become the case's affected meters
    pub downstream_meters: BTreeSet<MeterId>,
}

/// Outcome of evaluating one transformer's evidence window
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    /// Too few last-gasps to bother scoring
    InsufficientEvidence { last_gasps: usize },
    /// Scored, but no edge reached the confidence threshold
    Inconclusive { top: Option<ScoredEdge> },
    /// Top-ranked edge is confident enough to open a case
    Confident(ScoredEdge),
}

pub fn confidence_for(score: f64) -> f64 {
    (score / SCORE_NORMALIZER).clamp(0.0, CONFIDENCE_CAP)
}

/// Median with the mean of the two middle values for even sizes; 0 when empty.
pub fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by_key(|v| OrderedFloat(*v));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[derive(Debug, Clone)]
pub struct EdgeScorer {
    pub min_last_gasps: usize,
    pub confidence_threshold: f64,
}

impl Default for EdgeScorer {
    fn default() -> Self {
        Self {
            min_last_gasps: 2,
            confidence_threshold: 0.7,
        }
    }
}

impl EdgeScorer {
    pub fn new(min_last_gasps: usize, confidence_threshold: f64) -> Self {
        Self {
            min_last_gasps,
            confidence_threshold,
        }
    }

    /// Gate, rank and apply the confidence threshold.
    pub fn evaluate(&self, topology: &Topology, transformer: &TransformerId, evidence: &Evidence) -> Assessment {
        let last_gasps = evidence.last_gasp_count();
        if last_gasps < self.min_last_gasps {
            return Assessment::InsufficientEvidence { last_gasps };
        }

        let top = self.rank(topology, transformer, evidence).into_iter().next();
        match top {
            Some(edge) if edge.confidence >= self.confidence_threshold => Assessment::Confident(edge),
            top => Assessment::Inconclusive { top },
        }
    }

    /// Score every edge of `transformer`, best first; ties go to the lower edge id.
    pub fn rank(&self, topology: &Topology, transformer: &TransformerId, evidence: &Evidence) -> Vec<ScoredEdge> {
        let mut scored: Vec<ScoredEdge> = topology
            .edges_of(transformer)
            .into_iter()
            .map(|edge| {
                let partition = topology.partition(edge);
                let signals = signals(&partition.downstream, &partition.upstream, evidence);
                let score = signals.score();
                ScoredEdge {
                    edge_id: edge.id.clone(),
                    signals,
                    score,
                    confidence: confidence_for(score),
                    downstream_meters: partition.downstream,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            OrderedFloat(b.score)
                .cmp(&OrderedFloat(a.score))
                .then_with(|| a.edge_id.cmp(&b.edge_id))
        });
        scored
    }
}

fn signals(downstream: &BTreeSet<MeterId>, upstream: &BTreeSet<MeterId>, evidence: &Evidence) -> EdgeSignals {
    let s1 = events_within(&evidence.last_gasps, downstream).count() as f64;

    let s2 = median_sag_depth(&evidence.voltage_sags, downstream)
        - median_sag_depth(&evidence.voltage_sags, upstream);

    let s3 = if downstream.is_empty() {
        0.0
    } else {
        let reporting: HashSet<&MeterId> = events_within(&evidence.phase_losses, downstream)
            .filter_map(|e| e.meter_ref.as_ref())
            .collect();
        reporting.len() as f64 / downstream.len() as f64
    };

    EdgeSignals { s1, s2, s3 }
}

fn events_within<'a>(events: &'a [Event], meters: &'a BTreeSet<MeterId>) -> impl Iterator<Item = &'a Event> {
    events
        .iter()
        .filter(move |e| e.meter_ref.as_ref().is_some_and(|m| meters.contains(m)))
}

fn median_sag_depth(sags: &[Event], meters: &BTreeSet<MeterId>) -> f64 {
    median(events_within(sags, meters).filter_map(Event::sag_depth).collect())
}
