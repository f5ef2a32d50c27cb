//! Queryable LT network graph.
//!
//! Each transformer owns a radial graph of nodes joined by directed edges
//! (power flows `from_node -> to_node`), with meters hanging off nodes. The
//! graph is built once (seed or external loader) and read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::domain::{Edge, EdgeId, Meter, MeterId, NodeId, Transformer, TransformerId};
use crate::error::{GridError, Result};

/// Split of a transformer's meter cohort relative to one edge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub downstream: BTreeSet<MeterId>,
    pub upstream: BTreeSet<MeterId>,
}

#[derive(Debug, Default)]
pub struct Topology {
    transformers: BTreeMap<TransformerId, Transformer>,
    edges: BTreeMap<EdgeId, Edge>,
    meters: BTreeMap<MeterId, Meter>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transformer(&mut self, transformer: Transformer) {
        self.transformers.insert(transformer.id.clone(), transformer);
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        self.require_transformer(&edge.transformer)?;
        if edge.from_node == edge.to_node {
            return Err(GridError::validation(format!("edge {} is a self-loop", edge.id)));
        }
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn add_meter(&mut self, meter: Meter) -> Result<()> {
        self.require_transformer(&meter.transformer)?;
        self.meters.insert(meter.id.clone(), meter);
        Ok(())
    }

    pub fn transformer(&self, id: &TransformerId) -> Option<&Transformer> {
        self.transformers.get(id)
    }

    pub fn transformers(&self) -> impl Iterator<Item = &Transformer> {
        self.transformers.values()
    }

    pub fn meter(&self, id: &MeterId) -> Option<&Meter> {
        self.meters.get(id)
    }

    /// Transformer a meter is supplied from
    pub fn transformer_of_meter(&self, id: &MeterId) -> Option<&TransformerId> {
        self.meters.get(id).map(|m| &m.transformer)
    }

    /// Edges of a transformer, ordered by edge id
    pub fn edges_of(&self, transformer: &TransformerId) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| &e.transformer == transformer)
            .collect()
    }

    /// Meters of a transformer, ordered by meter id
    pub fn meters_of(&self, transformer: &TransformerId) -> Vec<&Meter> {
        self.meters
            .values()
            .filter(|m| &m.transformer == transformer)
            .collect()
    }

    /// Partition the edge's transformer cohort into meters fed through the
    /// edge (reachable from its `to_node` following edge direction) and the rest.
    pub fn partition(&self, edge: &Edge) -> Partition {
        let reachable = self.reachable_from(&edge.transformer, &edge.to_node);
        let mut partition = Partition::default();
        for meter in self.meters_of(&edge.transformer) {
            if reachable.contains(&meter.node) {
                partition.downstream.insert(meter.id.clone());
            } else {
                partition.upstream.insert(meter.id.clone());
            }
        }
        partition
    }

    fn reachable_from<'a>(&'a self, transformer: &TransformerId, start: &'a NodeId) -> HashSet<&'a NodeId> {
        let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for edge in self.edges_of(transformer) {
            adjacency.entry(&edge.from_node).or_default().push(&edge.to_node);
        }

        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in adjacency.get(node).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        seen
    }

    fn require_transformer(&self, id: &TransformerId) -> Result<()> {
        if self.transformers.contains_key(id) {
            Ok(())
        } else {
            Err(GridError::not_found("Transformer", id))
        }
    }
}
