//! The immutable call forest produced from a trace.
//!
//! Nodes live in an arena and are numbered in the order their Enter records
//! appeared, so a node's id is also its position in a depth-first preorder
//! walk.

use super::measurement::{Measurement, MeasurementInvariantViolation, Quantity};
use crate::instrument::MethodIdentity;
use crate::trace::TraceRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One dynamic invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CallGraphNode {
    /// Probe key from the Enter record.
    pub method: String,
    /// Full identity when the key is known to the method index.
    pub identity: Option<MethodIdentity>,
    pub energy_uj: f64,
    pub duration_ns: f64,
    pub parent: Option<NodeId>,
    /// Callees in call order.
    pub children: Vec<NodeId>,
    pub depth: usize,
}

impl CallGraphNode {
    pub(crate) fn open(method: String, identity: Option<MethodIdentity>, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            method,
            identity,
            energy_uj: 0.0,
            duration_ns: 0.0,
            parent,
            children: Vec::new(),
            depth,
        }
    }

    pub fn cumulative(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Energy => self.energy_uj,
            Quantity::Duration => self.duration_ns,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Per-method aggregate over a forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSummary {
    pub method: String,
    pub calls: usize,
    /// Counted once per recursion chain.
    pub inclusive_energy_uj: f64,
    pub self_energy_uj: f64,
    pub inclusive_duration_ns: f64,
    pub self_duration_ns: f64,
}

impl MethodSummary {
    pub fn self_value(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Energy => self.self_energy_uj,
            Quantity::Duration => self.self_duration_ns,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallForest {
    nodes: Vec<CallGraphNode>,
    roots: Vec<NodeId>,
}

impl CallForest {
    pub(crate) fn from_parts(nodes: Vec<CallGraphNode>, roots: Vec<NodeId>) -> Self {
        Self { nodes, roots }
    }

    /// Copy the subtrees under `roots`, dropping every node for which `keep`
    /// is false together with its descendants. Ids are renumbered in preorder.
    pub(crate) fn extract(
        nodes: &[CallGraphNode],
        roots: &[NodeId],
        keep: impl Fn(&CallGraphNode) -> bool,
    ) -> Self {
        let mut out = CallForest::default();
        let mut pending: Vec<(NodeId, Option<NodeId>, usize)> =
            roots.iter().rev().map(|&id| (id, None, 0)).collect();

        while let Some((old, parent, depth)) = pending.pop() {
            let source = &nodes[old.0];
            if !keep(source) {
                continue;
            }

            let id = NodeId(out.nodes.len());
            out.nodes.push(CallGraphNode {
                method: source.method.clone(),
                identity: source.identity.clone(),
                energy_uj: source.energy_uj,
                duration_ns: source.duration_ns,
                parent,
                children: Vec::new(),
                depth,
            });
            match parent {
                Some(parent) => out.nodes[parent.0].children.push(id),
                None => out.roots.push(id),
            }

            for &child in source.children.iter().rev() {
                pending.push((child, Some(id), depth + 1));
            }
        }

        out
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &CallGraphNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&CallGraphNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in preorder.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CallGraphNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn cumulative(&self, id: NodeId, quantity: Quantity) -> f64 {
        self.node(id).cumulative(quantity)
    }

    /// Exclusive value: cumulative minus the cumulative values of the
    /// current children. Recomputed on every call.
    pub fn self_value(&self, id: NodeId, quantity: Quantity) -> f64 {
        let node = self.node(id);
        node.cumulative(quantity) - self.children_total(id, quantity)
    }

    fn children_total(&self, id: NodeId, quantity: Quantity) -> f64 {
        self.children(id)
            .iter()
            .map(|&child| self.cumulative(child, quantity))
            .sum()
    }

    pub fn measurements(&self, id: NodeId) -> [Measurement; 2] {
        let node = self.node(id);
        Quantity::ALL.map(|q| Measurement::new(q, node.cumulative(q)))
    }

    /// Sum over root invocations.
    pub fn total(&self, quantity: Quantity) -> f64 {
        self.roots.iter().map(|&r| self.cumulative(r, quantity)).sum()
    }

    /// Nodes whose cumulative value is below the sum of their children's.
    pub fn check_invariants(&self, tolerance: f64) -> Vec<MeasurementInvariantViolation> {
        let mut violations = Vec::new();
        for (id, node) in self.iter() {
            if node.children.is_empty() {
                continue;
            }
            for quantity in Quantity::ALL {
                let children_total = self.children_total(id, quantity);
                let cumulative = node.cumulative(quantity);
                if cumulative + tolerance < children_total {
                    violations.push(MeasurementInvariantViolation {
                        node: id,
                        method: node.method.clone(),
                        quantity,
                        cumulative,
                        children_total,
                    });
                }
            }
        }
        violations
    }

    /// Filtered copy without the subtrees rooted at rejected nodes.
    pub fn retain(&self, keep: impl Fn(&CallGraphNode) -> bool) -> CallForest {
        Self::extract(&self.nodes, &self.roots, keep)
    }

    /// Flatten back into Enter/Exit order with a depth-first walk.
    pub fn to_records(&self) -> Vec<TraceRecord> {
        let mut records = Vec::with_capacity(self.nodes.len() * 2);
        let mut pending: Vec<(NodeId, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();

        while let Some((id, closing)) = pending.pop() {
            let node = self.node(id);
            if closing {
                records.push(TraceRecord::exit(
                    node.method.clone(),
                    node.energy_uj,
                    node.duration_ns,
                ));
                continue;
            }

            records.push(TraceRecord::enter(node.method.clone()));
            pending.push((id, true));
            for &child in node.children.iter().rev() {
                pending.push((child, false));
            }
        }

        records
    }

    /// Aggregate invocations per method. Inclusive totals skip invocations
    /// nested inside another invocation of the same method so recursion is
    /// not counted twice. Sorted by self energy, highest first.
    pub fn method_summaries(&self) -> Vec<MethodSummary> {
        let mut summaries: BTreeMap<&str, MethodSummary> = BTreeMap::new();
        let mut active: HashMap<&str, usize> = HashMap::new();
        let mut pending: Vec<(NodeId, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();

        while let Some((id, closing)) = pending.pop() {
            let node = self.node(id);
            let key = node.method.as_str();

            if closing {
                if let Some(count) = active.get_mut(key) {
                    *count -= 1;
                }
                continue;
            }

            let outermost = active.get(key).copied().unwrap_or(0) == 0;
            let entry = summaries.entry(key).or_insert_with(|| MethodSummary {
                method: key.to_string(),
                calls: 0,
                inclusive_energy_uj: 0.0,
                self_energy_uj: 0.0,
                inclusive_duration_ns: 0.0,
                self_duration_ns: 0.0,
            });
            entry.calls += 1;
            entry.self_energy_uj += self.self_value(id, Quantity::Energy);
            entry.self_duration_ns += self.self_value(id, Quantity::Duration);
            if outermost {
                entry.inclusive_energy_uj += node.energy_uj;
                entry.inclusive_duration_ns += node.duration_ns;
            }

            *active.entry(key).or_insert(0) += 1;
            pending.push((id, true));
            for &child in node.children.iter().rev() {
                pending.push((child, false));
            }
        }

        let mut out: Vec<MethodSummary> = summaries.into_values().collect();
        out.sort_by(|a, b| b.self_energy_uj.total_cmp(&a.self_energy_uj));
        out
    }
}
