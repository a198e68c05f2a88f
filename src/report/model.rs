use crate::callgraph::{CallForest, Quantity, Unit};
use crate::instrument::MethodIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of the measure library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureDefinition {
    pub name: String,
    pub unit: Unit,
    pub description: String,
}

impl MeasureDefinition {
    pub fn for_quantity(quantity: Quantity) -> Self {
        let unit = quantity.unit();
        Self {
            name: quantity.name().to_string(),
            unit,
            description: unit.description().to_string(),
        }
    }
}

/// One invocation. Only cumulative values are persisted; exclusive values
/// are derived by readers.
///
/// Nodes are stored flat in Enter order and point at each other by `id`, so
/// neither writing nor reading the model recurses with the call depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    pub depth: usize,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<MethodIdentity>,
    pub energy: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
}

impl ModelNode {
    pub fn cumulative(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Energy => self.energy,
            Quantity::Duration => self.duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementModel {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub measures: Vec<MeasureDefinition>,
    /// Ids of the root invocations, in trace order.
    pub roots: Vec<usize>,
    pub nodes: Vec<ModelNode>,
}

impl MeasurementModel {
    pub fn from_forest(forest: &CallForest) -> Self {
        let nodes = forest
            .iter()
            .map(|(id, node)| ModelNode {
                id: id.index(),
                parent: node.parent.map(|p| p.index()),
                depth: node.depth,
                method: node.method.clone(),
                identity: node.identity.clone(),
                energy: node.energy_uj,
                duration: node.duration_ns,
                children: node.children.iter().map(|c| c.index()).collect(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            source: None,
            measures: Quantity::ALL
                .iter()
                .map(|&q| MeasureDefinition::for_quantity(q))
                .collect(),
            roots: forest.roots().iter().map(|r| r.index()).collect(),
            nodes,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: usize) -> Option<&ModelNode> {
        self.nodes.get(id)
    }

    pub fn children(&self, id: usize) -> impl Iterator<Item = &ModelNode> {
        self.node(id)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .filter_map(move |&child| self.node(child))
    }

    /// Exclusive value: cumulative minus the direct callees' cumulative.
    pub fn self_value(&self, id: usize, quantity: Quantity) -> Option<f64> {
        let node = self.node(id)?;
        let callees: f64 = self.children(id).map(|c| c.cumulative(quantity)).sum();
        Some(node.cumulative(quantity) - callees)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
