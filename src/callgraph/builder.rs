use super::forest::{CallForest, CallGraphNode, NodeId};
use crate::instrument::MethodIndex;
use crate::trace::{TraceError, TracePosition, TraceReader, TraceRecord};
use std::io::BufRead;
use tracing::debug;

/// Folds a well-nested Enter/Exit stream into a [`CallForest`].
///
/// Each Enter opens a node under the innermost open call (or as a new root),
/// each Exit closes the innermost open call and stores the measured values.
pub struct CallGraphBuilder<'a> {
    index: Option<&'a MethodIndex>,
    check_exit_identity: bool,
    nodes: Vec<CallGraphNode>,
    open: Vec<NodeId>,
    completed_roots: Vec<NodeId>,
    records: usize,
}

impl Default for CallGraphBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CallGraphBuilder<'a> {
    pub fn new() -> Self {
        Self {
            index: None,
            check_exit_identity: false,
            nodes: Vec::new(),
            open: Vec::new(),
            completed_roots: Vec::new(),
            records: 0,
        }
    }

    /// Resolve Enter keys to full identities while building.
    pub fn with_index(mut self, index: &'a MethodIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Reject Exit records naming a different method than the open call.
    pub fn check_exit_identity(mut self, enabled: bool) -> Self {
        self.check_exit_identity = enabled;
        self
    }

    /// Number of calls currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn records_seen(&self) -> usize {
        self.records
    }

    pub fn push(&mut self, position: TracePosition, record: TraceRecord) -> Result<(), TraceError> {
        self.records += 1;
        match record {
            TraceRecord::Enter { method } => {
                let identity = self.index.and_then(|index| index.get(&method).cloned());
                let parent = self.open.last().copied();
                let id = NodeId(self.nodes.len());
                self.nodes
                    .push(CallGraphNode::open(method, identity, parent, self.open.len()));
                if let Some(parent) = parent {
                    self.nodes[parent.0].children.push(id);
                }
                self.open.push(id);
            }
            TraceRecord::Exit {
                method,
                energy_uj,
                duration_ns,
            } => {
                let Some(&id) = self.open.last() else {
                    return Err(TraceError::UnbalancedExit {
                        position,
                        partial: Box::new(self.completed()),
                    });
                };
                if self.check_exit_identity && self.nodes[id.0].method != method {
                    return Err(TraceError::MismatchedExit {
                        position,
                        expected: self.nodes[id.0].method.clone(),
                        found: method,
                        partial: Box::new(self.completed()),
                    });
                }
                let node = &mut self.nodes[id.0];
                node.energy_uj = energy_uj;
                node.duration_ns = duration_ns;
                self.open.pop();
                if node.parent.is_none() {
                    self.completed_roots.push(id);
                }
            }
        }
        Ok(())
    }

    /// Forest of the roots whose calls have all closed so far.
    pub fn completed(&self) -> CallForest {
        CallForest::extract(&self.nodes, &self.completed_roots, |_| true)
    }

    pub fn finish(self) -> Result<CallForest, TraceError> {
        if !self.open.is_empty() {
            let open = self
                .open
                .iter()
                .map(|id| self.nodes[id.0].method.clone())
                .collect();
            return Err(TraceError::UnterminatedCalls {
                open,
                partial: Box::new(self.completed()),
            });
        }

        debug!(
            records = self.records,
            nodes = self.nodes.len(),
            roots = self.completed_roots.len(),
            "Call forest built"
        );
        // Every node belongs to a completed root and ids were assigned on
        // Enter, so the arena is already in preorder.
        Ok(CallForest::from_parts(self.nodes, self.completed_roots))
    }

    pub fn build_from_reader<R: BufRead>(mut self, reader: R) -> Result<CallForest, TraceError> {
        for item in TraceReader::new(reader) {
            let (position, record) = match item {
                Ok(item) => item,
                Err(err) => return Err(err.with_partial(self.completed())),
            };
            self.push(position, record)?;
        }
        self.finish()
    }

    /// Positions are synthesized as one record per line.
    pub fn build_from_records(
        mut self,
        records: impl IntoIterator<Item = TraceRecord>,
    ) -> Result<CallForest, TraceError> {
        for (i, record) in records.into_iter().enumerate() {
            let position = TracePosition {
                line: i + 1,
                offset: 0,
            };
            self.push(position, record)?;
        }
        self.finish()
    }
}
