use crate::callgraph::{CallForest, NodeId, Quantity};
use inferno::flamegraph::{self, Options};
use std::collections::BTreeMap;
use std::io::Write;

/// One line of collapsed-stack input: `root;caller;callee weight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    pub stack: String,
    pub weight: u64,
}

impl CollapsedStack {
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Identical call paths are merged; each node contributes its exclusive
/// value, rounded and clamped at zero. Zero-weight stacks are dropped.
pub fn build_collapsed_stacks(forest: &CallForest, quantity: Quantity) -> Vec<CollapsedStack> {
    let mut weights: BTreeMap<String, u64> = BTreeMap::new();
    let mut pending: Vec<(NodeId, String)> = forest
        .roots()
        .iter()
        .rev()
        .map(|&root| (root, String::new()))
        .collect();

    while let Some((id, parent_path)) = pending.pop() {
        let node = forest.node(id);
        let path = if parent_path.is_empty() {
            node.method.clone()
        } else {
            format!("{};{}", parent_path, node.method)
        };

        let weight = forest.self_value(id, quantity).round().max(0.0) as u64;
        if weight > 0 {
            *weights.entry(path.clone()).or_insert(0) += weight;
        }

        for &child in node.children.iter().rev() {
            pending.push((child, path.clone()));
        }
    }

    weights
        .into_iter()
        .map(|(stack, weight)| CollapsedStack { stack, weight })
        .collect()
}

pub fn render_collapsed(stacks: &[CollapsedStack]) -> String {
    let mut out = String::new();
    for stack in stacks {
        out.push_str(&stack.to_line());
        out.push('\n');
    }
    out
}

/// Write an SVG flamegraph of the exclusive values.
pub fn render_flamegraph<W: Write>(
    forest: &CallForest,
    quantity: Quantity,
    title: &str,
    writer: W,
) -> std::io::Result<()> {
    let lines: Vec<String> = build_collapsed_stacks(forest, quantity)
        .iter()
        .map(CollapsedStack::to_line)
        .collect();
    if lines.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "no positive measurements to draw",
        ));
    }

    let mut options = Options::default();
    options.title = title.to_string();
    options.count_name = quantity.unit().symbol().to_string();
    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), writer)
        .map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::CallGraphBuilder;
    use crate::trace::TraceRecord;

    fn forest() -> CallForest {
        CallGraphBuilder::new()
            .build_from_records(vec![
                TraceRecord::enter("m$main"),
                TraceRecord::enter("m$a"),
                TraceRecord::exit("m$a", 3.0, 30.0),
                TraceRecord::enter("m$a"),
                TraceRecord::exit("m$a", 2.4, 20.0),
                TraceRecord::exit("m$main", 5.4, 100.0),
            ])
            .unwrap()
    }

    #[test]
    fn repeated_paths_are_merged() {
        let stacks = build_collapsed_stacks(&forest(), Quantity::Energy);
        assert_eq!(
            render_collapsed(&stacks),
            "m$main;m$a 5\n"
        );
    }

    #[test]
    fn duration_weights_include_parent_self_time() {
        let stacks = build_collapsed_stacks(&forest(), Quantity::Duration);
        assert_eq!(
            stacks,
            vec![
                CollapsedStack { stack: "m$main".into(), weight: 50 },
                CollapsedStack { stack: "m$main;m$a".into(), weight: 50 },
            ]
        );
    }

    #[test]
    fn flamegraph_is_svg() {
        let mut svg = Vec::new();
        render_flamegraph(&forest(), Quantity::Duration, "test", &mut svg).unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("<svg"));
    }
}
