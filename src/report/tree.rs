use super::format_value;
use crate::callgraph::{CallForest, NodeId, Quantity};
use crate::output::OutputConfig;

struct Glyphs {
    branch: &'static str,
    last: &'static str,
    pipe: &'static str,
    blank: &'static str,
}

const UNICODE_GLYPHS: Glyphs = Glyphs {
    branch: "├── ",
    last: "└── ",
    pipe: "│   ",
    blank: "    ",
};

const ASCII_GLYPHS: Glyphs = Glyphs {
    branch: "|-- ",
    last: "`-- ",
    pipe: "|   ",
    blank: "    ",
};

/// Renders one line per invocation, `method : cumulative : self`, indented
/// in call order.
pub struct TreeRenderer {
    pub quantity: Quantity,
    pub unicode: bool,
    pub max_depth: Option<usize>,
    pub show_units: bool,
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self {
            quantity: Quantity::Energy,
            unicode: !OutputConfig::no_unicode(),
            max_depth: None,
            show_units: true,
        }
    }
}

impl TreeRenderer {
    pub fn new(quantity: Quantity) -> Self {
        Self {
            quantity,
            ..Self::default()
        }
    }

    pub fn with_unicode(mut self, unicode: bool) -> Self {
        self.unicode = unicode;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn render(&self, forest: &CallForest) -> String {
        let glyphs = if self.unicode {
            &UNICODE_GLYPHS
        } else {
            &ASCII_GLYPHS
        };
        let mut out = String::new();

        // (node, prefix inherited from ancestors, connector for this line)
        let mut pending: Vec<(NodeId, String, &'static str)> = forest
            .roots()
            .iter()
            .rev()
            .map(|&root| (root, String::new(), ""))
            .collect();

        while let Some((id, prefix, connector)) = pending.pop() {
            let node = forest.node(id);
            out.push_str(&prefix);
            out.push_str(connector);
            out.push_str(&self.line(forest, id));
            out.push('\n');

            if self.max_depth.is_some_and(|max| node.depth >= max) {
                if !node.children.is_empty() {
                    out.push_str(&prefix);
                    out.push_str(if connector.is_empty() { "" } else { self.continuation(glyphs, connector) });
                    out.push_str(&format!("{}... {} more call(s)\n", glyphs.last, node.children.len()));
                }
                continue;
            }

            let child_prefix = if connector.is_empty() {
                prefix
            } else {
                format!("{}{}", prefix, self.continuation(glyphs, connector))
            };
            let count = node.children.len();
            for (i, &child) in node.children.iter().enumerate().rev() {
                let connector = if i + 1 == count { glyphs.last } else { glyphs.branch };
                pending.push((child, child_prefix.clone(), connector));
            }
        }

        out
    }

    fn continuation(&self, glyphs: &Glyphs, connector: &str) -> &'static str {
        if connector == glyphs.last {
            glyphs.blank
        } else {
            glyphs.pipe
        }
    }

    fn line(&self, forest: &CallForest, id: NodeId) -> String {
        let node = forest.node(id);
        let cumulative = format_value(forest.cumulative(id, self.quantity));
        let exclusive = format_value(forest.self_value(id, self.quantity));
        if self.show_units {
            let unit = self.quantity.unit().symbol();
            format!("{} : {} {} : {} {}", node.method, cumulative, unit, exclusive, unit)
        } else {
            format!("{} : {} : {}", node.method, cumulative, exclusive)
        }
    }
}
