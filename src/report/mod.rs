//! Renderings of a call forest: the text tree, the JSON measurement model,
//! the per-method summary and flamegraph input.

pub mod flame;
pub mod model;
pub mod summary;
pub mod tree;

pub use flame::{build_collapsed_stacks, render_collapsed, render_flamegraph, CollapsedStack};
pub use model::{MeasureDefinition, MeasurementModel, ModelNode};
pub use summary::render_summary;
pub use tree::TreeRenderer;

/// Format a measured value with trailing zeros trimmed.
pub fn format_value(value: f64) -> String {
    let rounded = format!("{:.3}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
