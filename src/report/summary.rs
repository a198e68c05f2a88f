use super::format_value;
use crate::callgraph::{CallForest, MethodSummary, Quantity};
use crate::output::OutputConfig;

const METHOD_WIDTH: usize = 40;

fn inclusive(summary: &MethodSummary, quantity: Quantity) -> f64 {
    match quantity {
        Quantity::Energy => summary.inclusive_energy_uj,
        Quantity::Duration => summary.inclusive_duration_ns,
    }
}

fn truncate(method: &str) -> String {
    if method.chars().count() <= METHOD_WIDTH {
        return method.to_string();
    }
    let head: String = method.chars().take(METHOD_WIDTH - 3).collect();
    format!("{}...", head)
}

/// Per-method table ordered by exclusive value, highest first.
pub fn render_summary(forest: &CallForest, quantity: Quantity, limit: Option<usize>) -> String {
    let mut summaries = forest.method_summaries();
    summaries.sort_by(|a, b| b.self_value(quantity).total_cmp(&a.self_value(quantity)));

    let total = forest.total(quantity);
    let unit = quantity.unit().symbol();
    let mut lines = Vec::new();
    lines.push(format!(
        "{:<width$} {:>7} {:>14} {:>14} {:>7}",
        "Method",
        "Calls",
        format!("Total ({})", unit),
        format!("Self ({})", unit),
        "Self %",
        width = METHOD_WIDTH
    ));
    lines.push(OutputConfig::rule_line(METHOD_WIDTH + 46));

    let shown = limit.unwrap_or(summaries.len()).min(summaries.len());
    for summary in &summaries[..shown] {
        let own = summary.self_value(quantity);
        let share = if total > 0.0 { own / total * 100.0 } else { 0.0 };
        lines.push(format!(
            "{:<width$} {:>7} {:>14} {:>14} {:>6.1}%",
            truncate(&summary.method),
            summary.calls,
            format_value(inclusive(summary, quantity)),
            format_value(own),
            share,
            width = METHOD_WIDTH
        ));
    }
    if shown < summaries.len() {
        lines.push(format!("... {} more method(s)", summaries.len() - shown));
    }

    lines.push(OutputConfig::rule_line(METHOD_WIDTH + 46));
    lines.push(format!(
        "{} invocation(s), {} method(s), total {} {}",
        forest.len(),
        summaries.len(),
        format_value(total),
        unit
    ));
    lines.join("\n")
}
