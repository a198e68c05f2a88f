use crate::callgraph::MeasurementInvariantViolation;
use crate::instrument::InstrumentationReport;
use crate::output::{OutputConfig, StatusLabel};
use crate::report::format_value;
use crossterm::style::Stylize;

/// Pretty printing of status output.
pub struct Formatter;

impl Formatter {
    /// A section title underlined with a double rule.
    pub fn format_header(title: &str) -> String {
        let width = title.chars().count().max(20);
        format!("{}\n{}", Self::info(title), OutputConfig::double_rule_line(width))
    }

    /// One line per instrumented unit, then any methods left untouched.
    pub fn format_instrumentation_report(report: &InstrumentationReport) -> String {
        let label = if report.failed.is_empty() {
            StatusLabel::Pass
        } else {
            StatusLabel::Warning
        };
        let mut lines = vec![Self::status(
            label,
            &format!(
                "{}: {} method(s) instrumented, {} excluded, {} failed",
                report.unit,
                report.instrumented.len(),
                report.excluded.len(),
                report.failed.len()
            ),
        )];
        for skipped in &report.failed {
            lines.push(format!(
                "  {} {}: {}",
                OutputConfig::bullet(),
                skipped.method,
                skipped.reason
            ));
        }
        lines.join("\n")
    }

    pub fn format_violation(violation: &MeasurementInvariantViolation) -> String {
        let unit = violation.quantity.unit().symbol();
        Self::status(
            StatusLabel::Warning,
            &format!(
                "{} (node {}): {} {} {} < callees {} {}",
                violation.method,
                violation.node,
                violation.quantity,
                format_value(violation.cumulative),
                unit,
                format_value(violation.children_total),
                unit
            ),
        )
    }

    /// Label plus message, colored by label when colors are on.
    pub fn status(label: StatusLabel, message: &str) -> String {
        let text = format!("{} {}", label.as_str(), message);
        match label {
            StatusLabel::Pass => Self::success(text),
            StatusLabel::Fail => Self::error(text),
            StatusLabel::Warning => Self::warning(text),
            StatusLabel::Info | StatusLabel::Skip => Self::info(text),
        }
    }

    /// Format an informational message in blue.
    pub fn info(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Info)
    }

    /// Format a success message in green.
    pub fn success(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Success)
    }

    /// Format a warning message in yellow.
    pub fn warning(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Warning)
    }

    /// Format an error message in red.
    pub fn error(message: impl AsRef<str>) -> String {
        Self::apply_color(message.as_ref(), ColorKind::Error)
    }

    fn apply_color(message: &str, kind: ColorKind) -> String {
        if !OutputConfig::colors_enabled() {
            return message.to_string();
        }

        match kind {
            ColorKind::Info => format!("{}", message.blue()),
            ColorKind::Success => format!("{}", message.green()),
            ColorKind::Warning => format!("{}", message.yellow()),
            ColorKind::Error => format!("{}", message.red()),
        }
    }
}

#[derive(Copy, Clone)]
enum ColorKind {
    Info,
    Success,
    Warning,
    Error,
}
