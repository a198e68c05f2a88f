//! Structured logging helpers.
//!
//! Thin wrappers around `tracing` so the same events carry the same field
//! names wherever they are emitted.

use std::path::Path;

pub fn log_loading_unit(path: &Path) {
    tracing::info!(unit = %path.display(), "Loading compiled unit");
}

pub fn log_unit_loaded(name: &str, bytes: usize) {
    tracing::debug!(unit = name, bytes, "Compiled unit loaded");
}

pub fn log_index_built(units: usize, methods: usize) {
    tracing::info!(units, methods, "Method index built");
}

pub fn log_unit_instrumented(name: &str, instrumented: usize, failed: usize) {
    tracing::info!(unit = name, instrumented, failed, "Unit instrumented");
}

pub fn log_unit_skipped(name: &str, reason: &str) {
    tracing::warn!(unit = name, reason, "Unit skipped");
}

pub fn log_trace_loading(path: &Path) {
    tracing::info!(trace = %path.display(), "Reading trace");
}

pub fn log_forest_built(nodes: usize, roots: usize, depth: usize) {
    tracing::info!(nodes, roots, depth, "Call forest reconstructed");
}

pub fn log_partial_forest(roots: usize, reason: &str) {
    tracing::warn!(roots, reason, "Trace incomplete, keeping completed calls");
}

pub fn log_invariant_violations(count: usize) {
    tracing::warn!(count, "Nodes measured below the sum of their callees");
}

pub fn log_pipeline_step(step: &str, command: &str) {
    tracing::info!(step, command, "Running pipeline step");
}

pub fn log_report_written(path: &Path, format: &str) {
    tracing::info!(path = %path.display(), format, "Report written");
}
