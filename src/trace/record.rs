//! Trace records and their line format.
//!
//! ```text
//! geometry$area            <- Enter
//! geometry$area;12.5;3400  <- Exit: method (unused), microjoules, nanoseconds
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field delimiter of the trace line format.
pub const FIELD_DELIMITER: char = ';';

/// Where a record sits in the trace: 1-based line and byte offset of the
/// line start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePosition {
    pub line: usize,
    pub offset: u64,
}

impl fmt::Display for TracePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} (byte {})", self.line, self.offset)
    }
}

/// One runtime event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceRecord {
    Enter {
        method: String,
    },
    /// `method` is informational only; exits match their enter by stack
    /// position.
    Exit {
        method: String,
        energy_uj: f64,
        duration_ns: f64,
    },
}

impl TraceRecord {
    pub fn enter(method: impl Into<String>) -> Self {
        TraceRecord::Enter {
            method: method.into(),
        }
    }

    pub fn exit(method: impl Into<String>, energy_uj: f64, duration_ns: f64) -> Self {
        TraceRecord::Exit {
            method: method.into(),
            energy_uj,
            duration_ns,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            TraceRecord::Enter { method } | TraceRecord::Exit { method, .. } => method,
        }
    }

    pub fn is_enter(&self) -> bool {
        matches!(self, TraceRecord::Enter { .. })
    }

    /// Parse one line. `Ok(None)` for blank lines.
    pub fn parse_line(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        match fields.as_slice() {
            [method] => Ok(Some(TraceRecord::enter(*method))),
            [method, energy, duration] => {
                let energy_uj = parse_quantity("energy", energy)?;
                let duration_ns = parse_quantity("duration", duration)?;
                Ok(Some(TraceRecord::exit(*method, energy_uj, duration_ns)))
            }
            other => Err(format!(
                "expected 1 or 3 fields separated by '{}', found {}",
                FIELD_DELIMITER,
                other.len()
            )),
        }
    }
}

fn parse_quantity(name: &str, raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid {} value '{}': {}", name, raw, e))?;
    if !value.is_finite() {
        return Err(format!("{} value '{}' is not finite", name, raw));
    }
    Ok(value)
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceRecord::Enter { method } => write!(f, "{}", method),
            TraceRecord::Exit {
                method,
                energy_uj,
                duration_ns,
            } => write!(
                f,
                "{}{d}{}{d}{}",
                method,
                energy_uj,
                duration_ns,
                d = FIELD_DELIMITER
            ),
        }
    }
}
