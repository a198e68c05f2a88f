use super::forest::NodeId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The measured quantities attached to every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Energy,
    Duration,
}

impl Quantity {
    pub const ALL: [Quantity; 2] = [Quantity::Energy, Quantity::Duration];

    pub fn name(&self) -> &'static str {
        match self {
            Quantity::Energy => "energy",
            Quantity::Duration => "duration",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Quantity::Energy => Unit::Microjoule,
            Quantity::Duration => Unit::Nanosecond,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Quantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "energy" | "uj" => Ok(Quantity::Energy),
            "duration" | "time" | "ns" => Ok(Quantity::Duration),
            other => Err(format!("unknown quantity '{}', expected energy or duration", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "uj")]
    Microjoule,
    #[serde(rename = "ns")]
    Nanosecond,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Microjoule => "uj",
            Unit::Nanosecond => "ns",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Unit::Microjoule => "MicroJoule energy unit",
            Unit::Nanosecond => "Nanoseconds time duration",
        }
    }
}

/// A named scalar attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub quantity: Quantity,
    pub unit: Unit,
    pub value: f64,
}

impl Measurement {
    pub fn new(quantity: Quantity, value: f64) -> Self {
        Self {
            quantity,
            unit: quantity.unit(),
            value,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

/// A node measured less than its children together. Data-quality warning,
/// callers decide whether it is fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Diagnostic)]
#[error(
    "`{method}` reports {quantity} {cumulative} but its callees add up to {children_total}"
)]
#[diagnostic(
    code(callgraph::measurement_invariant),
    severity(Warning),
    help("The energy counter may have wrapped or been sampled out of order.")
)]
pub struct MeasurementInvariantViolation {
    pub node: NodeId,
    pub method: String,
    pub quantity: Quantity,
    pub cumulative: f64,
    pub children_total: f64,
}
