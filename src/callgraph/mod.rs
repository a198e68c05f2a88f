pub mod builder;
pub mod forest;
pub mod measurement;

pub use builder::CallGraphBuilder;
pub use forest::{CallForest, CallGraphNode, MethodSummary, NodeId};
pub use measurement::{Measurement, MeasurementInvariantViolation, Quantity, Unit};
