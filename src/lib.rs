pub mod callgraph;
pub mod cli;
pub mod config;
pub mod instrument;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod trace;
pub mod ui;
pub mod utils;

use miette::Diagnostic;

pub use callgraph::{CallForest, CallGraphBuilder, CallGraphNode, NodeId, Quantity};
pub use instrument::{CompiledUnit, InstrumentationError, Instrumenter, MethodIdentity, MethodIndex};
pub use trace::{TraceError, TraceRecord};

/// Result type alias for the profiler
pub type Result<T> = miette::Result<T>;

/// Error types for the profiler outside of the instrumentation and trace cores
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum JouleError {
    #[error("File operation failed: {0}")]
    #[diagnostic(
        code(joule::file_error),
        help("Check if you have necessary permissions and that the path exists.")
    )]
    FileError(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(joule::config_error),
        help("Check the syntax of .joule-trace.toml. Run with --verbose to see which file was loaded.")
    )]
    ConfigError(String),

    #[error("Pipeline step `{step}` failed: {reason}")]
    #[diagnostic(
        code(joule::pipeline_failed),
        help("Run the configured command by hand in the target directory to see its full output.")
    )]
    PipelineError { step: String, reason: String },

    #[error("No compiled units found in {0}")]
    #[diagnostic(
        code(joule::no_units),
        help("Build the target for wasm32 first, or point `pipeline.artifacts` at the directory holding the .wasm files.")
    )]
    NoUnits(String),

    #[error("No target directory given")]
    #[diagnostic(
        code(joule::missing_target),
        help("Pass the directory of the program to measure, e.g. `joule-trace measure ./my-app`.")
    )]
    MissingTarget,

    #[error("Report generation failed: {0}")]
    #[diagnostic(code(joule::report_failed))]
    ReportError(String),
}
