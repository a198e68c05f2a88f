pub mod args;
pub mod commands;

pub use args::{
    AnalyzeArgs, Cli, Commands, CompletionsArgs, InspectArgs, InstrumentArgs, MeasureArgs,
    QuantityArg, ReportFormat, Verbosity,
};
