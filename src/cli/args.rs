use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "joule-trace")]
#[command(
    about = "Per-function energy and time profiling for WebAssembly programs",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and requested output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use ASCII instead of box-drawing characters
    #[arg(long, global = true, env = "JOULE_TRACE_NO_UNICODE")]
    pub no_unicode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn to_log_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Insert entry and exit probes into compiled units
    Instrument(InstrumentArgs),

    /// Rebuild the call forest from a trace and report it
    Analyze(AnalyzeArgs),

    /// List the methods of a compiled unit and their probe keys
    Inspect(InspectArgs),

    /// Build, instrument, run and analyze a target in one go
    Measure(MeasureArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Indented call tree: method : cumulative : self
    Tree,
    /// Per-method totals
    Summary,
    /// Measurement model as JSON
    Json,
    /// Collapsed stacks for flamegraph tools
    Collapsed,
    /// SVG flamegraph
    Flamegraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuantityArg {
    /// Microjoules
    Energy,
    /// Nanoseconds
    Duration,
}

#[derive(Parser)]
pub struct InstrumentArgs {
    /// Compiled units (.wasm) or directories containing them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving the instrumented units
    #[arg(short, long)]
    pub output: PathBuf,

    /// Leave matching methods uninstrumented (repeatable). Supports:
    ///   prefix*       match keys starting with prefix
    ///   re:<regex>    match keys by regex
    ///   exact_key     match key exactly
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Fail on the first method that cannot be instrumented
    #[arg(long)]
    pub strict: bool,

    /// Import module name of the probe functions
    #[arg(long, value_name = "MODULE")]
    pub probe_module: Option<String>,

    /// Write per-unit instrumentation reports as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Trace file written by the probe runtime
    pub trace: PathBuf,

    /// Compiled units used to resolve method identities, original or instrumented
    #[arg(long, num_args = 1..)]
    pub units: Vec<PathBuf>,

    /// Output format (default from config, else tree)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Quantity shown in tree, summary and flamegraph output
    #[arg(long, value_enum)]
    pub quantity: Option<QuantityArg>,

    /// Drop calls to matching methods, with their callees, before reporting
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Deepest call level shown in the tree
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Number of methods shown in the summary
    #[arg(long)]
    pub top: Option<usize>,

    /// Fail when an Exit record names a different method than the open call
    #[arg(long)]
    pub check_exit_identity: bool,

    /// Report the calls completed before the trace ended or broke
    #[arg(long)]
    pub allow_partial: bool,

    /// Slack before a node counts as measuring less than its callees
    #[arg(long)]
    pub tolerance: Option<f64>,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Path to the compiled unit
    pub unit: PathBuf,

    /// Print the method index as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct MeasureArgs {
    /// Directory of the program to measure
    pub target: Option<PathBuf>,

    /// Output format (default from config, else tree)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Quantity shown in the report
    #[arg(long, value_enum)]
    pub quantity: Option<QuantityArg>,

    /// Reuse existing artifacts instead of running the build command
    #[arg(long)]
    pub skip_build: bool,

    /// Leave matching methods uninstrumented (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Fail on the first method that cannot be instrumented
    #[arg(long)]
    pub strict: bool,

    /// Report the calls completed before the trace ended or broke
    #[arg(long)]
    pub allow_partial: bool,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
