use crate::instrument::{InstrumentOptions, MethodFilter, DEFAULT_PROBE_MODULE};
use crate::{JouleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration file looked up in the target and working directories.
pub const DEFAULT_CONFIG_FILE: &str = ".joule-trace.toml";

/// Default name of the trace file written by the probe runtime.
pub const DEFAULT_TRACE_FILE: &str = "energy.trace";

pub const DEFAULT_BUILD_COMMAND: &str = "cargo build --release --target wasm32-unknown-unknown";
pub const DEFAULT_ARTIFACTS_DIR: &str = "target/wasm32-unknown-unknown/release";
pub const DEFAULT_OUTPUT_DIR: &str = ".joule";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InstrumentConfig {
    /// Import module name of the probe functions
    #[serde(default)]
    pub probe_module: Option<String>,
    /// Method key patterns left uninstrumented (`prefix*`, `re:<regex>`, exact)
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Abort on the first method that cannot be instrumented
    #[serde(default)]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TraceConfig {
    /// Trace file name, relative to the target directory
    #[serde(default)]
    pub file: Option<String>,
    /// Fail when an Exit record names a different method than the open call
    #[serde(default)]
    pub check_exit_identity: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PipelineConfig {
    /// Command building the target's compiled units
    #[serde(default)]
    pub build: Option<String>,
    /// Command running the instrumented program
    #[serde(default)]
    pub run: Option<String>,
    /// Directory holding the built units, relative to the target directory
    #[serde(default)]
    pub artifacts: Option<PathBuf>,
    /// Directory receiving instrumented units and reports
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReportConfig {
    /// Default report format (tree, summary, json, collapsed, flamegraph)
    #[serde(default)]
    pub format: Option<String>,
    /// Default quantity (energy, duration)
    #[serde(default)]
    pub quantity: Option<String>,
    /// Slack allowed before a node counts as measuring less than its callees
    #[serde(default)]
    pub invariant_tolerance: Option<f64>,
}

impl InstrumentConfig {
    /// Options for the instrumenter, with extra exclusions from the command line.
    pub fn to_options(&self, extra_exclude: &[String], strict: bool) -> Result<InstrumentOptions> {
        let patterns: Vec<String> = self
            .exclude
            .iter()
            .chain(extra_exclude.iter())
            .cloned()
            .collect();
        let exclude = MethodFilter::new(&patterns)
            .map_err(|e| JouleError::ConfigError(format!("invalid exclude pattern: {}", e)))?;

        Ok(InstrumentOptions {
            probe_module: self
                .probe_module
                .clone()
                .unwrap_or_else(|| DEFAULT_PROBE_MODULE.to_string()),
            exclude,
            strict: strict || self.strict.unwrap_or(false),
        })
    }
}

impl TraceConfig {
    pub fn file_name(&self) -> &str {
        self.file.as_deref().unwrap_or(DEFAULT_TRACE_FILE)
    }
}

impl PipelineConfig {
    pub fn build_command(&self) -> &str {
        self.build.as_deref().unwrap_or(DEFAULT_BUILD_COMMAND)
    }

    pub fn artifacts_dir(&self, target: &Path) -> PathBuf {
        target.join(
            self.artifacts
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_ARTIFACTS_DIR)),
        )
    }

    pub fn output_dir(&self, target: &Path) -> PathBuf {
        target.join(
            self.output_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR)),
        )
    }
}

impl ReportConfig {
    pub fn tolerance(&self) -> f64 {
        self.invariant_tolerance.unwrap_or(0.0)
    }
}

impl Config {
    /// Candidate files in lookup order: target directory, working directory,
    /// then the user configuration directory.
    pub fn search_paths(target: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(target) = target {
            paths.push(target.join(DEFAULT_CONFIG_FILE));
        }
        paths.push(PathBuf::from(DEFAULT_CONFIG_FILE));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("joule-trace").join("config.toml"));
        }
        paths
    }

    /// Load the first configuration file found, if any.
    pub fn load(target: Option<&Path>) -> Result<Option<(Self, PathBuf)>> {
        for path in Self::search_paths(target) {
            if path.is_file() {
                let config = Self::load_from(&path)?;
                debug!(path = %path.display(), "Loaded configuration");
                return Ok(Some((config, path)));
            }
        }
        Ok(None)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            JouleError::FileError(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            JouleError::ConfigError(format!(
                "Failed to parse TOML config from {:?}: {}",
                path, e
            ))
        })?;

        Ok(config)
    }

    /// Defaults when no file exists; a broken file is reported and ignored.
    pub fn load_or_default(target: Option<&Path>) -> Self {
        match Self::load(target) {
            Ok(Some((config, _))) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                warn!("Failed to load config: {}. Using defaults.", e);
                Config::default()
            }
        }
    }
}
