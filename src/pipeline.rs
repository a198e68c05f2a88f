//! The measurement workflow: build the target, instrument its units, run the
//! instrumented program and rebuild the call forest from its trace.

use crate::callgraph::{CallForest, CallGraphBuilder};
use crate::config::Config;
use crate::instrument::{
    CompiledUnit, InstrumentOptions, InstrumentationError, InstrumentationReport, Instrumenter,
    MethodIndex,
};
use crate::logging;
use crate::output::OutputConfig;
use crate::trace::TraceError;
use crate::utils::wasm::discover_units;
use crate::{JouleError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, WrapErr};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable telling the run command where instrumented units are.
pub const ENV_INSTRUMENTED_DIR: &str = "JOULE_INSTRUMENTED_DIR";
/// Environment variable telling the probe runtime where to write the trace.
pub const ENV_TRACE_FILE: &str = "JOULE_TRACE_FILE";
/// Environment variable carrying the probe import module name.
pub const ENV_PROBE_MODULE: &str = "JOULE_PROBE_MODULE";

/// A unit that could not be processed in non-strict mode.
#[derive(Debug)]
pub struct SkippedUnit {
    pub path: PathBuf,
    pub error: InstrumentationError,
}

#[derive(Debug)]
pub struct InstrumentOutcome {
    pub index: MethodIndex,
    pub reports: Vec<InstrumentationReport>,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedUnit>,
}

/// Discover and load units. Unreadable units are skipped unless `strict`.
pub fn load_units(inputs: &[PathBuf], strict: bool) -> Result<(Vec<CompiledUnit>, Vec<SkippedUnit>)> {
    let paths = discover_units(inputs)
        .into_diagnostic()
        .wrap_err("Failed to list compiled units")?;
    if paths.is_empty() {
        let searched = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(JouleError::NoUnits(searched).into());
    }

    let mut units = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();
    for path in paths {
        logging::log_loading_unit(&path);
        match CompiledUnit::load(&path) {
            Ok(unit) => {
                logging::log_unit_loaded(&unit.name, unit.bytes.len());
                units.push(unit);
            }
            Err(error) if strict => return Err(error.into()),
            Err(error) => {
                logging::log_unit_skipped(&path.display().to_string(), &error.to_string());
                skipped.push(SkippedUnit { path, error });
            }
        }
    }
    Ok((units, skipped))
}

fn progress_bar(len: usize) -> ProgressBar {
    if OutputConfig::quiet() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{spinner} instrumenting [{bar:30}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(if OutputConfig::no_unicode() { "#>-" } else { "█▉ " });
    bar.set_style(style);
    bar
}

fn output_name(unit: &CompiledUnit) -> PathBuf {
    unit.path
        .as_deref()
        .and_then(Path::file_name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.wasm", unit.name)))
}

/// Index, instrument and write every unit found under `inputs`.
pub fn instrument_units(
    inputs: &[PathBuf],
    output_dir: &Path,
    options: InstrumentOptions,
) -> Result<InstrumentOutcome> {
    let strict = options.strict;
    let (units, mut skipped) = load_units(inputs, strict)?;

    let index = MethodIndex::build(&units)?;
    logging::log_index_built(units.len(), index.len());

    fs::create_dir_all(output_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to create {}", output_dir.display()))?;

    let instrumenter = Instrumenter::new(options);
    let bar = progress_bar(units.len());
    let results: Vec<_> = units
        .par_iter()
        .map(|unit| {
            let result = instrumenter.instrument(unit, &index);
            bar.inc(1);
            result
        })
        .collect();
    bar.finish_and_clear();

    let mut reports = Vec::new();
    let mut written = Vec::new();
    for (unit, result) in units.iter().zip(results) {
        match result {
            Ok(instrumented) => {
                let path = output_dir.join(output_name(&instrumented.unit));
                fs::write(&path, &instrumented.unit.bytes)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
                logging::log_unit_instrumented(
                    &instrumented.report.unit,
                    instrumented.report.instrumented.len(),
                    instrumented.report.failed.len(),
                );
                reports.push(instrumented.report);
                written.push(path);
            }
            Err(error) if strict => return Err(error.into()),
            Err(error) => {
                logging::log_unit_skipped(&unit.name, &error.to_string());
                skipped.push(SkippedUnit {
                    path: unit.path.clone().unwrap_or_else(|| PathBuf::from(&unit.name)),
                    error,
                });
            }
        }
    }

    Ok(InstrumentOutcome {
        index,
        reports,
        written,
        skipped,
    })
}

/// Run a shell-style command line in `cwd`.
pub fn run_command(step: &str, command_line: &str, cwd: &Path, envs: &[(&str, String)]) -> Result<()> {
    let parts = shlex::split(command_line).ok_or_else(|| JouleError::PipelineError {
        step: step.to_string(),
        reason: format!("cannot parse command line `{}`", command_line),
    })?;
    let Some((program, args)) = parts.split_first() else {
        return Err(JouleError::PipelineError {
            step: step.to_string(),
            reason: "command line is empty".to_string(),
        }
        .into());
    };

    logging::log_pipeline_step(step, command_line);
    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
        .status()
        .map_err(|e| JouleError::PipelineError {
            step: step.to_string(),
            reason: format!("failed to start `{}`: {}", program, e),
        })?;

    if !status.success() {
        return Err(JouleError::PipelineError {
            step: step.to_string(),
            reason: match status.code() {
                Some(code) => format!("`{}` exited with status {}", command_line, code),
                None => format!("`{}` was terminated by a signal", command_line),
            },
        }
        .into());
    }
    Ok(())
}

/// Rebuild the call forest from a trace file.
pub fn read_forest(
    trace: &Path,
    index: Option<&MethodIndex>,
    check_exit_identity: bool,
) -> std::result::Result<CallForest, TraceError> {
    logging::log_trace_loading(trace);
    let file = File::open(trace)?;
    let mut builder = CallGraphBuilder::new().check_exit_identity(check_exit_identity);
    if let Some(index) = index {
        builder = builder.with_index(index);
    }
    let forest = builder.build_from_reader(BufReader::new(file))?;
    logging::log_forest_built(forest.len(), forest.roots().len(), forest.max_depth());
    Ok(forest)
}

/// Everything a finished measurement produced.
#[derive(Debug)]
pub struct MeasureOutcome {
    pub instrumented: InstrumentOutcome,
    pub trace_path: PathBuf,
    pub forest: CallForest,
    /// Why the trace could not be rebuilt completely. `forest` then holds
    /// the roots completed before the problem.
    pub trace_error: Option<TraceError>,
}

/// Build, instrument, run and parse for one target directory.
pub struct Pipeline {
    target: PathBuf,
    config: Config,
}

impl Pipeline {
    pub fn new(target: PathBuf, config: Config) -> Self {
        Self { target, config }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.pipeline.output_dir(&self.target)
    }

    pub fn instrumented_dir(&self) -> PathBuf {
        self.output_dir().join("instrumented")
    }

    pub fn trace_path(&self) -> PathBuf {
        self.target.join(self.config.trace.file_name())
    }

    pub fn build(&self) -> Result<()> {
        run_command("build", self.config.pipeline.build_command(), &self.target, &[])
    }

    pub fn instrument(&self, options: InstrumentOptions) -> Result<InstrumentOutcome> {
        let artifacts = self.config.pipeline.artifacts_dir(&self.target);
        if !artifacts.is_dir() {
            return Err(JouleError::NoUnits(artifacts.display().to_string()).into());
        }
        instrument_units(&[artifacts], &self.instrumented_dir(), options)
    }

    /// Run the instrumented program. A stale trace is removed first so a run
    /// that writes nothing is detected.
    pub fn run(&self, probe_module: &str) -> Result<PathBuf> {
        let command = self.config.pipeline.run.as_deref().ok_or_else(|| JouleError::PipelineError {
            step: "run".to_string(),
            reason: "no run command configured; set `run` in the [pipeline] section".to_string(),
        })?;

        let trace = self.trace_path();
        if trace.exists() {
            fs::remove_file(&trace)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to remove stale trace {}", trace.display()))?;
        }

        let envs = [
            (ENV_INSTRUMENTED_DIR, self.instrumented_dir().display().to_string()),
            (ENV_TRACE_FILE, trace.display().to_string()),
            (ENV_PROBE_MODULE, probe_module.to_string()),
        ];
        run_command("run", command, &self.target, &envs)?;

        if !trace.is_file() {
            return Err(JouleError::PipelineError {
                step: "run".to_string(),
                reason: format!("the program did not write a trace to {}", trace.display()),
            }
            .into());
        }
        Ok(trace)
    }

    pub fn measure(&self, options: InstrumentOptions, skip_build: bool) -> Result<MeasureOutcome> {
        if !skip_build {
            self.build()?;
        }
        let probe_module = options.probe_module.clone();
        let instrumented = self.instrument(options)?;
        let trace_path = self.run(&probe_module)?;
        let (forest, trace_error) = match read_forest(
            &trace_path,
            Some(&instrumented.index),
            self.config.trace.check_exit_identity.unwrap_or(false),
        ) {
            Ok(forest) => (forest, None),
            Err(mut err) => match err.take_partial() {
                Some(partial) => {
                    logging::log_partial_forest(partial.roots().len(), &err.to_string());
                    (partial, Some(err))
                }
                None => {
                    return Err(miette::Report::new(err)
                        .wrap_err(format!("Failed to read {}", trace_path.display())))
                }
            },
        };
        Ok(MeasureOutcome {
            instrumented,
            trace_path,
            forest,
            trace_error,
        })
    }
}
