use crate::callgraph::{CallForest, Quantity};
use crate::cli::args::{
    AnalyzeArgs, InspectArgs, InstrumentArgs, MeasureArgs, QuantityArg, ReportFormat,
};
use crate::config::Config;
use crate::instrument::{CompiledUnit, MethodFilter, MethodIdentity, MethodIndex};
use crate::logging;
use crate::output::{OutputConfig, StatusLabel};
use crate::pipeline::{self, Pipeline};
use crate::probe::ProbeKeyTable;
use crate::report::{self, MeasurementModel, TreeRenderer};
use crate::trace::TraceError;
use crate::ui::formatter::Formatter;
use crate::utils::wasm::{get_module_info, ModuleInfo};
use crate::{JouleError, Result};
use clap::ValueEnum;
use miette::{IntoDiagnostic, WrapErr};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn print_status(label: StatusLabel, message: impl AsRef<str>) {
    if !OutputConfig::quiet() {
        eprintln!("{}", Formatter::status(label, message.as_ref()));
    }
}

fn print_info(message: impl AsRef<str>) {
    print_status(StatusLabel::Info, message);
}

fn print_warning(message: impl AsRef<str>) {
    print_status(StatusLabel::Warning, message);
}

impl From<QuantityArg> for Quantity {
    fn from(arg: QuantityArg) -> Self {
        match arg {
            QuantityArg::Energy => Quantity::Energy,
            QuantityArg::Duration => Quantity::Duration,
        }
    }
}

/// Command-line choice first, then the config file, then the tree.
fn resolve_format(arg: Option<ReportFormat>, config: &Config) -> Result<ReportFormat> {
    if let Some(format) = arg {
        return Ok(format);
    }
    match config.report.format.as_deref() {
        Some(name) => ReportFormat::from_str(name, true).map_err(|e| {
            JouleError::ConfigError(format!("report.format `{}`: {}", name, e)).into()
        }),
        None => Ok(ReportFormat::Tree),
    }
}

fn resolve_quantity(arg: Option<QuantityArg>, config: &Config) -> Result<Quantity> {
    if let Some(quantity) = arg {
        return Ok(quantity.into());
    }
    match config.report.quantity.as_deref() {
        Some(name) => name
            .parse::<Quantity>()
            .map_err(|e| JouleError::ConfigError(format!("report.quantity: {}", e)).into()),
        None => Ok(Quantity::Energy),
    }
}

/// Presentation settings shared by `analyze` and `measure`.
struct RenderOptions {
    format: ReportFormat,
    quantity: Quantity,
    max_depth: Option<usize>,
    top: Option<usize>,
    source: Option<String>,
}

fn render(forest: &CallForest, options: &RenderOptions) -> Result<Vec<u8>> {
    let text = match options.format {
        ReportFormat::Tree => TreeRenderer::new(options.quantity)
            .with_max_depth(options.max_depth)
            .render(forest),
        ReportFormat::Summary => {
            let mut text = report::render_summary(forest, options.quantity, options.top);
            text.push('\n');
            text
        }
        ReportFormat::Json => {
            let mut model = MeasurementModel::from_forest(forest);
            model.source = options.source.clone();
            let mut json = model
                .to_json()
                .map_err(|e| JouleError::ReportError(e.to_string()))?;
            json.push('\n');
            json
        }
        ReportFormat::Collapsed => {
            report::render_collapsed(&report::build_collapsed_stacks(forest, options.quantity))
        }
        ReportFormat::Flamegraph => {
            let mut svg = Vec::new();
            let title = format!("{} by method", options.quantity);
            report::render_flamegraph(forest, options.quantity, &title, &mut svg)
                .map_err(|e| JouleError::ReportError(format!("flamegraph: {}", e)))?;
            return Ok(svg);
        }
    };
    Ok(text.into_bytes())
}

fn write_output(bytes: &[u8], output: Option<&Path>, format: ReportFormat) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, bytes)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to write report to {}", path.display()))?;
            let format_name = format
                .to_possible_value()
                .map(|v| v.get_name().to_string())
                .unwrap_or_default();
            logging::log_report_written(path, &format_name);
            print_status(StatusLabel::Pass, format!("Report written to {}", path.display()));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|_| stdout.flush())
                .into_diagnostic()
                .wrap_err("Failed to write report")?;
        }
    }
    Ok(())
}

/// Fall back to the completed calls of a broken trace when allowed.
fn accept_partial(mut err: TraceError, allow_partial: bool, trace: &Path) -> Result<CallForest> {
    if allow_partial {
        if let Some(partial) = err.take_partial() {
            print_warning(format!(
                "{}; reporting the {} completed root call(s)",
                err,
                partial.roots().len()
            ));
            return Ok(partial);
        }
    }
    Err(miette::Report::new(err).wrap_err(format!("Failed to analyze {}", trace.display())))
}

fn report_violations(forest: &CallForest, tolerance: f64) {
    let violations = forest.check_invariants(tolerance);
    if violations.is_empty() {
        return;
    }
    logging::log_invariant_violations(violations.len());
    for violation in &violations {
        if !OutputConfig::quiet() {
            eprintln!("{}", Formatter::format_violation(violation));
        }
    }
}

/// Execute the instrument command
pub fn instrument(args: InstrumentArgs) -> Result<()> {
    let config = Config::load_or_default(None);
    let mut options = config.instrument.to_options(&args.exclude, args.strict)?;
    if let Some(module) = args.probe_module {
        options.probe_module = module;
    }
    if !options.exclude.is_empty() {
        print_info(format!("Excluding {}", options.exclude.summary()));
    }

    let outcome = pipeline::instrument_units(&args.inputs, &args.output, options)?;

    for unit_report in &outcome.reports {
        if !OutputConfig::quiet() {
            eprintln!("{}", Formatter::format_instrumentation_report(unit_report));
        }
    }
    for skipped in &outcome.skipped {
        print_status(
            StatusLabel::Skip,
            format!("{}: {}", skipped.path.display(), skipped.error),
        );
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&outcome.reports)
            .map_err(|e| JouleError::ReportError(e.to_string()))?;
        fs::write(path, json)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        logging::log_report_written(path, "json");
    }

    if outcome.written.is_empty() {
        return Err(JouleError::PipelineError {
            step: "instrument".to_string(),
            reason: "no unit could be instrumented".to_string(),
        }
        .into());
    }

    print_status(
        StatusLabel::Pass,
        format!(
            "{} unit(s) written to {}",
            outcome.written.len(),
            args.output.display()
        ),
    );
    Ok(())
}

/// Execute the analyze command
pub fn analyze(args: AnalyzeArgs) -> Result<()> {
    let config = Config::load_or_default(None);
    let format = resolve_format(args.format, &config)?;
    let quantity = resolve_quantity(args.quantity, &config)?;

    let index = if args.units.is_empty() {
        None
    } else {
        let (units, skipped) = pipeline::load_units(&args.units, false)?;
        for unit in &skipped {
            print_warning(format!("{}: {}", unit.path.display(), unit.error));
        }
        Some(MethodIndex::build(&units)?)
    };

    let check_exit_identity =
        args.check_exit_identity || config.trace.check_exit_identity.unwrap_or(false);
    let forest = match pipeline::read_forest(&args.trace, index.as_ref(), check_exit_identity) {
        Ok(forest) => forest,
        Err(err) => accept_partial(err, args.allow_partial, &args.trace)?,
    };

    let forest = if args.exclude.is_empty() {
        forest
    } else {
        let filter = MethodFilter::new(&args.exclude)
            .map_err(|e| miette::miette!("Invalid exclude pattern: {}", e))?;
        forest.retain(|node| !filter.excludes(&node.method))
    };

    report_violations(
        &forest,
        args.tolerance.unwrap_or_else(|| config.report.tolerance()),
    );

    let options = RenderOptions {
        format,
        quantity,
        max_depth: args.max_depth,
        top: args.top,
        source: Some(args.trace.display().to_string()),
    };
    let bytes = render(&forest, &options)?;
    write_output(&bytes, args.output.as_deref(), format)
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    unit: &'a str,
    info: ModuleInfo,
    methods: Vec<&'a MethodIdentity>,
    probe_keys: Option<Vec<String>>,
}

/// Execute the inspect command
pub fn inspect(args: InspectArgs) -> Result<()> {
    logging::log_loading_unit(&args.unit);
    let unit = CompiledUnit::load(&args.unit)?;
    let index = MethodIndex::build(std::slice::from_ref(&unit))?;
    let info = get_module_info(&unit.bytes).map_err(JouleError::FileError)?;
    let keys = ProbeKeyTable::from_unit(&unit).map_err(JouleError::FileError)?;

    if args.json {
        let output = InspectOutput {
            unit: &unit.name,
            info,
            methods: index.methods_of(&unit.name).collect(),
            probe_keys: keys.map(|table| table.iter().map(|(_, k)| k.to_string()).collect()),
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| JouleError::ReportError(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("{}", Formatter::format_header(&format!("Unit {}", unit.name)));
    println!("  Size      : {} bytes", info.total_size);
    println!("  Functions : {} ({} imported)", info.function_count, info.import_count);
    println!("  Exports   : {}", info.export_count);
    if !info.custom_sections.is_empty() {
        println!("  Sections  : {}", info.custom_sections.join(", "));
    }

    println!();
    println!("{}", Formatter::format_header("Methods"));
    for method in index.methods_of(&unit.name) {
        println!("  {} {}", OutputConfig::bullet(), method);
    }

    if let Some(keys) = keys {
        println!();
        println!("{}", Formatter::format_header("Probe keys"));
        for (id, key) in keys.iter() {
            println!("  {:>5}  {}", id, key);
        }
    }
    Ok(())
}

/// Execute the measure command
pub fn measure(args: MeasureArgs) -> Result<()> {
    let Some(target) = args.target else {
        return Err(JouleError::MissingTarget.into());
    };
    let target: PathBuf = target
        .canonicalize()
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot access target {}", target.display()))?;

    let config = Config::load_or_default(Some(&target));
    let format = resolve_format(args.format, &config)?;
    let quantity = resolve_quantity(args.quantity, &config)?;
    let options = config.instrument.to_options(&args.exclude, args.strict)?;
    let tolerance = config.report.tolerance();

    print_info(format!("Measuring {}", target.display()));
    let pipeline = Pipeline::new(target, config);
    let outcome = pipeline.measure(options, args.skip_build)?;

    for unit_report in &outcome.instrumented.reports {
        tracing::debug!(
            unit = unit_report.unit.as_str(),
            methods = unit_report.instrumented.len(),
            "Instrumentation summary"
        );
    }
    for skipped in &outcome.instrumented.skipped {
        print_status(
            StatusLabel::Skip,
            format!("{}: {}", skipped.path.display(), skipped.error),
        );
    }

    let output_dir = pipeline.output_dir();
    fs::create_dir_all(&output_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to create {}", output_dir.display()))?;
    let model = MeasurementModel::from_forest(&outcome.forest)
        .with_source(outcome.trace_path.display().to_string());
    let model_path = output_dir.join("energy.json");
    let json = model
        .to_json()
        .map_err(|e| JouleError::ReportError(e.to_string()))?;
    fs::write(&model_path, json)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", model_path.display()))?;
    logging::log_report_written(&model_path, "json");

    let forest = match outcome.trace_error {
        None => outcome.forest,
        Some(err) => {
            print_warning(format!("Completed calls saved to {}", model_path.display()));
            accept_partial(
                err.with_partial(outcome.forest),
                args.allow_partial,
                &outcome.trace_path,
            )?
        }
    };
    report_violations(&forest, tolerance);

    let render_options = RenderOptions {
        format,
        quantity,
        max_depth: None,
        top: None,
        source: Some(outcome.trace_path.display().to_string()),
    };
    let bytes = render(&forest, &render_options)?;
    let output = match format {
        ReportFormat::Flamegraph => Some(output_dir.join("flamegraph.svg")),
        _ => None,
    };
    write_output(&bytes, output.as_deref(), format)
}
