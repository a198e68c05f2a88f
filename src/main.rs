use clap::{CommandFactory, FromArgMatches};
use clap_complete::generate;
use joule_trace::cli::{commands, Cli, Commands, Verbosity};
use joule_trace::output::OutputConfig;
use joule_trace::ui::formatter::Formatter;
use miette::IntoDiagnostic;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing(verbosity: Verbosity) {
    let log_level = verbosity.to_log_level();
    let fallback_filter = format!("joule_trace={}", log_level);

    let use_json = std::env::var("JOULE_TRACE_LOG_JSON").is_ok();

    if use_json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| fallback_filter.clone().into()),
            )
            .with(json_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| fallback_filter.into()),
            )
            .with(fmt_layer)
            .init();
    }
}

fn long_version() -> String {
    format!(
        "{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("RUSTC_VERSION"),
        env!("BUILD_DATE")
    )
}

fn main() -> miette::Result<()> {
    let matches = Cli::command().long_version(long_version()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let verbosity = cli.verbosity();

    OutputConfig::configure(cli.no_unicode, verbosity == Verbosity::Quiet);
    initialize_tracing(verbosity);

    let result = match cli.command {
        Some(Commands::Instrument(args)) => commands::instrument(args),
        Some(Commands::Analyze(args)) => commands::analyze(args),
        Some(Commands::Inspect(args)) => commands::inspect(args),
        Some(Commands::Measure(args)) => commands::measure(args),
        Some(Commands::Completions(args)) => {
            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "joule-trace", &mut io::stdout());
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help().into_diagnostic()?;
            println!();
            std::process::exit(1);
        }
    };

    if let Err(err) = &result {
        tracing::debug!(error = %err, "Command failed");
        eprintln!("{}", Formatter::error("joule-trace failed"));
    }
    result
}
