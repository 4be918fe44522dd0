//! upvault CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use upvault::cli::args::{Cli, Commands};
use upvault::cli::migrate;
use upvault::cli::output::Output;
use upvault::config::MigrationConfig;
use upvault::error::{ExitCode as MigrateExitCode, MigrateError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<MigrateExitCode, MigrateError> {
    let file_config = MigrationConfig::load(cli.config.as_deref())?;
    let config = cli.command.args().apply(file_config);

    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Migrate(_) => migrate::migrate(config, !cli.no_progress && !cli.quiet, &output),
        Commands::Validate(_) => migrate::validate_only(config, &output),
    }
}

/// Console logs go to stderr at the verbosity level (or `RUST_LOG`); `--log-file`
/// adds a debug-level file layer.
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let registry = tracing_subscriber::registry().with(console);

    match &cli.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(std::path::Path::new("."));
            let file_name = path
                .file_name()
                .map(|f| f.to_os_string())
                .unwrap_or_else(|| "upvault.log".into());
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(EnvFilter::new("upvault=debug"));
            registry.with(file_layer).init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}
