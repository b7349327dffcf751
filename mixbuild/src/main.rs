//! mixbuild CLI entrypoint.
//!
//! This binary assembles a mixed build from a system build directory and a
//! device build directory. Progress is written to stderr; diagnostics go
//! through the `log` facade and are filtered with `RUST_LOG`.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use mixbuild::cli::Cli;
use mixbuild::config::MixConfig;
use mixbuild::error::Result;
use mixbuild::output::write_stderr_line;
use mixbuild::{interrupt, pipeline};
use std::io::Write;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    init_tracing();
    interrupt::install_handlers();

    let mut stderr = std::io::stderr();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => std::process::exit(exit_code_for_parse_error(&err)),
    };
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs the stderr subscriber, defaulting to `info` when `RUST_LOG` is unset.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = MixConfig::from_cli(cli)?;
    pipeline::run(&config, stderr)?;
    Ok(())
}

/// Prints a clap error and maps it to the process exit code.
///
/// Help and version requests succeed; every other parse error is a usage
/// failure.
fn exit_code_for_parse_error(err: &clap::Error) -> i32 {
    if err.print().is_err() {
        // Best-effort output; ignore write failures.
    }
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            write_stderr_line(stderr, "");
            write_stderr_line(stderr, Cli::command().render_help());
            1
        }
    }
}
