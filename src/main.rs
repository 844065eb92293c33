//! arteval CLI entry point.

use std::process::ExitCode;

use arteval::cli::{Cli, CommandDispatcher, Theme};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// Logs go to stderr so `run --json` keeps stdout clean.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("arteval=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arteval=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("arteval starting with args: {:?}", cli);

    let dispatcher = CommandDispatcher::new(cli.verbose, Theme::detect(cli.no_color));
    let mut stdout = std::io::stdout().lock();

    match dispatcher.dispatch(&cli, &mut stdout) {
        Ok(result) => ExitCode::from(u8::try_from(result.exit_code).unwrap_or(1)),
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
