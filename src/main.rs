//! oembed-links CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use oembed_links::cli::{Cli, TransformCommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("oembed_links=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oembed_links=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("oembed-links starting with args: {:?}", cli);

    let mut stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();

    match TransformCommand::new(&cli).execute(&mut stdin, &mut stdout) {
        Ok(result) if result.success => ExitCode::SUCCESS,
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
