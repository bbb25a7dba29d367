//! taskbuddy CLI

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use taskbuddy::cli::Cli;
use taskbuddy::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    init_tracing(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            std::process::exit(taskbuddy::error::exit_codes::OPERATION_FAILED);
        }
    };

    if let Err(err) = cli.run(&config, &runtime) {
        tracing::error!(error = %err, "command failed");
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

/// `RUST_LOG` wins over `[log] filter`; invalid filters fall back to `warn`.
fn init_tracing(config: &Config) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .or_else(|| EnvFilter::try_new(&config.log.filter).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let log_file = config.log.file.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| eprintln!("warning: cannot open log file {}: {err}", path.display()))
            .ok()
    });

    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(filter)
            .init(),
        None => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}
