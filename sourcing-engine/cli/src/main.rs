#![deny(rust_2018_idioms)]
#![deny(unsafe_code)]

mod commands;
mod fs_host;
mod logger;

use commands::CliCommand;
use logger::LogFormat;
use sourcing_core::SourceConfig;
use std::path::PathBuf;
use structopt::StructOpt;

/// Synthesizes queries and types from a remote GraphQL schema and syncs its content.
#[derive(Debug, StructOpt)]
#[structopt(name = "sourcing-engine")]
struct SourcingEngineCli {
    /// Path to the source configuration, JSON or TOML
    #[structopt(short = "c", long, name = "FILE", parse(from_os_str))]
    config: PathBuf,
    /// Log format, `text` or `json`
    #[structopt(long, default_value = "text")]
    log_format: LogFormat,
    #[structopt(subcommand)]
    command: CliCommand,
}

#[tokio::main]
async fn main() {
    let input = SourcingEngineCli::from_args();

    if let Err(err) = logger::init_logger(input.log_format) {
        eprintln!("Could not initialize the logger: {err}");
    }

    logger::set_panic_hook(input.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting sourcing engine");

    let result = match SourceConfig::load(&input.config) {
        Ok(config) => input.command.run(config).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(msg) => tracing::info!("{}", msg),
        Err(err) => {
            tracing::error!(error = %err, "Sourcing failed");
            std::process::exit(1);
        }
    }
}
