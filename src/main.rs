mod cli;
mod commands;
mod context;
mod engine;
mod exec;
mod facts;
mod operators;
mod render;
mod server;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Command};
use context::Context;
use facts::Facts;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match cli.command {
        Some(Command::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "gaffer", &mut io::stdout());
            Ok(())
        }
        Some(Command::Apply(args)) => commands::apply::run(&args.manifest, &startup()),
        Some(Command::Serve(args)) => commands::serve::run(&args.config, startup()),
        None => {
            let location = cli
                .manifest
                .unwrap_or_else(|| "/etc/gaffer/manifest.yml".to_string());
            commands::apply::run(&location, &startup())
        }
    }
}

/// Detect host facts and build the process-wide context.
fn startup() -> Arc<Context> {
    log::info!("starting gaffer (version {})", env!("CARGO_PKG_VERSION"));
    Arc::new(Context::new(Facts::detect()))
}
