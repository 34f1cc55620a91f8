mod cli;
mod commands;
mod config;
mod error;
mod session;
mod tables;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use crate::cli::{
    Args,
    Commands,
};
use crate::commands::{
    main_analyze,
    main_run,
    main_write_template,
};

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE),
    );
    if let Err(e) = set_global_default(subscriber) {
        eprintln!("Setting default subscriber failed: {}", e);
    }
    let args = Args::parse();

    let result = match args.command {
        Some(Commands::Analyze(args)) => main_analyze(args),
        Some(Commands::Run(args)) => main_run(args),
        Some(Commands::WriteTemplate(args)) => main_write_template(args),
        None => {
            println!("No command provided");
            Ok(())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
