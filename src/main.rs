//! # hacline Main Entry Point
//!
//! Runs one console command per invocation.

use anyhow::Result;
use hacline::app::{self, App};
use hacline::cmd_args::CommandLineArgs;
use hacline::config;
use std::process::ExitCode;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let args = CommandLineArgs::parse();

    // Initialize tracing first before any other logs
    let level = if args.verbose() {
        "debug".to_string()
    } else {
        config::get_log_level()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let app = App::new(args)?;
    let result = app.run()?;

    let succeeded = app::report(
        &result,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    )?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
