use clap::Parser;
use tracing_subscriber::{fmt, prelude::*};

mod cli;

use cli::{log_filter, run_command, Cli};

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries decode output and stats JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(log_filter(cli.debug))
        .init();

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
