use std::io;
use std::process::ExitCode;

use clap::Parser;
use hubgrid_cli::cli::{Cli, Commands};
use tracing_subscriber::FmtSubscriber;

mod commands;
mod runs;

fn run(command: &Commands) -> anyhow::Result<u8> {
    match command {
        Commands::Solve(args) => commands::solve::handle(args).map(commands::solve::exit_code),
        Commands::Validate { config } => commands::validate::handle(config).map(|_| 0),
        Commands::Cable { command } => commands::cable::handle(command).map(|_| 0),
        Commands::Battery { command } => commands::battery::handle(command).map(|_| 0),
        Commands::Runs { command } => commands::runs::handle(command).map(|_| 0),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // logs on stderr, results on stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {err}");
    }

    match run(&cli.command) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
