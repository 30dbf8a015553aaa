use anyhow::Result;
use hubgrid_cli::cli::RunsCommands;

pub mod list;

pub fn handle(command: &RunsCommands) -> Result<()> {
    match command {
        RunsCommands::List { root, format } => list::handle(root, *format),
    }
}
