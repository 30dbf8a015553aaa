pub mod cli;
pub mod inputs;
pub mod manifest;

pub use cli::{
    build_cli_command, BatteryCommands, CableCommands, Cli, Commands, DispatchArg, MaterialArg,
    RunFormat, RunsCommands, SolveArgs, VoltageArg,
};
