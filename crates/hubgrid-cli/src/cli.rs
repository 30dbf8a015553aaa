use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use hubgrid_core::{CableMaterial, DispatchMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Grid-connection cost planning for truck charging hubs", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select the cheapest grid connection, cable, transformer and battery
    Solve(SolveArgs),
    /// Check a configuration file and list the connection candidates
    Validate {
        /// TOML configuration file
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
    /// Cable sizing utilities
    Cable {
        #[command(subcommand)]
        command: CableCommands,
    },
    /// Battery utilities
    Battery {
        #[command(subcommand)]
        command: BatteryCommands,
    },
    /// Inspect recorded runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
}

#[derive(clap::Args, Debug)]
pub struct SolveArgs {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Demand profile CSV with `offset_minutes,power_kw` columns
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub profile: PathBuf,
    /// Directory receiving the result and the run manifest
    #[arg(long, default_value = "results", value_hint = ValueHint::DirPath)]
    pub out: PathBuf,
    /// Charger fixed cost in EUR (derived from the charger fleet when omitted)
    #[arg(long)]
    pub charger_cost: Option<f64>,
    /// Plan without a battery
    #[arg(long)]
    pub no_battery: bool,
    /// How the battery schedule is decided (overrides the configuration)
    #[arg(long, value_enum)]
    pub dispatch: Option<DispatchArg>,
    /// Hub identifier used in the result file name
    #[arg(long, default_value = "hub")]
    pub label: String,
    /// Strategy name used in the result file name
    #[arg(long, default_value = "cost")]
    pub strategy: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchArg {
    Joint,
    Greedy,
}

impl From<DispatchArg> for DispatchMode {
    fn from(value: DispatchArg) -> Self {
        match value {
            DispatchArg::Joint => DispatchMode::Joint,
            DispatchArg::Greedy => DispatchMode::Greedy,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CableCommands {
    /// Size a single cable run
    Size {
        /// Transmitted power in kW
        #[arg(long)]
        power_kw: f64,
        /// Route length in meters
        #[arg(long)]
        distance_m: f64,
        /// Voltage level of the run
        #[arg(long, value_enum, default_value_t = VoltageArg::Mv)]
        voltage: VoltageArg,
        /// Conductor material
        #[arg(long, value_enum, default_value_t = MaterialArg::Aluminium)]
        material: MaterialArg,
        /// TOML configuration file (built-in defaults when omitted)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoltageArg {
    /// Hub-internal 400 V
    Lv,
    /// 20 kV
    Mv,
    /// 110 kV
    Hv,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialArg {
    Aluminium,
    Copper,
}

impl From<MaterialArg> for CableMaterial {
    fn from(value: MaterialArg) -> Self {
        match value {
            MaterialArg::Aluminium => CableMaterial::Aluminium,
            MaterialArg::Copper => CableMaterial::Copper,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum BatteryCommands {
    /// Run the greedy peak shaver for a fixed battery
    Evaluate {
        /// Demand profile CSV with `offset_minutes,power_kw` columns
        #[arg(long, value_hint = ValueHint::FilePath)]
        profile: PathBuf,
        /// Usable energy capacity in kWh
        #[arg(long)]
        capacity_kwh: f64,
        /// Charge/discharge power limit in kW
        #[arg(long)]
        power_kw: f64,
        /// TOML configuration file (built-in defaults when omitted)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunsCommands {
    /// List recorded runs
    List {
        /// Root path to scan for run manifests
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Output format for the listing
        #[arg(long, value_enum, default_value_t = RunFormat::Plain)]
        format: RunFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunFormat {
    Plain,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
