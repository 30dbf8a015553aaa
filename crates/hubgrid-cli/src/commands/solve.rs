//! `hubgrid solve`: plan one hub and record the result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hubgrid_algo::optimizer::{optimize, OptimizeError, PlanningProblemBuilder, SolveStatus, Solution};
use hubgrid_cli::cli::SolveArgs;
use hubgrid_cli::inputs::{load_config, load_profile};
use hubgrid_cli::manifest::record_manifest;
use hubgrid_core::{DispatchMode, Euros};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result file contents
#[derive(Serialize)]
struct SolveOutput<'a> {
    run_id: &'a str,
    label: &'a str,
    strategy: &'a str,
    include_battery: bool,
    dispatch: DispatchMode,
    solution: &'a Solution,
}

/// `<label>_<strategy>_<withBat|noBat>`
pub fn result_name(label: &str, strategy: &str, include_battery: bool) -> String {
    let battery = if include_battery { "withBat" } else { "noBat" };
    format!("{label}_{strategy}_{battery}")
}

/// Process exit code of a finished solve
pub fn exit_code(status: SolveStatus) -> u8 {
    match status {
        SolveStatus::Optimal => 0,
        SolveStatus::ConfigurationError => 1,
        SolveStatus::Infeasible => 2,
        SolveStatus::SolverError => 3,
    }
}

pub fn handle(args: &SolveArgs) -> Result<SolveStatus> {
    let mut config = load_config(args.config.as_deref())?;
    if args.no_battery {
        config.battery.include_battery = false;
    }
    if let Some(dispatch) = args.dispatch {
        config.battery.dispatch = dispatch.into();
    }
    let include_battery = config.battery.include_battery;
    let dispatch = config.battery.dispatch;

    let demand = load_profile(&args.profile)?;
    info!(
        steps = demand.len(),
        peak = %demand.peak(),
        "planning {}",
        args.label
    );

    let mut builder = PlanningProblemBuilder::new(demand, config);
    if let Some(cost) = args.charger_cost {
        builder = builder.charger_cost(Euros(cost));
    }

    let run_id = Uuid::new_v4().to_string();
    let name = result_name(&args.label, &args.strategy, include_battery);
    let mut outputs = Vec::new();

    let status = match builder.build().and_then(|problem| optimize(&problem)) {
        Ok(solution) => {
            if solution.diagnostics.has_errors() {
                warn!(
                    errors = solution.diagnostics.error_count(),
                    "plan found with layouts the solver could not evaluate"
                );
            }
            println!("{}", solution.summary());
            let path = write_result(
                &args.out,
                &format!("{name}-{run_id}.json"),
                &SolveOutput {
                    run_id: &run_id,
                    label: &args.label,
                    strategy: &args.strategy,
                    include_battery,
                    dispatch,
                    solution: &solution,
                },
            )?;
            println!("Results written to {}", path.display());
            outputs.push(path);
            solution.status
        }
        Err(OptimizeError::Configuration(message)) => {
            error!(%message, "planning input rejected");
            eprintln!("Configuration error: {message}");
            SolveStatus::ConfigurationError
        }
        Err(OptimizeError::Infeasible(report)) => {
            warn!(
                demand_peak = %report.demand_peak,
                deliverable = %report.deliverable,
                "no layout serves the demand"
            );
            eprintln!("Infeasible: {report}");
            if report.diagnostics.has_issues() {
                eprintln!("{}", report.diagnostics);
            }
            SolveStatus::Infeasible
        }
        Err(err @ OptimizeError::Solver { .. }) => {
            error!("{err}");
            eprintln!("Solver error: {err}");
            SolveStatus::SolverError
        }
    };

    let charger_cost = args
        .charger_cost
        .map_or_else(|| "config".to_string(), |c| c.to_string());
    let manifest = record_manifest(
        &args.out,
        &run_id,
        "solve",
        &outputs,
        &[
            ("profile", args.profile.display().to_string()),
            (
                "config",
                args.config
                    .as_deref()
                    .map_or_else(|| "default".to_string(), |p| p.display().to_string()),
            ),
            ("label", args.label.clone()),
            ("strategy", args.strategy.clone()),
            ("include_battery", include_battery.to_string()),
            ("dispatch", format!("{dispatch:?}").to_lowercase()),
            ("charger_cost", charger_cost),
            ("status", status.to_string()),
        ],
    )?;
    info!("recorded run manifest {}", manifest.display());
    Ok(status)
}

fn write_result(dir: &Path, file_name: &str, output: &SolveOutput<'_>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(output).context("serializing solution")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
