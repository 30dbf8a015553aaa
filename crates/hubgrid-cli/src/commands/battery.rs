use std::path::Path;

use anyhow::{Context, Result};
use hubgrid_algo::battery::{evaluate_battery, BatterySpec};
use hubgrid_cli::cli::BatteryCommands;
use hubgrid_cli::inputs::{load_config, load_profile};
use hubgrid_core::{KilowattHours, Kilowatts};

pub fn handle(command: &BatteryCommands) -> Result<()> {
    match command {
        BatteryCommands::Evaluate {
            profile,
            capacity_kwh,
            power_kw,
            config,
        } => handle_evaluate(profile, *capacity_kwh, *power_kw, config.as_deref()),
    }
}

fn handle_evaluate(
    profile: &Path,
    capacity_kwh: f64,
    power_kw: f64,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let demand = load_profile(profile)?;
    let spec = BatterySpec::from_config(
        &config.battery,
        KilowattHours(capacity_kwh),
        Kilowatts(power_kw),
    );
    let dispatch = evaluate_battery(&demand, &spec).context("evaluating battery")?;

    let step = demand.step();
    let throughput: KilowattHours = dispatch.discharge.iter().map(|d| *d * step).sum();
    println!("Battery evaluation");
    println!("  Battery:      {} / {}", spec.capacity, spec.power);
    println!("  Peak before:  {}", dispatch.peak_before);
    println!("  Peak after:   {}", dispatch.peak_after);
    println!("  Shaved:       {}", dispatch.shaved());
    println!("  Discharged:   {throughput}");
    println!("  Investment:   {}", spec.investment_cost());
    Ok(())
}
