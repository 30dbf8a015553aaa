use anyhow::{Context, Result};
use hubgrid_algo::cable::{run_cost, size_cable};
use hubgrid_cli::cli::{CableCommands, MaterialArg, VoltageArg};
use hubgrid_cli::inputs::load_config;
use hubgrid_core::{CableMaterial, HubGridConfig, Kilowatts, Meters, VoltageLevel};
use tracing::debug;

pub fn handle(command: &CableCommands) -> Result<()> {
    match command {
        CableCommands::Size {
            power_kw,
            distance_m,
            voltage,
            material,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            handle_size(&config, *power_kw, *distance_m, *voltage, *material)
        }
    }
}

fn voltage_level(config: &HubGridConfig, voltage: VoltageArg) -> &VoltageLevel {
    match voltage {
        VoltageArg::Lv => &config.internal_cabling.level,
        VoltageArg::Mv => &config.grid.medium_voltage_level,
        VoltageArg::Hv => &config.grid.high_voltage_level,
    }
}

fn handle_size(
    config: &HubGridConfig,
    power_kw: f64,
    distance_m: f64,
    voltage: VoltageArg,
    material: MaterialArg,
) -> Result<()> {
    let material = CableMaterial::from(material);
    let level = voltage_level(config, voltage);
    let catalog = config.cables.catalog(material);
    debug!(%material, nominal = %level.nominal, "sizing cable");

    let sized = size_cable(Kilowatts(power_kw), Meters(distance_m), level, catalog)
        .context("sizing cable")?;
    let cost = run_cost(&sized.option, sized.distance, &config.cables);

    println!("Cable sizing");
    println!("  Material:         {}", sized.option.material);
    println!("  Cross-section:    {}", sized.option.cross_section);
    println!("  Rated current:    {}", sized.option.current_capacity);
    println!("  Required current: {}", sized.required_current);
    println!(
        "  Voltage drop:     {:.2}% (max {:.2}%)",
        sized.voltage_drop.as_percent(),
        level.max_voltage_drop.as_percent()
    );
    println!("  Run cost:         {cost}");
    Ok(())
}
