//! Loading of the configuration TOML and the demand profile CSV.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use hubgrid_core::{DemandPoint, DemandProfile, HubGridConfig, Kilowatts};
use serde::Deserialize;
use tracing::debug;

/// One CSV row of a demand profile
#[derive(Debug, Deserialize)]
struct ProfileRow {
    offset_minutes: u32,
    power_kw: f64,
}

/// Load and validate a configuration, or fall back to the defaults.
pub fn load_config(path: Option<&Path>) -> Result<HubGridConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            parse_config(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => {
            debug!("no configuration file given, using defaults");
            HubGridConfig::default()
        }
    };
    config.validate().context("validating configuration")?;
    Ok(config)
}

/// Parse a TOML configuration. Missing sections keep their defaults.
pub fn parse_config(text: &str) -> Result<HubGridConfig> {
    Ok(toml::from_str(text)?)
}

pub fn load_profile(path: &Path) -> Result<DemandProfile> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening demand profile {}", path.display()))?;
    let profile =
        read_profile(file).with_context(|| format!("reading demand profile {}", path.display()))?;
    debug!(
        steps = profile.len(),
        step_minutes = profile.step_minutes(),
        "loaded demand profile"
    );
    Ok(profile)
}

/// Read `offset_minutes,power_kw` rows into a validated profile.
pub fn read_profile<R: Read>(reader: R) -> Result<DemandProfile> {
    let mut rows = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut points = Vec::new();
    for (line, row) in rows.deserialize::<ProfileRow>().enumerate() {
        let row = row.with_context(|| format!("row {}", line + 1))?;
        points.push(DemandPoint {
            offset_minutes: row.offset_minutes,
            power: Kilowatts(row.power_kw),
        });
    }
    Ok(DemandProfile::new(points)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubgrid_core::{DispatchMode, Euros};

    #[test]
    fn test_profile_csv_is_read_in_order() {
        let csv = "offset_minutes,power_kw\n0,100\n15, 250.5\n30,0\n";
        let profile = read_profile(csv.as_bytes()).unwrap();
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.step_minutes(), 15);
        assert_eq!(profile.peak(), Kilowatts(250.5));
    }

    #[test]
    fn test_profile_rejects_negative_power() {
        let csv = "offset_minutes,power_kw\n0,100\n15,-1\n";
        assert!(read_profile(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_profile_rejects_garbage() {
        let csv = "offset_minutes,power_kw\n0,abc\n";
        assert!(read_profile(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_empty_profile_is_an_error() {
        assert!(read_profile("offset_minutes,power_kw\n".as_bytes()).is_err());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [battery]
            dispatch = "greedy"
            cost_per_kwh = 200.0

            [solver]
            time_limit_seconds = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(config.battery.dispatch, DispatchMode::Greedy);
        assert_eq!(config.battery.cost_per_kwh, Euros(200.0));
        assert_eq!(config.battery.cost_per_kw, Euros(100.0));
        assert_eq!(config.grid, HubGridConfig::default().grid);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        assert_eq!(load_config(None).unwrap(), HubGridConfig::default());
    }
}
