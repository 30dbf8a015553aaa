//! Run configuration for grid connection planning.
//!
//! [`HubGridConfig`] is built once per run (usually from a TOML file) and
//! passed by reference to every stage. All sections use `#[serde(default)]`
//! so partial files only override what they name; the defaults are the
//! tariff, catalog and battery tables of a German MV/HV distribution grid.
//!
//! ```toml
//! [grid.existing_mv]
//! capacity_limit = 1000.0
//!
//! [battery]
//! cost_per_kwh = 0.0
//! ```

use serde::{Deserialize, Serialize};

use crate::charger::ChargerConfig;
use crate::connection::{ConnectionType, Coordinates, VoltageClass};
use crate::error::{HubGridError, HubGridResult};
use crate::units::{Amperes, Euros, Fraction, KilowattHours, Kilowatts, Meters, SquareMillimeters, Volts};

/// Complete configuration of one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubGridConfig {
    pub grid: GridConfig,
    pub cables: CableConfig,
    pub transformers: TransformerConfig,
    pub battery: BatteryConfig,
    pub chargers: ChargerConfig,
    pub internal_cabling: InternalCablingConfig,
    pub distances: DistanceConfig,
    pub solver: SolverConfig,
}

// =============================================================================
// Grid tariffs
// =============================================================================

/// Capacity and cost table of one connection type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionTariff {
    /// Capacity available without expansion
    pub capacity_limit: Kilowatts,
    /// One-off cost of the connection itself (substation, switchgear)
    pub fixed_cost: Euros,
    /// Fee per kW of peak import
    pub capacity_fee_per_kw: Euros,
    /// Additional capacity obtainable by expanding the substation
    pub expansion_max: Kilowatts,
    /// One-off cost of an expansion, regardless of its size
    pub expansion_fixed_cost: Euros,
}

impl Default for ConnectionTariff {
    fn default() -> Self {
        Self {
            capacity_limit: Kilowatts::ZERO,
            fixed_cost: Euros::ZERO,
            capacity_fee_per_kw: MV_CAPACITY_FEE,
            expansion_max: Kilowatts::ZERO,
            expansion_fixed_cost: Euros::ZERO,
        }
    }
}

const MV_CAPACITY_FEE: Euros = Euros(183.56);
const HV_CAPACITY_FEE: Euros = Euros(111.14);

/// Nominal voltage and permissible operating window of a cable run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub nominal: Volts,
    /// Maximum voltage drop as share of the nominal voltage
    pub max_voltage_drop: Fraction,
    pub power_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub existing_mv: ConnectionTariff,
    pub distribution: ConnectionTariff,
    pub transmission: ConnectionTariff,
    pub high_voltage: ConnectionTariff,
    pub medium_voltage_level: VoltageLevel,
    pub high_voltage_level: VoltageLevel,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            existing_mv: ConnectionTariff {
                capacity_limit: Kilowatts(5_500.0),
                ..ConnectionTariff::default()
            },
            distribution: ConnectionTariff {
                capacity_limit: Kilowatts(20_000.0),
                expansion_max: Kilowatts(20_000.0),
                expansion_fixed_cost: Euros(500_000.0),
                ..ConnectionTariff::default()
            },
            transmission: ConnectionTariff {
                capacity_limit: Kilowatts(20_000.0),
                expansion_max: Kilowatts(20_000.0),
                expansion_fixed_cost: Euros(500_000.0),
                ..ConnectionTariff::default()
            },
            high_voltage: ConnectionTariff {
                capacity_limit: Kilowatts(100_000.0),
                fixed_cost: Euros(2_500_000.0),
                capacity_fee_per_kw: HV_CAPACITY_FEE,
                ..ConnectionTariff::default()
            },
            medium_voltage_level: VoltageLevel {
                nominal: Volts(20_000.0),
                max_voltage_drop: Fraction::from_percent(3.0),
                power_factor: 0.9,
            },
            high_voltage_level: VoltageLevel {
                nominal: Volts(110_000.0),
                max_voltage_drop: Fraction::from_percent(3.0),
                power_factor: 0.9,
            },
        }
    }
}

impl GridConfig {
    pub fn tariff(&self, kind: ConnectionType) -> &ConnectionTariff {
        match kind {
            ConnectionType::ExistingMv => &self.existing_mv,
            ConnectionType::Distribution => &self.distribution,
            ConnectionType::Transmission => &self.transmission,
            ConnectionType::HighVoltage => &self.high_voltage,
        }
    }

    /// Cable parameters for a connection voltage class.
    ///
    /// Low voltage is hub-internal and configured in
    /// [`InternalCablingConfig`]; it falls back to the medium level here.
    pub fn voltage_level(&self, class: VoltageClass) -> &VoltageLevel {
        match class {
            VoltageClass::Low | VoltageClass::Medium => &self.medium_voltage_level,
            VoltageClass::High => &self.high_voltage_level,
        }
    }
}

// =============================================================================
// Cables
// =============================================================================

/// Conductor material of a cable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableMaterial {
    Aluminium,
    Copper,
}

impl CableMaterial {
    pub const ALL: [CableMaterial; 2] = [CableMaterial::Aluminium, CableMaterial::Copper];

    pub fn label(self) -> &'static str {
        match self {
            CableMaterial::Aluminium => "aluminium",
            CableMaterial::Copper => "copper",
        }
    }
}

impl std::fmt::Display for CableMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One catalog entry of a cable family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CableOption {
    pub material: CableMaterial,
    pub cross_section: SquareMillimeters,
    pub current_capacity: Amperes,
    pub cost_per_meter: Euros,
}

/// Cross-section catalog of one material, ascending by cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableCatalog {
    pub material: CableMaterial,
    /// Electrical conductivity in S·m/mm²
    pub conductivity: f64,
    pub options: Vec<CableOption>,
}

impl CableCatalog {
    /// Build a catalog from `(mm², A, EUR/m)` rows.
    pub fn from_rows(material: CableMaterial, conductivity: f64, rows: &[(f64, f64, f64)]) -> Self {
        let options = rows
            .iter()
            .map(|&(cross_section, ampacity, cost)| CableOption {
                material,
                cross_section: SquareMillimeters(cross_section),
                current_capacity: Amperes(ampacity),
                cost_per_meter: Euros(cost),
            })
            .collect();
        Self {
            material,
            conductivity,
            options,
        }
    }

    pub fn aluminium_mv() -> Self {
        Self::from_rows(CableMaterial::Aluminium, 35.0, ALUMINIUM_MV_ROWS)
    }

    pub fn copper_mv() -> Self {
        Self::from_rows(CableMaterial::Copper, 56.0, COPPER_MV_ROWS)
    }

    fn validate(&self) -> HubGridResult<()> {
        let name = self.material.label();
        if self.options.is_empty() {
            return Err(HubGridError::Config(format!("{name} cable catalog is empty")));
        }
        if !(self.conductivity.is_finite() && self.conductivity > 0.0) {
            return Err(HubGridError::Config(format!(
                "{name} conductivity must be positive"
            )));
        }
        for option in &self.options {
            if option.material != self.material {
                return Err(HubGridError::Config(format!(
                    "{name} catalog contains a {} entry",
                    option.material
                )));
            }
            if option.cross_section.0 <= 0.0
                || option.current_capacity.0 <= 0.0
                || option.cost_per_meter.0 < 0.0
            {
                return Err(HubGridError::Config(format!(
                    "{name} cable {} has non-positive rating or negative cost",
                    option.cross_section
                )));
            }
        }
        if self
            .options
            .windows(2)
            .any(|w| w[1].cross_section <= w[0].cross_section)
        {
            return Err(HubGridError::Config(format!(
                "{name} cable catalog must be strictly ascending by cross-section"
            )));
        }
        Ok(())
    }
}

// NA2XS(F)2Y 12/20 kV, single-core, laid in ground
const ALUMINIUM_MV_ROWS: &[(f64, f64, f64)] = &[
    (16.0, 105.0, 7.77),
    (25.0, 140.0, 10.62),
    (35.0, 195.0, 12.0),
    (50.0, 237.0, 15.0),
    (70.0, 282.0, 20.0),
    (95.0, 319.0, 26.0),
    (120.0, 352.0, 30.0),
    (150.0, 396.0, 35.0),
    (185.0, 455.0, 40.0),
    (240.0, 510.0, 48.0),
    (300.0, 564.0, 55.0),
    (400.0, 634.0, 70.0),
    (500.0, 710.0, 85.0),
    (630.0, 800.0, 100.0),
    (800.0, 880.0, 120.0),
    (1000.0, 980.0, 140.0),
    (1200.0, 1080.0, 160.0),
    (1400.0, 1170.0, 180.0),
    (1600.0, 1250.0, 200.0),
    (1800.0, 1320.0, 220.0),
    (2000.0, 1380.0, 240.0),
    (2500.0, 1550.0, 300.0),
    (3000.0, 1700.0, 360.0),
    (3200.0, 1760.0, 380.0),
    (3500.0, 1850.0, 420.0),
];

// N2XS(F)2Y 12/20 kV, single-core, laid in ground
const COPPER_MV_ROWS: &[(f64, f64, f64)] = &[
    (25.0, 157.0, 18.0),
    (35.0, 187.0, 22.0),
    (50.0, 220.0, 28.0),
    (70.0, 268.0, 36.0),
    (95.0, 320.0, 46.0),
    (120.0, 363.0, 55.0),
    (150.0, 405.0, 66.0),
    (185.0, 456.0, 79.0),
    (240.0, 526.0, 98.0),
    (300.0, 591.0, 118.0),
    (400.0, 662.0, 150.0),
    (500.0, 744.0, 185.0),
    (630.0, 828.0, 230.0),
];

/// Catalogs and installation costs of the connection cable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableConfig {
    pub aluminium: CableCatalog,
    pub copper: CableCatalog,
    /// Single-core conductors laid per run (one per phase)
    pub conductors_per_run: u32,
    /// Termination and mounting cost per conductor
    pub hardware_cost_per_conductor: Euros,
    /// Trenching cost per meter of route
    pub trenching_cost_per_meter: Euros,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            aluminium: CableCatalog::aluminium_mv(),
            copper: CableCatalog::copper_mv(),
            conductors_per_run: 3,
            hardware_cost_per_conductor: Euros(930.0),
            trenching_cost_per_meter: Euros(34.0),
        }
    }
}

impl CableConfig {
    pub fn catalog(&self, material: CableMaterial) -> &CableCatalog {
        match material {
            CableMaterial::Aluminium => &self.aluminium,
            CableMaterial::Copper => &self.copper,
        }
    }
}

// =============================================================================
// Transformers
// =============================================================================

/// One transformer size with its installed cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformerOption {
    pub capacity: Kilowatts,
    pub cost: Euros,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Available sizes, ascending by capacity
    pub catalog: Vec<TransformerOption>,
    /// Upper bound on units installed in parallel, across all sizes
    pub max_parallel_units: u32,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        let catalog = [
            (1000.0, 120_000.0),
            (1250.0, 145_000.0),
            (1600.0, 180_000.0),
            (2000.0, 220_000.0),
            (2500.0, 270_000.0),
            (3150.0, 335_000.0),
        ]
        .iter()
        .map(|&(capacity, cost)| TransformerOption {
            capacity: Kilowatts(capacity),
            cost: Euros(cost),
        })
        .collect();
        Self {
            catalog,
            max_parallel_units: 32,
        }
    }
}

// =============================================================================
// Battery
// =============================================================================

/// How the battery schedule is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Battery size and schedule are decision variables of the cost LP
    #[default]
    Joint,
    /// A fixed battery runs the greedy peak shaver ahead of the selection
    Greedy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub include_battery: bool,
    pub dispatch: DispatchMode,
    pub cost_per_kwh: Euros,
    pub cost_per_kw: Euros,
    pub max_capacity: KilowattHours,
    pub max_power: Kilowatts,
    /// Share of charged energy that ends up stored
    pub efficiency: Fraction,
    pub min_soc: Fraction,
    pub max_soc: Fraction,
    pub initial_soc: Fraction,
    /// Require the horizon to end at least as full as it started
    pub cyclic: bool,
    /// Battery size used by [`DispatchMode::Greedy`]
    pub greedy_capacity: KilowattHours,
    pub greedy_power: Kilowatts,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            include_battery: true,
            dispatch: DispatchMode::Joint,
            cost_per_kwh: Euros(175.0),
            cost_per_kw: Euros(100.0),
            max_capacity: KilowattHours(99_999.0),
            max_power: Kilowatts(99_999.0),
            efficiency: Fraction(0.95),
            min_soc: Fraction(0.0),
            max_soc: Fraction(1.0),
            initial_soc: Fraction(0.5),
            cyclic: true,
            greedy_capacity: KilowattHours(2_000.0),
            greedy_power: Kilowatts(1_000.0),
        }
    }
}

impl BatteryConfig {
    /// Largest discharge power the optimizer may deploy
    pub fn available_power(&self) -> Kilowatts {
        if !self.include_battery {
            return Kilowatts::ZERO;
        }
        match self.dispatch {
            DispatchMode::Joint => self.max_power,
            DispatchMode::Greedy => self.greedy_power,
        }
    }
}

// =============================================================================
// Hub-internal cabling
// =============================================================================

/// Copper conductor used for charger feeders inside the hub.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LvConductor {
    pub cross_section: SquareMillimeters,
    pub cost_per_meter: Euros,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalCablingConfig {
    pub level: VoltageLevel,
    /// Conductivity of the feeder conductor in S·m/mm²
    pub conductivity: f64,
    /// Spacing between charger positions along the LV bus
    pub position_spacing: Meters,
    pub conductors_per_feeder: u32,
    pub catalog: Vec<LvConductor>,
}

impl Default for InternalCablingConfig {
    fn default() -> Self {
        let catalog = [
            (0.5, 0.50),
            (0.75, 0.65),
            (1.0, 0.80),
            (1.5, 1.10),
            (2.5, 1.60),
            (4.0, 2.40),
            (6.0, 3.50),
            (10.0, 5.80),
            (16.0, 8.50),
            (25.0, 12.80),
            (35.0, 17.50),
            (50.0, 24.00),
            (70.0, 32.50),
            (95.0, 44.00),
            (120.0, 55.00),
            (150.0, 68.00),
            (185.0, 82.00),
            (240.0, 105.00),
            (300.0, 130.00),
            (400.0, 165.00),
        ]
        .iter()
        .map(|&(cross_section, cost)| LvConductor {
            cross_section: SquareMillimeters(cross_section),
            cost_per_meter: Euros(cost),
        })
        .collect();
        Self {
            level: VoltageLevel {
                nominal: Volts(400.0),
                max_voltage_drop: Fraction::from_percent(2.0),
                power_factor: 0.95,
            },
            conductivity: 56.0,
            position_spacing: Meters(4.0),
            conductors_per_feeder: 1,
            catalog,
        }
    }
}

// =============================================================================
// Distances
// =============================================================================

/// Where candidate distances come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSource {
    /// Use [`ManualDistances`]
    #[default]
    Manual,
    /// Search the nearest [`GridSite`] of each kind around the hub
    Nearest,
}

/// Operator-supplied distances to the nearest site of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualDistances {
    pub distribution: Option<Meters>,
    pub transmission: Option<Meters>,
    pub high_voltage: Option<Meters>,
}

impl Default for ManualDistances {
    fn default() -> Self {
        Self {
            distribution: Some(Meters(10.0)),
            transmission: None,
            high_voltage: None,
        }
    }
}

/// A known substation or HV line tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSite {
    pub kind: ConnectionType,
    #[serde(default)]
    pub name: Option<String>,
    pub position: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub source: DistanceSource,
    pub manual: ManualDistances,
    /// Connection types to mark unavailable regardless of distance
    pub unavailable: Vec<ConnectionType>,
    pub hub_position: Option<Coordinates>,
    pub sites: Vec<GridSite>,
    pub search_radius: Meters,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            source: DistanceSource::Manual,
            manual: ManualDistances::default(),
            unavailable: Vec::new(),
            hub_position: None,
            sites: Vec::new(),
            search_radius: Meters(10_000.0),
        }
    }
}

// =============================================================================
// Solver
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for one attempt
    pub time_limit_seconds: f64,
    /// Relative optimality gap accepted as optimal
    pub mip_gap: f64,
    /// Costs closer than this are treated as equal for tie-breaking
    pub tie_tolerance: Euros,
    /// Objective weight per kWh of battery throughput, keeps charge and
    /// discharge from overlapping. Not part of any reported cost.
    pub throughput_penalty: Euros,
    /// Factor applied to the MIP gap on the retry attempt
    pub retry_relaxation: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_seconds: 300.0,
            mip_gap: 1e-4,
            tie_tolerance: Euros(0.01),
            throughput_penalty: Euros(1e-3),
            retry_relaxation: 100.0,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

impl HubGridConfig {
    /// Check catalogs, bounds and tariffs before any solve is attempted.
    pub fn validate(&self) -> HubGridResult<()> {
        for kind in ConnectionType::ALL {
            let tariff = self.grid.tariff(kind);
            let values = [
                tariff.capacity_limit.0,
                tariff.fixed_cost.0,
                tariff.capacity_fee_per_kw.0,
                tariff.expansion_max.0,
                tariff.expansion_fixed_cost.0,
            ];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(HubGridError::Config(format!(
                    "{kind} tariff values must be finite and non-negative"
                )));
            }
        }
        for (name, level) in [
            ("medium voltage", &self.grid.medium_voltage_level),
            ("high voltage", &self.grid.high_voltage_level),
            ("internal LV", &self.internal_cabling.level),
        ] {
            validate_level(name, level)?;
        }

        for material in CableMaterial::ALL {
            self.cables.catalog(material).validate()?;
        }
        if self.cables.conductors_per_run == 0 {
            return Err(HubGridError::Config(
                "conductors_per_run must be at least 1".into(),
            ));
        }

        if self.transformers.catalog.is_empty() {
            return Err(HubGridError::Config("transformer catalog is empty".into()));
        }
        if self
            .transformers
            .catalog
            .iter()
            .any(|t| !(t.capacity.0 > 0.0) || t.cost.0 < 0.0)
        {
            return Err(HubGridError::Config(
                "transformer capacities must be positive and costs non-negative".into(),
            ));
        }
        if self.transformers.max_parallel_units == 0 {
            return Err(HubGridError::Config(
                "max_parallel_units must be at least 1".into(),
            ));
        }

        let battery = &self.battery;
        if !(battery.efficiency.0 > 0.0 && battery.efficiency.0 <= 1.0) {
            return Err(HubGridError::Config(format!(
                "battery efficiency must lie in (0, 1], got {}",
                battery.efficiency.0
            )));
        }
        for (name, soc) in [
            ("min_soc", battery.min_soc),
            ("max_soc", battery.max_soc),
            ("initial_soc", battery.initial_soc),
        ] {
            if !soc.is_unit_interval() {
                return Err(HubGridError::Config(format!(
                    "battery {name} must lie in [0, 1], got {}",
                    soc.0
                )));
            }
        }
        if battery.min_soc > battery.max_soc {
            return Err(HubGridError::Config(
                "battery min_soc exceeds max_soc".into(),
            ));
        }
        if battery.initial_soc < battery.min_soc || battery.initial_soc > battery.max_soc {
            return Err(HubGridError::Config(
                "battery initial_soc must lie between min_soc and max_soc".into(),
            ));
        }
        let amounts = [
            battery.cost_per_kwh.0,
            battery.cost_per_kw.0,
            battery.max_capacity.0,
            battery.max_power.0,
            battery.greedy_capacity.0,
            battery.greedy_power.0,
        ];
        if amounts.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(HubGridError::Config(
                "battery costs and limits must be finite and non-negative".into(),
            ));
        }

        if self.chargers.counts.total() > 0 && self.internal_cabling.catalog.is_empty() {
            return Err(HubGridError::Config(
                "internal cabling catalog is empty but chargers are installed".into(),
            ));
        }
        if !(self.internal_cabling.conductivity > 0.0) {
            return Err(HubGridError::Config(
                "internal cabling conductivity must be positive".into(),
            ));
        }

        if self.distances.source == DistanceSource::Nearest && self.distances.hub_position.is_none()
        {
            return Err(HubGridError::Config(
                "nearest-site distances need distances.hub_position".into(),
            ));
        }

        let solver = &self.solver;
        if !(solver.time_limit_seconds > 0.0) || !(solver.mip_gap > 0.0) {
            return Err(HubGridError::Config(
                "solver time limit and MIP gap must be positive".into(),
            ));
        }
        if solver.tie_tolerance.0 < 0.0 || solver.throughput_penalty.0 < 0.0 {
            return Err(HubGridError::Config(
                "tie tolerance and throughput penalty must be non-negative".into(),
            ));
        }
        if !(solver.retry_relaxation >= 1.0) {
            return Err(HubGridError::Config(
                "retry_relaxation must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn validate_level(name: &str, level: &VoltageLevel) -> HubGridResult<()> {
    if !(level.nominal.0 > 0.0) {
        return Err(HubGridError::Config(format!(
            "{name} nominal voltage must be positive"
        )));
    }
    if !(level.power_factor > 0.0 && level.power_factor <= 1.0) {
        return Err(HubGridError::Config(format!(
            "{name} power factor must lie in (0, 1]"
        )));
    }
    if !(level.max_voltage_drop.0 > 0.0 && level.max_voltage_drop.0 < 1.0) {
        return Err(HubGridError::Config(format!(
            "{name} voltage drop limit must lie in (0, 1)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        HubGridConfig::default().validate().unwrap();
    }

    #[test]
    fn test_empty_transformer_catalog_rejected() {
        let mut config = HubGridConfig::default();
        config.transformers.catalog.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, HubGridError::Config(_)));
        assert!(err.to_string().contains("transformer catalog is empty"));
    }

    #[test]
    fn test_unsorted_cable_catalog_rejected() {
        let mut config = HubGridConfig::default();
        config.cables.copper.options.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_soc_bounds_checked() {
        let mut config = HubGridConfig::default();
        config.battery.min_soc = Fraction(0.6);
        config.battery.initial_soc = Fraction(0.5);
        assert!(config.validate().is_err());

        let mut config = HubGridConfig::default();
        config.battery.efficiency = Fraction(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            [grid.existing_mv]
            capacity_limit = 1000.0

            [battery]
            cost_per_kwh = 0.0
            dispatch = "greedy"

            [distances]
            unavailable = ["transmission"]

            [distances.manual]
            distribution = 250.0
        "#;
        let config: HubGridConfig = toml::from_str(text).unwrap();
        assert_eq!(config.grid.existing_mv.capacity_limit, Kilowatts(1000.0));
        assert_eq!(config.grid.existing_mv.capacity_fee_per_kw, Euros(183.56));
        assert_eq!(config.grid.high_voltage.fixed_cost, Euros(2_500_000.0));
        assert_eq!(config.battery.cost_per_kwh, Euros(0.0));
        assert_eq!(config.battery.cost_per_kw, Euros(100.0));
        assert_eq!(config.battery.dispatch, DispatchMode::Greedy);
        assert_eq!(config.distances.manual.distribution, Some(Meters(250.0)));
        assert_eq!(config.distances.unavailable, vec![ConnectionType::Transmission]);
        assert_eq!(config.transformers.catalog.len(), 6);
        config.validate().unwrap();
    }

    #[test]
    fn test_available_power_follows_mode() {
        let mut battery = BatteryConfig::default();
        assert_eq!(battery.available_power(), Kilowatts(99_999.0));
        battery.dispatch = DispatchMode::Greedy;
        assert_eq!(battery.available_power(), Kilowatts(1_000.0));
        battery.include_battery = false;
        assert_eq!(battery.available_power(), Kilowatts::ZERO);
    }
}
