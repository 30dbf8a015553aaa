//! Cable sizing for the grid connection and the hub-internal LV feeders.
//!
//! ## Connection cable
//!
//! A three-phase run carrying active power `P` at line voltage `U` and power
//! factor `cos φ` draws
//!
//! ```text
//! I = P / (√3 · U · cos φ)
//! ```
//!
//! and drops
//!
//! ```text
//! ΔU = √3 · I · L · cos φ / (κ · A)
//! ```
//!
//! over a route of length `L` with conductivity `κ` (S·m/mm²) and
//! cross-section `A`. [`size_cable`] picks the first catalog entry, in
//! ascending cross-section order, whose ampacity covers `I` and whose drop
//! stays within the configured share of `U`.
//!
//! ## Internal feeders
//!
//! Chargers hang off the LV busbar on single feeders. The required copper
//! cross-section for a feeder of length `l` is
//!
//! ```text
//! A = 2 · P · l · cos φ / (κ · Δu · U)
//! ```
//!
//! and the smallest catalog size at or above `A` is priced.

use hubgrid_core::{
    Amperes, CableCatalog, CableConfig, CableMaterial, CableOption, ChargerConfig, ChargerKind,
    Euros, Fraction, InternalCablingConfig, Kilowatts, LvConductor, Meters, SquareMillimeters,
    VoltageLevel,
};
use serde::Serialize;
use thiserror::Error;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Sizing failures. Callers drop the affected option instead of aborting.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SizingError {
    /// No cross-section satisfies ampacity and voltage drop together
    #[error(
        "no {material} cross-section carries {power} over {distance} \
         (needs {required_current}, max drop {max_drop_percent:.1}%)"
    )]
    Infeasible {
        material: CableMaterial,
        power: Kilowatts,
        distance: Meters,
        required_current: Amperes,
        max_drop_percent: f64,
    },

    /// No LV conductor is large enough for a charger feeder
    #[error("no LV conductor reaches {required} for a {kind} feeder of {length}")]
    FeederInfeasible {
        kind: &'static str,
        required: SquareMillimeters,
        length: Meters,
    },

    #[error("invalid sizing input: {0}")]
    InvalidInput(String),
}

/// Result of sizing one connection cable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizedCable {
    pub option: CableOption,
    pub distance: Meters,
    pub required_current: Amperes,
    /// Voltage drop at the sized power as share of nominal voltage
    pub voltage_drop: Fraction,
}

/// Current drawn by a balanced three-phase load.
pub fn required_current(power: Kilowatts, level: &VoltageLevel) -> Amperes {
    Amperes(power.value() * 1000.0 / (SQRT_3 * level.nominal.value() * level.power_factor))
}

/// Voltage drop of a three-phase run as share of the nominal voltage.
pub fn voltage_drop(
    current: Amperes,
    distance: Meters,
    cross_section: SquareMillimeters,
    conductivity: f64,
    level: &VoltageLevel,
) -> Fraction {
    let drop_volts = SQRT_3 * current.value() * distance.value() * level.power_factor
        / (conductivity * cross_section.value());
    Fraction(drop_volts / level.nominal.value())
}

/// Pick the smallest cable that carries `power` over `distance`.
pub fn size_cable(
    power: Kilowatts,
    distance: Meters,
    level: &VoltageLevel,
    catalog: &CableCatalog,
) -> Result<SizedCable, SizingError> {
    if !power.is_finite() || power < Kilowatts::ZERO {
        return Err(SizingError::InvalidInput(format!(
            "power must be finite and non-negative, got {}",
            power.value()
        )));
    }
    if !distance.is_finite() || distance < Meters::ZERO {
        return Err(SizingError::InvalidInput(format!(
            "distance must be finite and non-negative, got {}",
            distance.value()
        )));
    }

    let current = required_current(power, level);
    catalog
        .options
        .iter()
        .find_map(|option| {
            let drop = voltage_drop(
                current,
                distance,
                option.cross_section,
                catalog.conductivity,
                level,
            );
            (option.current_capacity >= current && drop <= level.max_voltage_drop).then_some(
                SizedCable {
                    option: *option,
                    distance,
                    required_current: current,
                    voltage_drop: drop,
                },
            )
        })
        .ok_or(SizingError::Infeasible {
            material: catalog.material,
            power,
            distance,
            required_current: current,
            max_drop_percent: level.max_voltage_drop.as_percent(),
        })
}

/// Largest power a catalog entry can carry over `distance`.
///
/// Inverse of the two checks in [`size_cable`]: ampacity bounds the current
/// directly, the drop limit bounds it through the route resistance.
pub fn carrying_limit(
    option: &CableOption,
    distance: Meters,
    conductivity: f64,
    level: &VoltageLevel,
) -> Kilowatts {
    let by_ampacity = option.current_capacity.value();
    let by_drop = if distance.value() > 0.0 {
        level.max_voltage_drop.value() * level.nominal.value() * conductivity
            * option.cross_section.value()
            / (SQRT_3 * distance.value() * level.power_factor)
    } else {
        f64::INFINITY
    };
    let current = by_ampacity.min(by_drop);
    Kilowatts(SQRT_3 * level.nominal.value() * level.power_factor * current / 1000.0)
}

/// Installed cost of one cable run: conductors, terminations and trench.
pub fn run_cost(option: &CableOption, distance: Meters, cables: &CableConfig) -> Euros {
    let conductors = f64::from(cables.conductors_per_run);
    option.cost_per_meter * (distance.value() * conductors)
        + cables.hardware_cost_per_conductor * conductors
        + cables.trenching_cost_per_meter * distance.value()
}

/// A catalog entry seen as a capacity step of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CableTier {
    pub option: CableOption,
    pub limit: Kilowatts,
    pub cost: Euros,
}

/// Capacity steps of a catalog over `distance`, dropping every entry that
/// is no stronger than a cheaper one.
pub fn cable_tiers(
    catalog: &CableCatalog,
    distance: Meters,
    level: &VoltageLevel,
    cables: &CableConfig,
) -> Vec<CableTier> {
    let mut tiers: Vec<CableTier> = catalog
        .options
        .iter()
        .map(|option| CableTier {
            option: *option,
            limit: carrying_limit(option, distance, catalog.conductivity, level),
            cost: run_cost(option, distance, cables),
        })
        .collect();
    tiers.sort_by(|a, b| {
        a.cost
            .value()
            .total_cmp(&b.cost.value())
            .then(b.limit.value().total_cmp(&a.limit.value()))
    });

    let mut front: Vec<CableTier> = Vec::with_capacity(tiers.len());
    for tier in tiers {
        if front.last().map_or(true, |best| tier.limit > best.limit) {
            front.push(tier);
        }
    }
    front
}

// =============================================================================
// Internal LV feeders
// =============================================================================

/// One charger feeder inside the hub.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeederCable {
    pub charger: ChargerKind,
    pub length: Meters,
    pub required_cross_section: SquareMillimeters,
    pub conductor: LvConductor,
    pub cost: Euros,
}

/// Feeder layout and cost of the hub-internal cabling.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InternalCabling {
    pub feeders: Vec<FeederCable>,
    pub total_cost: Euros,
}

/// Size one copper feeder per installed charger.
///
/// Chargers are placed pairwise along the busbar in the order MCS, HPC,
/// NCS, so charger `i` sits `spacing · (i / 2 + 1)` away from the
/// transformer.
pub fn size_internal_cabling(
    chargers: &ChargerConfig,
    cabling: &InternalCablingConfig,
) -> Result<InternalCabling, SizingError> {
    let level = &cabling.level;
    let allowed_drop = level.max_voltage_drop.value() * level.nominal.value();
    let mut feeders = Vec::new();

    for (position, kind) in chargers.placement().into_iter().enumerate() {
        let length = cabling.position_spacing * (position / 2 + 1) as f64;
        let power_w = chargers.rating(kind).power_kw.value() * 1000.0;
        let required = SquareMillimeters(
            2.0 * power_w * length.value() * level.power_factor
                / (cabling.conductivity * allowed_drop * level.nominal.value()),
        );
        let conductor = cabling
            .catalog
            .iter()
            .find(|c| c.cross_section >= required)
            .copied()
            .ok_or(SizingError::FeederInfeasible {
                kind: kind.label(),
                required,
                length,
            })?;
        let cost =
            conductor.cost_per_meter * (length.value() * f64::from(cabling.conductors_per_feeder));
        feeders.push(FeederCable {
            charger: kind,
            length,
            required_cross_section: required,
            conductor,
            cost,
        });
    }

    let total_cost = feeders.iter().map(|f| f.cost).sum();
    Ok(InternalCabling {
        feeders,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubgrid_core::{ChargerCounts, HubGridConfig, Volts};

    fn mv() -> VoltageLevel {
        HubGridConfig::default().grid.medium_voltage_level
    }

    /// Reference selection: the smallest entry passing both checks.
    fn brute_force(
        power: Kilowatts,
        distance: Meters,
        level: &VoltageLevel,
        catalog: &CableCatalog,
    ) -> Option<SquareMillimeters> {
        let current = required_current(power, level);
        catalog
            .options
            .iter()
            .filter(|o| o.current_capacity >= current)
            .filter(|o| {
                voltage_drop(current, distance, o.cross_section, catalog.conductivity, level)
                    <= level.max_voltage_drop
            })
            .map(|o| o.cross_section)
            .fold(None, |best: Option<SquareMillimeters>, a| {
                Some(best.map_or(a, |b| b.min(a)))
            })
    }

    #[test]
    fn test_required_current_mv() {
        // 5 MW at 20 kV, pf 0.9 -> ~160 A
        let i = required_current(Kilowatts(5000.0), &mv());
        assert!((i.value() - 160.375).abs() < 0.01);
    }

    #[test]
    fn test_size_short_run_limited_by_ampacity() {
        let catalog = CableCatalog::aluminium_mv();
        let sized = size_cable(Kilowatts(5000.0), Meters(10.0), &mv(), &catalog).unwrap();
        // 160 A: 16 mm² (105 A) and 25 mm² (140 A) are too small
        assert_eq!(sized.option.cross_section, SquareMillimeters(35.0));
        assert!(sized.voltage_drop.value() < 0.001);
    }

    #[test]
    fn test_long_run_limited_by_voltage_drop() {
        let catalog = CableCatalog::aluminium_mv();
        let short = size_cable(Kilowatts(5000.0), Meters(10.0), &mv(), &catalog).unwrap();
        let long = size_cable(Kilowatts(5000.0), Meters(20_000.0), &mv(), &catalog).unwrap();
        assert!(long.option.cross_section > short.option.cross_section);
        assert!(long.voltage_drop <= mv().max_voltage_drop);
    }

    #[test]
    fn test_selection_is_minimal_across_grid() {
        let level = mv();
        for catalog in [CableCatalog::aluminium_mv(), CableCatalog::copper_mv()] {
            for power in [0.0, 50.0, 900.0, 3_000.0, 7_500.0, 15_000.0, 40_000.0, 80_000.0] {
                for distance in [0.0, 10.0, 500.0, 5_000.0, 30_000.0] {
                    let expected = brute_force(Kilowatts(power), Meters(distance), &level, &catalog);
                    let actual = size_cable(Kilowatts(power), Meters(distance), &level, &catalog)
                        .ok()
                        .map(|s| s.option.cross_section);
                    assert_eq!(
                        actual, expected,
                        "{} at {power} kW over {distance} m",
                        catalog.material
                    );
                }
            }
        }
    }

    #[test]
    fn test_infeasible_when_catalog_exhausted() {
        let catalog = CableCatalog::copper_mv();
        let err = size_cable(Kilowatts(80_000.0), Meters(100.0), &mv(), &catalog).unwrap_err();
        assert!(matches!(
            err,
            SizingError::Infeasible {
                material: CableMaterial::Copper,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_negative_inputs() {
        let catalog = CableCatalog::aluminium_mv();
        assert!(matches!(
            size_cable(Kilowatts(-1.0), Meters(1.0), &mv(), &catalog),
            Err(SizingError::InvalidInput(_))
        ));
        assert!(matches!(
            size_cable(Kilowatts(1.0), Meters(f64::NAN), &mv(), &catalog),
            Err(SizingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_carrying_limit_inverts_sizing() {
        let level = mv();
        let catalog = CableCatalog::aluminium_mv();
        let distance = Meters(8_000.0);
        for option in &catalog.options {
            let limit = carrying_limit(option, distance, catalog.conductivity, &level);
            let current = required_current(limit * 0.999, &level);
            assert!(current <= option.current_capacity);
            let drop = voltage_drop(
                current,
                distance,
                option.cross_section,
                catalog.conductivity,
                &level,
            );
            assert!(drop <= level.max_voltage_drop);
        }
    }

    #[test]
    fn test_run_cost_formula() {
        let cables = CableConfig::default();
        let option = cables.aluminium.options[0]; // 7.77 EUR/m
        let cost = run_cost(&option, Meters(100.0), &cables);
        // 7.77·100·3 + 930·3 + 34·100
        assert!((cost.value() - (2331.0 + 2790.0 + 3400.0)).abs() < 1e-9);
    }

    #[test]
    fn test_tiers_strictly_increase() {
        let cables = CableConfig::default();
        let tiers = cable_tiers(&cables.aluminium, Meters(2_000.0), &mv(), &cables);
        assert!(!tiers.is_empty());
        for pair in tiers.windows(2) {
            assert!(pair[1].limit > pair[0].limit);
            assert!(pair[1].cost > pair[0].cost);
        }
    }

    #[test]
    fn test_internal_feeders_follow_layout() {
        let chargers = ChargerConfig {
            counts: ChargerCounts {
                ncs: 1,
                hpc: 1,
                mcs: 2,
            },
            ..ChargerConfig::default()
        };
        let cabling = InternalCablingConfig::default();
        let result = size_internal_cabling(&chargers, &cabling).unwrap();
        let lengths: Vec<f64> = result.feeders.iter().map(|f| f.length.value()).collect();
        assert_eq!(lengths, vec![4.0, 4.0, 8.0, 8.0]);
        assert_eq!(result.feeders[0].charger, ChargerKind::Mcs);
        assert_eq!(result.feeders[3].charger, ChargerKind::Ncs);

        // MCS at 4 m: 2·1e6·4·0.95 / (56·8·400) ≈ 42.4 mm² -> 50 mm²
        assert_eq!(
            result.feeders[0].conductor.cross_section,
            SquareMillimeters(50.0)
        );
        let expected: Euros = result.feeders.iter().map(|f| f.cost).sum();
        assert_eq!(result.total_cost, expected);
    }

    #[test]
    fn test_internal_feeder_too_large() {
        let chargers = ChargerConfig {
            counts: ChargerCounts {
                ncs: 0,
                hpc: 0,
                mcs: 1,
            },
            ..ChargerConfig::default()
        };
        let mut cabling = InternalCablingConfig::default();
        cabling.level.nominal = Volts(100.0);
        assert!(matches!(
            size_internal_cabling(&chargers, &cabling),
            Err(SizingError::FeederInfeasible { kind: "MCS", .. })
        ));
    }
}
