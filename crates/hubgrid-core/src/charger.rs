//! Charger types and the hub's charger fleet.

use serde::{Deserialize, Serialize};

use crate::units::{Euros, Kilowatts};

/// Charger power classes installed at a truck hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargerKind {
    /// Night charging (overnight, low power)
    Ncs,
    /// High power charging
    Hpc,
    /// Megawatt charging
    Mcs,
}

impl ChargerKind {
    /// Order in which chargers are placed along the internal LV bus,
    /// closest to the transformer first.
    pub const LAYOUT_ORDER: [ChargerKind; 3] = [ChargerKind::Mcs, ChargerKind::Hpc, ChargerKind::Ncs];

    pub fn label(self) -> &'static str {
        match self {
            ChargerKind::Ncs => "NCS",
            ChargerKind::Hpc => "HPC",
            ChargerKind::Mcs => "MCS",
        }
    }
}

/// Rated power and purchase cost of one charger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargerRating {
    pub power_kw: Kilowatts,
    pub unit_cost: Euros,
}

/// Number of installed chargers per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerCounts {
    pub ncs: u32,
    pub hpc: u32,
    pub mcs: u32,
}

impl ChargerCounts {
    pub fn get(&self, kind: ChargerKind) -> u32 {
        match kind {
            ChargerKind::Ncs => self.ncs,
            ChargerKind::Hpc => self.hpc,
            ChargerKind::Mcs => self.mcs,
        }
    }

    pub fn total(&self) -> u32 {
        self.ncs + self.hpc + self.mcs
    }
}

/// Charger catalog and installed fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerConfig {
    pub ncs: ChargerRating,
    pub hpc: ChargerRating,
    pub mcs: ChargerRating,
    pub counts: ChargerCounts,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            ncs: ChargerRating {
                power_kw: Kilowatts(100.0),
                unit_cost: Euros(35_000.0),
            },
            hpc: ChargerRating {
                power_kw: Kilowatts(400.0),
                unit_cost: Euros(110_000.0),
            },
            mcs: ChargerRating {
                power_kw: Kilowatts(1000.0),
                unit_cost: Euros(375_000.0),
            },
            counts: ChargerCounts {
                ncs: 4,
                hpc: 6,
                mcs: 2,
            },
        }
    }
}

impl ChargerConfig {
    pub fn rating(&self, kind: ChargerKind) -> ChargerRating {
        match kind {
            ChargerKind::Ncs => self.ncs,
            ChargerKind::Hpc => self.hpc,
            ChargerKind::Mcs => self.mcs,
        }
    }

    /// Purchase cost of all installed chargers
    pub fn units_cost(&self) -> Euros {
        ChargerKind::LAYOUT_ORDER
            .iter()
            .map(|&kind| self.rating(kind).unit_cost * f64::from(self.counts.get(kind)))
            .sum()
    }

    /// Sum of rated power over all installed chargers
    pub fn installed_power(&self) -> Kilowatts {
        ChargerKind::LAYOUT_ORDER
            .iter()
            .map(|&kind| self.rating(kind).power_kw * f64::from(self.counts.get(kind)))
            .sum()
    }

    /// Chargers in placement order, one entry per physical unit.
    pub fn placement(&self) -> Vec<ChargerKind> {
        ChargerKind::LAYOUT_ORDER
            .iter()
            .flat_map(|&kind| std::iter::repeat(kind).take(self.counts.get(kind) as usize))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fleet_cost() {
        let chargers = ChargerConfig::default();
        // 4 × 35k + 6 × 110k + 2 × 375k
        assert_eq!(chargers.units_cost(), Euros(1_550_000.0));
        assert_eq!(chargers.installed_power(), Kilowatts(4_800.0));
    }

    #[test]
    fn test_placement_order() {
        let chargers = ChargerConfig {
            counts: ChargerCounts {
                ncs: 1,
                hpc: 2,
                mcs: 1,
            },
            ..ChargerConfig::default()
        };
        assert_eq!(
            chargers.placement(),
            vec![
                ChargerKind::Mcs,
                ChargerKind::Hpc,
                ChargerKind::Hpc,
                ChargerKind::Ncs
            ]
        );
    }
}
