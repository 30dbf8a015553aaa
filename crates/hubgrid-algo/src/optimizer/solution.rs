//! Planning solution data structures

use super::solver::SolveStatus;
use crate::cable::SizedCable;
use crate::transformer::TransformerArrangement;
use hubgrid_core::{ConnectionType, Diagnostics, Euros, Hours, KilowattHours, Kilowatts};
use serde::Serialize;
use std::time::Duration;

/// Cost of the chosen plan, by component. Amounts are rounded to cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    /// Connection fixed cost, including a substation expansion
    pub connection: Euros,
    /// Capacity fee on the peak import
    pub capacity: Euros,
    pub battery: Euros,
    pub transformer: Euros,
    pub cable: Euros,
    /// Charger units and internal cabling
    pub charger: Euros,
}

impl CostBreakdown {
    pub fn rounded(self) -> Self {
        Self {
            connection: self.connection.to_cents(),
            capacity: self.capacity.to_cents(),
            battery: self.battery.to_cents(),
            transformer: self.transformer.to_cents(),
            cable: self.cable.to_cents(),
            charger: self.charger.to_cents(),
        }
    }

    pub fn total(&self) -> Euros {
        self.connection + self.capacity + self.battery + self.transformer + self.cable + self.charger
    }
}

/// Selector of one connection candidate in the final plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionSelector {
    pub kind: ConnectionType,
    pub available: bool,
    pub selected: bool,
}

/// Complete solution of one planning run
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub status: SolveStatus,
    pub selected_connection: ConnectionType,
    /// One entry per connection type, exactly one selected
    pub connection_selectors: Vec<ConnectionSelector>,
    pub expanded: bool,
    /// Capacity drawn beyond the unexpanded limit
    pub expansion_used: Kilowatts,
    /// `None` for connections without a new cable run
    pub selected_cable: Option<SizedCable>,
    pub selected_transformer: TransformerArrangement,
    pub battery_capacity: KilowattHours,
    pub battery_power: Kilowatts,
    pub step_minutes: u32,
    pub demand: Vec<Kilowatts>,
    pub grid: Vec<Kilowatts>,
    pub battery_charge: Vec<Kilowatts>,
    pub battery_discharge: Vec<Kilowatts>,
    pub soc: Vec<KilowattHours>,
    pub peak_demand: Kilowatts,
    pub peak_grid: Kilowatts,
    pub total_cost: Euros,
    pub cost_breakdown: CostBreakdown,
    /// Relative gap between the reported cost and the best lower bound
    pub mip_gap: f64,
    /// Steps where charge and discharge both exceeded the tolerance
    pub simultaneous_steps: usize,
    pub layouts_enumerated: usize,
    pub layouts_evaluated: usize,
    pub lp_solves: usize,
    pub attempts: u32,
    #[serde(serialize_with = "serialize_seconds")]
    pub solve_time: Duration,
    pub diagnostics: Diagnostics,
}

fn serialize_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl Solution {
    pub fn has_battery(&self) -> bool {
        self.battery_capacity > KilowattHours::ZERO
    }

    /// Peak reduction achieved by the battery
    pub fn peak_shaved(&self) -> Kilowatts {
        (self.peak_demand - self.peak_grid).max(Kilowatts::ZERO)
    }

    /// Energy drawn from the grid over the horizon
    pub fn grid_energy(&self) -> KilowattHours {
        let step = Hours::from_minutes(self.step_minutes);
        self.grid.iter().map(|g| *g * step).sum()
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Hub Connection Plan\n{}\n", "=".repeat(40)));
        s.push_str(&format!("Status: {}\n", self.status));
        s.push_str(&format!("Connection: {}", self.selected_connection));
        if self.expanded {
            s.push_str(&format!(" (expanded by {})", self.expansion_used));
        }
        s.push('\n');
        match &self.selected_cable {
            Some(cable) => s.push_str(&format!(
                "Cable: {} {} over {} ({:.2}% drop)\n",
                cable.option.material,
                cable.option.cross_section,
                cable.distance,
                cable.voltage_drop.as_percent()
            )),
            None => s.push_str("Cable: none\n"),
        }
        s.push_str(&format!("Transformer: {}\n", self.selected_transformer));
        if self.has_battery() {
            s.push_str(&format!(
                "Battery: {} / {}\n",
                self.battery_capacity, self.battery_power
            ));
        } else {
            s.push_str("Battery: none\n");
        }
        s.push_str(&format!("Peak: {} -> {}\n", self.peak_demand, self.peak_grid));
        s.push_str(&format!("Grid Energy: {}\n", self.grid_energy()));
        s.push_str(&format!("Total Cost: {}\n", self.total_cost));
        let b = &self.cost_breakdown;
        s.push_str(&format!("  Connection:  {}\n", b.connection));
        s.push_str(&format!("  Capacity:    {}\n", b.capacity));
        s.push_str(&format!("  Battery:     {}\n", b.battery));
        s.push_str(&format!("  Transformer: {}\n", b.transformer));
        s.push_str(&format!("  Cable:       {}\n", b.cable));
        s.push_str(&format!("  Charger:     {}\n", b.charger));
        s.push_str(&format!("MIP Gap: {:.4}%\n", self.mip_gap * 100.0));
        s.push_str(&format!(
            "Layouts: {} enumerated, {} evaluated, {} LP solves\n",
            self.layouts_enumerated, self.layouts_evaluated, self.lp_solves
        ));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));
        if self.diagnostics.has_issues() {
            s.push_str(&format!("\n{}", self.diagnostics));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_rounds_each_component() {
        let breakdown = CostBreakdown {
            connection: Euros(500_000.0),
            capacity: Euros(91_780.004),
            battery: Euros(12_345.678),
            transformer: Euros(120_000.0),
            cable: Euros(9_521.3333),
            charger: Euros(1_550_000.0),
        }
        .rounded();
        assert_eq!(breakdown.capacity, Euros(91_780.0));
        assert_eq!(breakdown.battery, Euros(12_345.68));
        assert_eq!(breakdown.cable, Euros(9_521.33));
        let total = breakdown.total().value();
        assert!((total - 2_283_647.01).abs() < 1e-6);
    }

    #[test]
    fn test_default_breakdown_is_zero() {
        assert_eq!(CostBreakdown::default().total(), Euros::ZERO);
    }
}
