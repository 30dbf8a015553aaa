//! Battery option evaluation by greedy peak shaving.
//!
//! For a fixed battery (capacity, power rating, efficiency, SOC window) the
//! evaluator walks the demand profile chronologically against a target grid
//! peak `τ`:
//!
//! - above `τ` it discharges as much as SOC and power allow,
//! - below `τ` it recharges with the headroom up to `τ`.
//!
//! A bisection on `τ` finds the lowest target the battery can hold. When a
//! spike exceeds what is stored, the grid takes the rest; that is a result,
//! not an error.
//!
//! Efficiency is applied once, on charge: drawing `c` kW for one step of
//! `Δt` hours stores `η · c · Δt` kWh. Discharge is lossless, so
//! `grid + discharge − charge = demand` holds at the terminals.

use hubgrid_core::{
    BatteryConfig, DemandProfile, Euros, Fraction, Hours, KilowattHours, Kilowatts,
};
use serde::Serialize;
use thiserror::Error;

const BISECTION_STEPS: usize = 64;
const FEASIBILITY_TOL: f64 = 1e-9;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BatteryError {
    #[error("invalid battery specification: {0}")]
    InvalidSpec(String),
}

/// A concrete battery: size, operating window and economics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatterySpec {
    pub capacity: KilowattHours,
    pub power: Kilowatts,
    pub efficiency: Fraction,
    pub min_soc: Fraction,
    pub max_soc: Fraction,
    pub initial_soc: Fraction,
    pub cost_per_kwh: Euros,
    pub cost_per_kw: Euros,
}

impl BatterySpec {
    /// Battery of the given size with the configured window and prices.
    pub fn from_config(config: &BatteryConfig, capacity: KilowattHours, power: Kilowatts) -> Self {
        Self {
            capacity,
            power,
            efficiency: config.efficiency,
            min_soc: config.min_soc,
            max_soc: config.max_soc,
            initial_soc: config.initial_soc,
            cost_per_kwh: config.cost_per_kwh,
            cost_per_kw: config.cost_per_kw,
        }
    }

    pub fn investment_cost(&self) -> Euros {
        self.cost_per_kwh * self.capacity.value() + self.cost_per_kw * self.power.value()
    }

    pub fn is_empty(&self) -> bool {
        self.capacity <= KilowattHours::ZERO || self.power <= Kilowatts::ZERO
    }

    pub fn validate(&self) -> Result<(), BatteryError> {
        if !self.capacity.is_finite() || self.capacity < KilowattHours::ZERO {
            return Err(BatteryError::InvalidSpec(
                "capacity must be finite and non-negative".into(),
            ));
        }
        if !self.power.is_finite() || self.power < Kilowatts::ZERO {
            return Err(BatteryError::InvalidSpec(
                "power must be finite and non-negative".into(),
            ));
        }
        if !(self.efficiency.value() > 0.0 && self.efficiency.value() <= 1.0) {
            return Err(BatteryError::InvalidSpec(
                "efficiency must lie in (0, 1]".into(),
            ));
        }
        let window = [self.min_soc, self.initial_soc, self.max_soc];
        if window.iter().any(|s| !s.is_unit_interval()) || window.windows(2).any(|w| w[0] > w[1])
        {
            return Err(BatteryError::InvalidSpec(
                "expected 0 <= min_soc <= initial_soc <= max_soc <= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Schedule produced by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryDispatch {
    pub grid: Vec<Kilowatts>,
    pub charge: Vec<Kilowatts>,
    pub discharge: Vec<Kilowatts>,
    /// Stored energy at the end of each step
    pub soc: Vec<KilowattHours>,
    pub peak_before: Kilowatts,
    pub peak_after: Kilowatts,
}

impl BatteryDispatch {
    fn passthrough(demand: &[Kilowatts], soc: KilowattHours, peak: Kilowatts) -> Self {
        Self {
            grid: demand.to_vec(),
            charge: vec![Kilowatts::ZERO; demand.len()],
            discharge: vec![Kilowatts::ZERO; demand.len()],
            soc: vec![soc; demand.len()],
            peak_before: peak,
            peak_after: peak,
        }
    }

    /// Peak reduction achieved by the battery
    pub fn shaved(&self) -> Kilowatts {
        self.peak_before - self.peak_after
    }
}

/// Shave the profile's peak as far as the battery allows.
pub fn evaluate_battery(
    demand: &DemandProfile,
    spec: &BatterySpec,
) -> Result<BatteryDispatch, BatteryError> {
    spec.validate()?;
    let powers = demand.powers();
    let peak = demand.peak();

    if spec.is_empty() {
        return Ok(BatteryDispatch::passthrough(
            &powers,
            spec.initial_soc * spec.capacity,
            peak,
        ));
    }

    let step = demand.step();
    let floor = (peak - spec.power).max(Kilowatts::ZERO);
    let (lowest, ok) = simulate(&powers, spec, step, floor);
    if ok {
        return Ok(finish(lowest, peak));
    }

    let (mut lo, mut hi) = (floor, peak);
    let mut best = simulate(&powers, spec, step, hi).0;
    for _ in 0..BISECTION_STEPS {
        if (hi - lo).value() <= FEASIBILITY_TOL * peak.value().max(1.0) {
            break;
        }
        let mid = Kilowatts((lo.value() + hi.value()) / 2.0);
        let (dispatch, ok) = simulate(&powers, spec, step, mid);
        if ok {
            hi = mid;
            best = dispatch;
        } else {
            lo = mid;
        }
    }
    Ok(finish(best, peak))
}

fn finish(mut dispatch: BatteryDispatch, peak: Kilowatts) -> BatteryDispatch {
    dispatch.peak_before = peak;
    dispatch.peak_after = dispatch
        .grid
        .iter()
        .copied()
        .fold(Kilowatts::ZERO, Kilowatts::max);
    dispatch
}

/// Run the greedy policy against `target`. The flag reports whether the grid
/// stayed at or below the target throughout.
fn simulate(
    demand: &[Kilowatts],
    spec: &BatterySpec,
    step: Hours,
    target: Kilowatts,
) -> (BatteryDispatch, bool) {
    let soc_min = spec.min_soc * spec.capacity;
    let soc_max = spec.max_soc * spec.capacity;
    let eta = spec.efficiency.value();
    let mut soc = spec.initial_soc * spec.capacity;
    let mut ok = true;

    let n = demand.len();
    let mut dispatch = BatteryDispatch {
        grid: Vec::with_capacity(n),
        charge: Vec::with_capacity(n),
        discharge: Vec::with_capacity(n),
        soc: Vec::with_capacity(n),
        peak_before: Kilowatts::ZERO,
        peak_after: Kilowatts::ZERO,
    };

    for &load in demand {
        let (charge, discharge) = if load > target {
            let stored = ((soc - soc_min) / step).max(Kilowatts::ZERO);
            let d = (load - target).min(spec.power).min(stored);
            soc = soc - d * step;
            (Kilowatts::ZERO, d)
        } else {
            let room = ((soc_max - soc) / step / eta).max(Kilowatts::ZERO);
            let c = (target - load).min(spec.power).min(room);
            soc = (soc + c * step * eta).min(soc_max);
            (c, Kilowatts::ZERO)
        };
        let grid = load + charge - discharge;
        if grid.value() > target.value() + FEASIBILITY_TOL * target.value().max(1.0) {
            ok = false;
        }
        dispatch.grid.push(grid);
        dispatch.charge.push(charge);
        dispatch.discharge.push(discharge);
        dispatch.soc.push(soc);
    }
    (dispatch, ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(capacity: f64, power: f64) -> BatterySpec {
        BatterySpec::from_config(
            &BatteryConfig::default(),
            KilowattHours(capacity),
            Kilowatts(power),
        )
    }

    fn profile(values: &[f64]) -> DemandProfile {
        let powers: Vec<Kilowatts> = values.iter().copied().map(Kilowatts).collect();
        DemandProfile::uniform(15, &powers).unwrap()
    }

    fn spike_week() -> DemandProfile {
        let mut values = vec![800.0; 672];
        values[400] = 3000.0;
        profile(&values)
    }

    #[test]
    fn test_zero_capacity_is_passthrough() {
        let demand = spike_week();
        let dispatch = evaluate_battery(&demand, &spec(0.0, 500.0)).unwrap();
        assert_eq!(dispatch.grid, demand.powers());
        assert!(dispatch.charge.iter().all(|c| *c == Kilowatts::ZERO));
        assert!(dispatch.discharge.iter().all(|d| *d == Kilowatts::ZERO));
        assert_eq!(dispatch.peak_after, Kilowatts(3000.0));
    }

    #[test]
    fn test_shaves_single_spike_completely() {
        let demand = spike_week();
        // 2200 kW above base for 15 min needs 550 kWh, initial SOC holds 1000 kWh
        let dispatch = evaluate_battery(&demand, &spec(2000.0, 2500.0)).unwrap();
        assert!(dispatch.peak_after.value() <= 800.0 + 1e-3);
        assert!(dispatch.shaved().value() >= 2200.0 - 1e-3);
    }

    #[test]
    fn test_power_rating_limits_shaving() {
        let demand = spike_week();
        let dispatch = evaluate_battery(&demand, &spec(10_000.0, 1000.0)).unwrap();
        assert!((dispatch.peak_after.value() - 2000.0).abs() < 1e-3);
        assert!(dispatch.discharge.iter().all(|d| d.value() <= 1000.0 + 1e-9));
    }

    #[test]
    fn test_energy_shortfall_is_absorbed_by_grid() {
        // two hours at 2000 kW over a 500 kW base, battery holds 200 kWh usable
        let mut values = vec![500.0; 96];
        for v in values.iter_mut().skip(40).take(8) {
            *v = 2000.0;
        }
        let demand = profile(&values);
        let mut battery = spec(400.0, 2000.0);
        battery.initial_soc = Fraction(0.5);
        let dispatch = evaluate_battery(&demand, &battery).unwrap();
        assert!(dispatch.peak_after < Kilowatts(2000.0));
        assert!(dispatch.peak_after > Kilowatts(500.0));
    }

    #[test]
    fn test_balance_and_soc_window() {
        let demand = spike_week();
        let mut battery = spec(1500.0, 1200.0);
        battery.min_soc = Fraction(0.1);
        battery.max_soc = Fraction(0.9);
        let dispatch = evaluate_battery(&demand, &battery).unwrap();
        for (t, load) in demand.powers().iter().enumerate() {
            let balance = dispatch.grid[t] + dispatch.discharge[t] - dispatch.charge[t];
            assert!((balance - *load).value().abs() < 1e-9);
            assert!(dispatch.soc[t].value() >= 150.0 - 1e-9);
            assert!(dispatch.soc[t].value() <= 1350.0 + 1e-9);
        }
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let mut battery = spec(100.0, 100.0);
        battery.min_soc = Fraction(0.8);
        battery.initial_soc = Fraction(0.5);
        assert!(evaluate_battery(&spike_week(), &battery).is_err());
    }

    #[test]
    fn test_investment_cost() {
        assert_eq!(spec(1000.0, 500.0).investment_cost(), Euros(175_000.0 + 50_000.0));
    }
}
