//! Grid and battery schedule for a given capacity
//!
//! [`DispatchModel`] answers one question for the search: what is the
//! cheapest schedule (capacity fee plus battery) when the grid import may not
//! exceed `C`? Depending on the battery settings this is a closed form
//! (no battery, fixed greedy battery) or the joint sizing LP.

use crate::battery::{evaluate_battery, BatteryError, BatterySpec};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use hubgrid_core::{
    BatteryConfig, DemandProfile, DispatchMode, Euros, Hours, KilowattHours, Kilowatts,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use web_time::Instant;

/// Values below this are solver noise.
const ZERO_TOL: f64 = 1e-6;

#[derive(Debug, Clone, Error)]
pub(crate) enum DispatchError {
    #[error("LP solver failed: {0}")]
    Solver(String),

    #[error(transparent)]
    Battery(#[from] BatteryError),
}

/// Schedule and battery size chosen for one capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatch {
    pub grid: Vec<Kilowatts>,
    pub charge: Vec<Kilowatts>,
    pub discharge: Vec<Kilowatts>,
    /// Stored energy at the end of each step
    pub soc: Vec<KilowattHours>,
    pub battery_capacity: KilowattHours,
    pub battery_power: Kilowatts,
    /// Highest grid import of the schedule
    pub peak: Kilowatts,
    pub capacity_cost: Euros,
    pub battery_cost: Euros,
}

impl Dispatch {
    /// Cost that depends on the schedule: capacity fee plus battery
    pub fn operating_cost(&self) -> Euros {
        self.capacity_cost + self.battery_cost
    }

    fn direct(demand: &[Kilowatts], fee: Euros) -> Self {
        let peak = peak_of(demand);
        Self {
            grid: demand.to_vec(),
            charge: vec![Kilowatts::ZERO; demand.len()],
            discharge: vec![Kilowatts::ZERO; demand.len()],
            soc: vec![KilowattHours::ZERO; demand.len()],
            battery_capacity: KilowattHours::ZERO,
            battery_power: Kilowatts::ZERO,
            peak,
            capacity_cost: fee * peak.value(),
            battery_cost: Euros::ZERO,
        }
    }
}

fn peak_of(series: &[Kilowatts]) -> Kilowatts {
    series.iter().copied().fold(Kilowatts::ZERO, Kilowatts::max)
}

/// How schedules are produced for a run.
#[derive(Debug, Clone)]
pub(crate) enum DispatchModel {
    /// No battery: the grid serves the demand as is
    Direct { demand: Vec<Kilowatts> },
    /// Fixed battery scheduled by the greedy shaver
    Fixed {
        dispatch: crate::battery::BatteryDispatch,
        cost: Euros,
        capacity: KilowattHours,
        power: Kilowatts,
    },
    /// Battery size and schedule decided by the LP
    Joint(JointLp),
}

impl DispatchModel {
    /// Pick the model named by the battery settings.
    pub fn new(
        demand: &DemandProfile,
        battery: &BatteryConfig,
        throughput_penalty: Euros,
        tie_tolerance: Euros,
    ) -> Result<Self, DispatchError> {
        if !battery.include_battery {
            return Ok(Self::Direct {
                demand: demand.powers(),
            });
        }
        match battery.dispatch {
            DispatchMode::Greedy => {
                let spec =
                    BatterySpec::from_config(battery, battery.greedy_capacity, battery.greedy_power);
                let dispatch = evaluate_battery(demand, &spec)?;
                debug!(
                    peak_before = dispatch.peak_before.value(),
                    peak_after = dispatch.peak_after.value(),
                    "greedy battery schedule fixed"
                );
                Ok(Self::Fixed {
                    dispatch,
                    cost: spec.investment_cost(),
                    capacity: spec.capacity,
                    power: spec.power,
                })
            }
            DispatchMode::Joint => Ok(Self::Joint(JointLp {
                demand: demand.powers(),
                step: demand.step(),
                battery: battery.clone(),
                throughput_penalty,
                tie_tolerance,
                deadline: None,
            })),
        }
    }

    /// Stop LP solves at `deadline`. `None` leaves them unbounded.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        if let Self::Joint(lp) = &mut self {
            lp.deadline = deadline;
        }
        self
    }

    /// Whether [`DispatchModel::evaluate`] runs an LP
    pub fn solves_lp(&self) -> bool {
        matches!(self, Self::Joint(_))
    }

    /// Cheapest schedule with import capped at `capacity` (`None` for no
    /// cap). `Ok(None)` means no schedule fits.
    pub fn evaluate(
        &self,
        capacity: Option<Kilowatts>,
        fee: Euros,
    ) -> Result<Option<Dispatch>, DispatchError> {
        let fits = |peak: Kilowatts| capacity.map_or(true, |cap| peak <= cap);
        match self {
            Self::Direct { demand } => {
                let dispatch = Dispatch::direct(demand, fee);
                Ok(fits(dispatch.peak).then_some(dispatch))
            }
            Self::Fixed {
                dispatch,
                cost,
                capacity: battery_capacity,
                power,
            } => {
                if !fits(dispatch.peak_after) {
                    return Ok(None);
                }
                Ok(Some(Dispatch {
                    grid: dispatch.grid.clone(),
                    charge: dispatch.charge.clone(),
                    discharge: dispatch.discharge.clone(),
                    soc: dispatch.soc.clone(),
                    battery_capacity: *battery_capacity,
                    battery_power: *power,
                    peak: dispatch.peak_after,
                    capacity_cost: fee * dispatch.peak_after.value(),
                    battery_cost: *cost,
                }))
            }
            Self::Joint(lp) => lp.evaluate(capacity, fee),
        }
    }
}

/// Joint battery sizing and scheduling LP.
#[derive(Debug, Clone)]
pub(crate) struct JointLp {
    demand: Vec<Kilowatts>,
    step: Hours,
    battery: BatteryConfig,
    throughput_penalty: Euros,
    tie_tolerance: Euros,
    deadline: Option<Instant>,
}

impl JointLp {
    fn evaluate(
        &self,
        capacity: Option<Kilowatts>,
        fee: Euros,
    ) -> Result<Option<Dispatch>, DispatchError> {
        let peak = peak_of(&self.demand);
        if let Some(cap) = capacity {
            if peak - self.battery.max_power > cap {
                return Ok(None);
            }
        }

        let Some(lp) = self.solve(capacity, fee)? else {
            return Ok(None);
        };

        // A battery that does not pay for itself is left out.
        if capacity.map_or(true, |cap| peak <= cap) {
            let direct = Dispatch::direct(&self.demand, fee);
            if lp.operating_cost() >= direct.operating_cost() - self.tie_tolerance {
                return Ok(Some(direct));
            }
        }
        Ok(Some(lp))
    }

    fn solve(
        &self,
        capacity: Option<Kilowatts>,
        fee: Euros,
    ) -> Result<Option<Dispatch>, DispatchError> {
        let battery = &self.battery;
        let dt = self.step.value();
        let eta = battery.efficiency.value();
        let epsilon = self.throughput_penalty.value();
        let n = self.demand.len();

        let grid_bound = || match capacity {
            Some(cap) => variable().min(0.0).max(cap.value()),
            None => variable().min(0.0),
        };

        let mut vars = variables!();
        let energy = vars.add(variable().min(0.0).max(battery.max_capacity.value()));
        let power = vars.add(variable().min(0.0).max(battery.max_power.value()));
        let peak = vars.add(grid_bound());
        let grid: Vec<Variable> = (0..n).map(|_| vars.add(grid_bound())).collect();
        let charge: Vec<Variable> = (0..n)
            .map(|_| vars.add(variable().min(0.0).max(battery.max_power.value())))
            .collect();
        let discharge: Vec<Variable> = (0..n)
            .map(|_| vars.add(variable().min(0.0).max(battery.max_power.value())))
            .collect();
        let soc: Vec<Variable> = (0..n)
            .map(|_| vars.add(variable().min(0.0).max(battery.max_capacity.value())))
            .collect();

        let mut objective = Expression::from(0.0);
        objective += fee.value() * peak;
        objective += (battery.cost_per_kwh.value() + epsilon) * energy;
        objective += (battery.cost_per_kw.value() + epsilon) * power;
        for t in 0..n {
            objective += (epsilon * dt) * charge[t];
            objective += (epsilon * dt) * discharge[t];
        }

        let mut model = vars.minimise(objective).using(clarabel);
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            model.settings().time_limit(remaining.as_secs_f64());
        }

        let initial = battery.initial_soc.value();
        for t in 0..n {
            let load = self.demand[t].value();
            model = model.with(constraint!(grid[t] + discharge[t] - charge[t] == load));
            model = model.with(constraint!(grid[t] - peak <= 0.0));
            model = model.with(constraint!(charge[t] - power <= 0.0));
            model = model.with(constraint!(discharge[t] - power <= 0.0));

            let previous: Expression = if t == 0 {
                initial * energy
            } else {
                Expression::from(soc[t - 1])
            };
            model = model.with(constraint!(
                soc[t] - previous - (eta * dt) * charge[t] + dt * discharge[t] == 0.0
            ));
            model = model.with(constraint!(
                soc[t] - battery.min_soc.value() * energy >= 0.0
            ));
            model = model.with(constraint!(
                soc[t] - battery.max_soc.value() * energy <= 0.0
            ));
        }
        if battery.cyclic && n > 0 {
            model = model.with(constraint!(soc[n - 1] - initial * energy >= 0.0));
        }

        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                debug!(capacity = ?capacity.map(|c| c.value()), "dispatch LP infeasible");
                return Ok(None);
            }
            Err(e) => return Err(DispatchError::Solver(e.to_string())),
        };

        let clean = |v: f64| if v.abs() < ZERO_TOL { 0.0 } else { v.max(0.0) };
        let values = |vars: &[Variable]| -> Vec<Kilowatts> {
            vars.iter().map(|v| Kilowatts(clean(solution.value(*v)))).collect()
        };
        let mut grid = values(&grid);
        let mut charge = values(&charge);
        let mut discharge = values(&discharge);
        let battery_capacity = KilowattHours(clean(solution.value(energy)));
        let battery_power = Kilowatts(clean(solution.value(power)));

        let soc = net_flows(
            &mut grid,
            &mut charge,
            &mut discharge,
            &StorageLimits {
                efficiency: eta,
                step_hours: dt,
                initial: battery.initial_soc.value() * battery_capacity.value(),
                ceiling: battery.max_soc.value() * battery_capacity.value(),
            },
        );

        let realized_peak = peak_of(&grid);
        Ok(Some(Dispatch {
            grid,
            charge,
            discharge,
            soc,
            battery_capacity,
            battery_power,
            peak: realized_peak,
            capacity_cost: fee * realized_peak.value(),
            battery_cost: battery.cost_per_kwh * battery_capacity.value()
                + battery.cost_per_kw * battery_power.value(),
        }))
    }
}

/// Battery figures needed to replay a schedule.
#[derive(Debug, Clone, Copy)]
struct StorageLimits {
    efficiency: f64,
    step_hours: f64,
    /// Stored energy before the first step, kWh
    initial: f64,
    /// Highest allowed stored energy, kWh
    ceiling: f64,
}

/// Keep only the net battery flow of each step and replay the state of
/// charge.
///
/// Netting leaves the import of a step unchanged and never lowers the stored
/// energy, so the floor and the cyclic end condition still hold. Charge that
/// would lift the state of charge over the ceiling is dropped together with
/// the import that fed it; the peak can only fall.
fn net_flows(
    grid: &mut [Kilowatts],
    charge: &mut [Kilowatts],
    discharge: &mut [Kilowatts],
    limits: &StorageLimits,
) -> Vec<KilowattHours> {
    let zeroed = |v: f64| if v < ZERO_TOL { 0.0 } else { v };
    let gain = limits.efficiency * limits.step_hours;
    let mut stored = limits.initial;
    let mut soc = Vec::with_capacity(grid.len());
    for t in 0..grid.len() {
        let net = charge[t].value() - discharge[t].value();
        let mut c = zeroed(net.max(0.0));
        let d = zeroed((-net).max(0.0));

        let excess = stored + gain * c - limits.step_hours * d - limits.ceiling;
        if c > 0.0 && excess > 0.0 && gain > 0.0 {
            let curtailed = (excess / gain).min(c);
            c -= curtailed;
            grid[t] = (grid[t] - Kilowatts(curtailed)).max(Kilowatts::ZERO);
        }

        stored = (stored + gain * c - limits.step_hours * d).max(0.0);
        charge[t] = Kilowatts(c);
        discharge[t] = Kilowatts(d);
        soc.push(KilowattHours(stored));
    }
    soc
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubgrid_core::Fraction;

    const FEE: Euros = Euros(183.56);

    fn profile(values: &[f64]) -> DemandProfile {
        let powers: Vec<Kilowatts> = values.iter().copied().map(Kilowatts).collect();
        DemandProfile::uniform(15, &powers).unwrap()
    }

    fn spike_day() -> DemandProfile {
        let mut values = vec![800.0; 96];
        values[40] = 3000.0;
        profile(&values)
    }

    fn joint(battery: BatteryConfig) -> DispatchModel {
        DispatchModel::Joint(JointLp {
            demand: spike_day().powers(),
            step: Hours(0.25),
            battery,
            throughput_penalty: Euros(1e-3),
            tie_tolerance: Euros(0.01),
            deadline: None,
        })
    }

    #[test]
    fn test_direct_respects_capacity() {
        let demand = spike_day();
        let battery = BatteryConfig {
            include_battery: false,
            ..BatteryConfig::default()
        };
        let model = DispatchModel::new(&demand, &battery, Euros(1e-3), Euros(0.01)).unwrap();
        assert!(!model.solves_lp());
        let dispatch = model.evaluate(None, FEE).unwrap().unwrap();
        assert_eq!(dispatch.peak, Kilowatts(3000.0));
        assert_eq!(dispatch.operating_cost(), FEE * 3000.0);
        assert!(model.evaluate(Some(Kilowatts(2999.0)), FEE).unwrap().is_none());
    }

    #[test]
    fn test_greedy_model_uses_fixed_battery() {
        let demand = spike_day();
        let battery = BatteryConfig {
            dispatch: DispatchMode::Greedy,
            ..BatteryConfig::default()
        };
        let model = DispatchModel::new(&demand, &battery, Euros(1e-3), Euros(0.01)).unwrap();
        let dispatch = model.evaluate(None, FEE).unwrap().unwrap();
        assert_eq!(dispatch.battery_capacity, KilowattHours(2000.0));
        assert_eq!(dispatch.battery_power, Kilowatts(1000.0));
        assert_eq!(dispatch.battery_cost, Euros(175.0 * 2000.0 + 100.0 * 1000.0));
        assert!(dispatch.peak <= Kilowatts(2000.0 + 1e-6));
    }

    #[test]
    fn test_joint_battery_shaves_spike() {
        let dispatch = joint(BatteryConfig::default())
            .evaluate(None, FEE)
            .unwrap()
            .unwrap();
        // shaving 2200 kW for 15 min is worth far more than the battery
        assert!(dispatch.battery_capacity > KilowattHours::ZERO);
        assert!(dispatch.peak < Kilowatts(3000.0));
        assert!(dispatch.operating_cost() < FEE * 3000.0);
    }

    #[test]
    fn test_joint_schedule_balances() {
        let demand = spike_day().powers();
        let battery = BatteryConfig {
            min_soc: Fraction(0.1),
            max_soc: Fraction(0.9),
            ..BatteryConfig::default()
        };
        let dispatch = joint(battery.clone())
            .evaluate(Some(Kilowatts(2000.0)), FEE)
            .unwrap()
            .unwrap();
        let e = dispatch.battery_capacity.value();
        for t in 0..demand.len() {
            let balance =
                dispatch.grid[t] + dispatch.discharge[t] - dispatch.charge[t] - demand[t];
            assert!(balance.value().abs() < 1e-3, "step {t}: {balance}");
            assert!(dispatch.grid[t].value() <= 2000.0 + 1e-3);
            assert!(dispatch.soc[t].value() >= 0.1 * e - 1e-3);
            assert!(dispatch.soc[t].value() <= 0.9 * e + 1e-3);
        }
    }

    #[test]
    fn test_passed_deadline_stops_the_lp() {
        let model = joint(BatteryConfig::default()).with_deadline(Some(Instant::now()));
        assert!(matches!(
            model.evaluate(None, FEE),
            Err(DispatchError::Solver(_))
        ));
    }

    #[test]
    fn test_deadline_does_not_apply_without_lp() {
        let battery = BatteryConfig {
            include_battery: false,
            ..BatteryConfig::default()
        };
        let model = DispatchModel::new(&spike_day(), &battery, Euros(1e-3), Euros(0.01))
            .unwrap()
            .with_deadline(Some(Instant::now()));
        assert!(model.evaluate(None, FEE).unwrap().is_some());
    }

    #[test]
    fn test_joint_infeasible_below_power_floor() {
        let battery = BatteryConfig {
            max_power: Kilowatts(500.0),
            ..BatteryConfig::default()
        };
        assert!(joint(battery)
            .evaluate(Some(Kilowatts(2000.0)), FEE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_joint_skips_battery_that_does_not_pay() {
        let battery = BatteryConfig {
            cost_per_kwh: Euros(1e6),
            ..BatteryConfig::default()
        };
        let dispatch = joint(battery).evaluate(None, FEE).unwrap().unwrap();
        assert_eq!(dispatch.battery_capacity, KilowattHours::ZERO);
        assert_eq!(dispatch.peak, Kilowatts(3000.0));
    }

    fn kw(values: &[f64]) -> Vec<Kilowatts> {
        values.iter().copied().map(Kilowatts).collect()
    }

    #[test]
    fn test_netting_keeps_import_and_raises_soc() {
        let mut grid = kw(&[108.0, 95.0]);
        let mut charge = kw(&[10.0, 0.0]);
        let mut discharge = kw(&[2.0, 5.0]);
        let limits = StorageLimits {
            efficiency: 0.9,
            step_hours: 0.25,
            initial: 0.0,
            ceiling: 100.0,
        };
        let soc = net_flows(&mut grid, &mut charge, &mut discharge, &limits);
        assert_eq!(grid, kw(&[108.0, 95.0]));
        assert_eq!(charge, kw(&[8.0, 0.0]));
        assert_eq!(discharge, kw(&[0.0, 5.0]));
        assert!((soc[0].value() - 1.8).abs() < 1e-12);
        assert!((soc[1].value() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_netting_curtails_charge_at_the_ceiling() {
        let load = [100.0, 100.0];
        let mut grid = kw(&[108.0, 100.0]);
        let mut charge = kw(&[10.0, 0.0]);
        let mut discharge = kw(&[2.0, 0.0]);
        let limits = StorageLimits {
            efficiency: 0.9,
            step_hours: 0.25,
            initial: 0.0,
            ceiling: 1.0,
        };
        let soc = net_flows(&mut grid, &mut charge, &mut discharge, &limits);
        assert!((soc[0].value() - 1.0).abs() < 1e-9);
        assert!((charge[0].value() - 1.0 / 0.225).abs() < 1e-9);
        assert!(grid[0] < Kilowatts(108.0));
        for t in 0..2 {
            let balance = grid[t] + discharge[t] - charge[t] - Kilowatts(load[t]);
            assert!(balance.value().abs() < 1e-9, "step {t}: {balance}");
        }
    }

    #[test]
    fn test_joint_schedule_never_charges_and_discharges_together() {
        let dispatch = joint(BatteryConfig::default())
            .evaluate(Some(Kilowatts(2500.0)), FEE)
            .unwrap()
            .unwrap();
        assert!(dispatch
            .charge
            .iter()
            .zip(&dispatch.discharge)
            .all(|(c, d)| *c == Kilowatts::ZERO || *d == Kilowatts::ZERO));
    }
}
