//! Exact search over layouts
//!
//! Layouts are visited in order of their lower bound `fixed + g(∞)`. The
//! search stops as soon as the next bound exceeds the cheapest plan by more
//! than the tie tolerance, so every layout that could still win or tie is
//! evaluated.

use super::dispatch::{Dispatch, DispatchError, DispatchModel};
use super::problem::{enumerate_layouts, Layout, PlanningProblem};
use super::solution::{ConnectionSelector, CostBreakdown, Solution};
use crate::cable::{required_current, run_cost, size_cable, voltage_drop, SizedCable};
use crate::transformer::{arrangements, cheapest_covering};
use hubgrid_core::{ConnectionType, Diagnostics, Euros, Kilowatts, SolverConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use web_time::Instant;

/// Charge and discharge above this in the same step count as simultaneous.
const SIMULTANEOUS_TOL: f64 = 1e-3;
/// Peaks this close to a capacity are treated as fitting under it.
const PEAK_TOL: f64 = 1e-6;
/// Balance residual that is reported as a diagnostic.
const BALANCE_TOL: f64 = 1e-3;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    SolverError,
    /// Inputs rejected before any solve
    ConfigurationError,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::SolverError => "SolverError",
            SolveStatus::ConfigurationError => "ConfigurationError",
        })
    }
}

/// Why no connection can serve the demand.
#[derive(Debug, Clone, Serialize)]
pub struct InfeasibilityReport {
    pub reason: String,
    pub demand_peak: Kilowatts,
    /// Best import any available candidate reaches, plus battery power
    pub deliverable: Kilowatts,
    pub diagnostics: Diagnostics,
}

impl std::fmt::Display for InfeasibilityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (peak demand {}, deliverable {})",
            self.reason, self.demand_peak, self.deliverable
        )
    }
}

/// Planning errors
#[derive(Debug, Clone, Error)]
pub enum OptimizeError {
    /// Invalid inputs, detected before any solve
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No layout can serve the demand
    #[error("Problem infeasible: {0}")]
    Infeasible(InfeasibilityReport),

    /// Numerical failure or time limit, after the retry
    #[error("Solver failed after {attempts} attempt(s): {message}")]
    Solver { message: String, attempts: u32 },
}

impl OptimizeError {
    pub fn status(&self) -> SolveStatus {
        match self {
            OptimizeError::Infeasible(_) => SolveStatus::Infeasible,
            OptimizeError::Solver { .. } => SolveStatus::SolverError,
            OptimizeError::Configuration(_) => SolveStatus::ConfigurationError,
        }
    }
}

/// Settings of one search attempt.
#[derive(Debug, Clone)]
struct SearchSettings {
    time_limit: Duration,
    mip_gap: f64,
    tie_tolerance: Euros,
    throughput_penalty: Euros,
    /// Skip layouts whose LP fails instead of aborting
    tolerate_failures: bool,
}

impl SearchSettings {
    fn from_config(config: &SolverConfig) -> Self {
        Self {
            time_limit: Duration::from_secs_f64(config.time_limit_seconds.max(0.0)),
            mip_gap: config.mip_gap,
            tie_tolerance: config.tie_tolerance,
            throughput_penalty: config.throughput_penalty,
            tolerate_failures: false,
        }
    }

    fn relaxed(&self, factor: f64) -> Self {
        Self {
            time_limit: self.time_limit * 2,
            mip_gap: self.mip_gap * factor,
            tie_tolerance: self.tie_tolerance,
            throughput_penalty: self.throughput_penalty,
            tolerate_failures: true,
        }
    }
}

/// Solve the planning problem
///
/// A numerical failure or an exhausted time limit triggers one retry with
/// relaxed settings. Infeasibility is final.
///
/// # Example
///
/// ```no_run
/// use hubgrid_algo::optimizer::{optimize, PlanningProblemBuilder};
/// use hubgrid_core::{DemandProfile, Euros, HubGridConfig, Kilowatts};
///
/// let demand = DemandProfile::uniform(15, &vec![Kilowatts(500.0); 672])?;
/// let problem = PlanningProblemBuilder::new(demand, HubGridConfig::default())
///     .charger_cost(Euros(1_550_000.0))
///     .build()?;
/// let solution = optimize(&problem)?;
/// println!("{}", solution.summary());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn optimize(problem: &PlanningProblem) -> Result<Solution, OptimizeError> {
    let start = Instant::now();
    let config = &problem.config.solver;
    let settings = SearchSettings::from_config(config);

    let result = match search(problem, &settings, start) {
        Err(OptimizeError::Solver { message, .. }) => {
            warn!(%message, "solver attempt failed, retrying with relaxed settings");
            let relaxed = settings.relaxed(config.retry_relaxation);
            search(problem, &relaxed, Instant::now())
                .map(|mut solution| {
                    solution.attempts = 2;
                    solution
                })
                .map_err(|e| match e {
                    OptimizeError::Solver { message, .. } => OptimizeError::Solver {
                        message,
                        attempts: 2,
                    },
                    other => other,
                })
        }
        other => other,
    };

    match &result {
        Ok(solution) => info!(
            connection = %solution.selected_connection,
            total_cost = solution.total_cost.value(),
            gap = solution.mip_gap,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "planning finished: Optimal"
        ),
        Err(e) => warn!(status = %e.status(), "planning finished: {e}"),
    }
    result.map(|mut solution| {
        solution.solve_time = start.elapsed();
        solution
    })
}

/// A feasible evaluated layout.
#[derive(Debug, Clone, Copy)]
struct Incumbent {
    layout: usize,
    result: usize,
    value: Euros,
}

/// Evaluated capacities of one fee, used to bound and reuse LP results.
#[derive(Debug, Default)]
struct FeeCurve {
    /// `(capacity, result index)`; `None` marks an infeasible capacity
    points: Vec<(f64, Option<usize>)>,
}

enum Lookup {
    Known(Option<usize>),
    Bound(Euros),
}

impl FeeCurve {
    fn lookup(&self, capacity: f64, results: &[Dispatch]) -> Lookup {
        let mut lower = Euros::ZERO;
        for &(cap, outcome) in &self.points {
            match outcome {
                None if capacity <= cap => return Lookup::Known(None),
                Some(index) if cap >= capacity => {
                    let result = &results[index];
                    // optimal for a looser cap and feasible for this one
                    if result.peak.value() <= capacity + PEAK_TOL {
                        return Lookup::Known(Some(index));
                    }
                    lower = lower.max(result.operating_cost());
                }
                _ => {}
            }
        }
        Lookup::Bound(lower)
    }
}

fn fee_key(fee: Euros) -> u64 {
    fee.value().to_bits()
}

/// Pick the winner among evaluated plans.
///
/// Every plan within `tol` of the cheapest value ties; ties go to the lowest
/// voltage class, then the lower fixed cost, then the earlier layout.
fn select(plans: &[Incumbent], layouts: &[Layout], tol: Euros) -> Option<Incumbent> {
    let cheapest = plans.iter().map(|p| p.value).reduce(Euros::min)?;
    plans
        .iter()
        .filter(|p| p.value <= cheapest + tol)
        .min_by(|a, b| {
            let (la, lb) = (&layouts[a.layout], &layouts[b.layout]);
            la.candidate
                .kind
                .cmp(&lb.candidate.kind)
                .then(la.fixed_cost.value().total_cmp(&lb.fixed_cost.value()))
                .then(la.ordinal.cmp(&lb.ordinal))
        })
        .copied()
}

fn search(
    problem: &PlanningProblem,
    settings: &SearchSettings,
    start: Instant,
) -> Result<Solution, OptimizeError> {
    let peak = problem.demand_peak();
    let enumeration = enumerate_layouts(problem);
    let mut diagnostics = problem.candidates.diagnostics.clone();
    diagnostics.merge(enumeration.diagnostics.clone());

    info!(
        steps = problem.demand.len(),
        peak_kw = peak.value(),
        candidates = problem.candidates.available().count(),
        layouts = enumeration.layouts.len(),
        enumerated = enumeration.total_enumerated,
        "starting layout search"
    );

    let infeasible = |reason: &str, diagnostics: Diagnostics| {
        OptimizeError::Infeasible(InfeasibilityReport {
            reason: reason.to_string(),
            demand_peak: peak,
            deliverable: enumeration.deliverable,
            diagnostics,
        })
    };

    if peak > enumeration.deliverable {
        return Err(infeasible(
            "peak demand exceeds every connection plus battery power",
            diagnostics,
        ));
    }
    let layouts = &enumeration.layouts;
    if layouts.is_empty() {
        return Err(infeasible("no layout offers enough capacity", diagnostics));
    }

    let model = DispatchModel::new(
        &problem.demand,
        &problem.config.battery,
        settings.throughput_penalty,
        settings.tie_tolerance,
    )
    .map_err(|e| OptimizeError::Configuration(e.to_string()))?
    .with_deadline(start.checked_add(settings.time_limit));

    let solver_error = |e: DispatchError| OptimizeError::Solver {
        message: e.to_string(),
        attempts: 1,
    };

    // Unconstrained schedule per fee: g(∞), the base of every bound.
    let mut results: Vec<Dispatch> = Vec::new();
    let mut curves: HashMap<u64, FeeCurve> = HashMap::new();
    let mut unconstrained: HashMap<u64, Euros> = HashMap::new();
    let mut lp_solves = 0;
    for layout in layouts {
        let key = fee_key(layout.fee());
        if unconstrained.contains_key(&key) {
            continue;
        }
        let dispatch = model
            .evaluate(None, layout.fee())
            .map_err(solver_error)?
            .ok_or_else(|| OptimizeError::Solver {
                message: "unconstrained dispatch reported infeasible".into(),
                attempts: 1,
            })?;
        if model.solves_lp() {
            lp_solves += 1;
        }
        unconstrained.insert(key, dispatch.operating_cost());
        curves
            .entry(key)
            .or_default()
            .points
            .push((f64::INFINITY, Some(results.len())));
        results.push(dispatch);
    }

    let bound = |layout: &Layout| layout.fixed_cost + unconstrained[&fee_key(layout.fee())];
    let mut order: Vec<usize> = (0..layouts.len()).collect();
    order.sort_by(|&a, &b| {
        let (la, lb) = (&layouts[a], &layouts[b]);
        bound(la)
            .value()
            .total_cmp(&bound(lb).value())
            .then(la.candidate.kind.cmp(&lb.candidate.kind))
            .then(la.fixed_cost.value().total_cmp(&lb.fixed_cost.value()))
            .then(la.ordinal.cmp(&lb.ordinal))
    });

    let mut plans: Vec<Incumbent> = Vec::new();
    let mut best_value: Option<Euros> = None;
    let mut open_bounds: Vec<Euros> = Vec::new();
    let mut evaluated = 0;
    let mut pruned = 0;
    let mut timed_out = false;

    for (position, &index) in order.iter().enumerate() {
        let layout = &layouts[index];
        let lower = bound(layout);

        if let Some(best) = best_value {
            if lower > best + settings.tie_tolerance {
                pruned += order.len() - position;
                break;
            }
        }
        if start.elapsed() >= settings.time_limit {
            timed_out = true;
            open_bounds.extend(order[position..].iter().map(|&i| bound(&layouts[i])));
            break;
        }

        let key = fee_key(layout.fee());
        let curve = curves.entry(key).or_default();
        let outcome = match curve.lookup(layout.capacity.value(), &results) {
            Lookup::Known(outcome) => outcome,
            Lookup::Bound(tighter) => {
                if let Some(best) = best_value {
                    if layout.fixed_cost + tighter > best + settings.tie_tolerance {
                        pruned += 1;
                        continue;
                    }
                }
                if model.solves_lp() {
                    lp_solves += 1;
                }
                match model.evaluate(Some(layout.capacity), layout.fee()) {
                    Ok(Some(dispatch)) => {
                        curve.points.push((layout.capacity.value(), Some(results.len())));
                        results.push(dispatch);
                        Some(results.len() - 1)
                    }
                    Ok(None) => {
                        curve.points.push((layout.capacity.value(), None));
                        None
                    }
                    Err(e) if settings.tolerate_failures => {
                        warn!(
                            connection = %layout.candidate.kind,
                            capacity_kw = layout.capacity.value(),
                            error = %e,
                            "skipping layout after solver failure"
                        );
                        diagnostics.add_error_with_entity(
                            "solver",
                            &format!("layout skipped: {e}"),
                            layout.candidate.kind.label(),
                        );
                        open_bounds.push(lower);
                        continue;
                    }
                    Err(e) => return Err(solver_error(e)),
                }
            }
        };
        evaluated += 1;

        let Some(result) = outcome else {
            continue;
        };
        let value = layout.fixed_cost + results[result].operating_cost();
        if best_value.is_none_or(|best| value < best) {
            debug!(
                connection = %layout.candidate.kind,
                capacity_kw = layout.capacity.value(),
                value = value.value(),
                "new cheapest plan"
            );
            best_value = Some(value);
        }
        plans.push(Incumbent {
            layout: index,
            result,
            value,
        });
    }

    debug!(evaluated, pruned, lp_solves, timed_out, "layout search done");

    let Some(best) = select(&plans, layouts, settings.tie_tolerance) else {
        if timed_out || !open_bounds.is_empty() {
            return Err(OptimizeError::Solver {
                message: if timed_out {
                    "time limit reached before any feasible layout".into()
                } else {
                    "every candidate layout failed to solve".into()
                },
                attempts: 1,
            });
        }
        return Err(infeasible(
            "no layout serves the demand within its capacity",
            diagnostics,
        ));
    };

    let gap = open_bounds
        .iter()
        .map(|lb| ((best.value - *lb).value() / best.value.value().max(1.0)).max(0.0))
        .fold(0.0, f64::max);
    if gap > settings.mip_gap {
        return Err(OptimizeError::Solver {
            message: format!(
                "{} with gap {:.4}% above target {:.4}%",
                if timed_out { "time limit reached" } else { "layouts unsolved" },
                gap * 100.0,
                settings.mip_gap * 100.0
            ),
            attempts: 1,
        });
    }

    let mut solution = finish(
        problem,
        &layouts[best.layout],
        results.swap_remove(best.result),
        diagnostics,
    );
    solution.mip_gap = gap;
    solution.layouts_enumerated = enumeration.total_enumerated;
    solution.layouts_evaluated = evaluated;
    solution.lp_solves = lp_solves;
    Ok(solution)
}

/// Tighten the winning layout to the realized peak and assemble the solution.
fn finish(
    problem: &PlanningProblem,
    layout: &Layout,
    dispatch: Dispatch,
    mut diagnostics: Diagnostics,
) -> Solution {
    let config = &problem.config;
    let candidate = &layout.candidate;
    let load = dispatch.peak.min(layout.capacity);

    let expanded = layout.expanded && load > candidate.capacity_limit;
    let expansion_used = if expanded {
        load - candidate.capacity_limit
    } else {
        Kilowatts::ZERO
    };

    let (selected_cable, cable_cost) = match (layout.cable, candidate.distance) {
        (Some(choice), Some(distance)) => {
            let level = config.grid.voltage_level(candidate.voltage_class());
            let catalog = config.cables.catalog(choice.material);
            match size_cable(load, distance, level, catalog) {
                Ok(sized) if run_cost(&sized.option, distance, &config.cables) <= choice.tier.cost => {
                    let cost = run_cost(&sized.option, distance, &config.cables);
                    (Some(sized), cost)
                }
                _ => {
                    let current = required_current(load, level);
                    let sized = SizedCable {
                        option: choice.tier.option,
                        distance,
                        required_current: current,
                        voltage_drop: voltage_drop(
                            current,
                            distance,
                            choice.tier.option.cross_section,
                            catalog.conductivity,
                            level,
                        ),
                    };
                    (Some(sized), choice.tier.cost)
                }
            }
        }
        _ => (None, Euros::ZERO),
    };

    let transformer = cheapest_covering(&arrangements(&config.transformers), load)
        .filter(|a| a.cost <= layout.transformer.cost)
        .unwrap_or_else(|| layout.transformer.clone());

    let demand = problem.demand.powers();
    let simultaneous_steps = dispatch
        .charge
        .iter()
        .zip(&dispatch.discharge)
        .filter(|(c, d)| c.value() > SIMULTANEOUS_TOL && d.value() > SIMULTANEOUS_TOL)
        .count();
    if simultaneous_steps > 0 {
        warn!(simultaneous_steps, "battery charges and discharges in the same step");
        diagnostics.add_warning(
            "dispatch",
            &format!("{simultaneous_steps} step(s) with simultaneous charge and discharge"),
        );
    } else {
        debug!("no simultaneous charge and discharge");
    }

    let residual = demand
        .iter()
        .enumerate()
        .map(|(t, load)| {
            (dispatch.grid[t] + dispatch.discharge[t] - dispatch.charge[t] - *load)
                .value()
                .abs()
        })
        .fold(0.0, f64::max);
    if residual > BALANCE_TOL {
        diagnostics.add_warning(
            "dispatch",
            &format!("power balance residual of {residual:.6} kW"),
        );
    }

    let battery = &config.battery;
    let soc_low = battery.min_soc * dispatch.battery_capacity;
    let soc_high = battery.max_soc * dispatch.battery_capacity;
    let soc_excess = dispatch
        .soc
        .iter()
        .map(|s| (soc_low - *s).max(*s - soc_high).value())
        .fold(0.0, f64::max);
    if soc_excess > BALANCE_TOL {
        diagnostics.add_warning(
            "dispatch",
            &format!("state of charge leaves its window by {soc_excess:.6} kWh"),
        );
    }

    let connection_cost = if expanded {
        candidate.fixed_cost + candidate.expansion_fixed_cost
    } else {
        candidate.fixed_cost
    };
    let cost_breakdown = CostBreakdown {
        connection: connection_cost,
        capacity: candidate.capacity_fee_per_kw * dispatch.peak.value(),
        battery: dispatch.battery_cost,
        transformer: transformer.cost,
        cable: cable_cost,
        charger: problem.charger_cost,
    }
    .rounded();

    let connection_selectors = ConnectionType::ALL
        .iter()
        .map(|&kind| ConnectionSelector {
            kind,
            available: problem
                .candidates
                .get(kind)
                .is_some_and(|c| c.is_available()),
            selected: kind == candidate.kind,
        })
        .collect();

    Solution {
        status: SolveStatus::Optimal,
        selected_connection: candidate.kind,
        connection_selectors,
        expanded,
        expansion_used,
        selected_cable,
        selected_transformer: transformer,
        battery_capacity: dispatch.battery_capacity,
        battery_power: dispatch.battery_power,
        step_minutes: problem.demand.step_minutes(),
        peak_demand: problem.demand_peak(),
        peak_grid: dispatch.peak,
        demand,
        grid: dispatch.grid,
        battery_charge: dispatch.charge,
        battery_discharge: dispatch.discharge,
        soc: dispatch.soc,
        total_cost: cost_breakdown.total(),
        cost_breakdown,
        mip_gap: 0.0,
        simultaneous_steps,
        layouts_enumerated: 0,
        layouts_evaluated: 0,
        lp_solves: 0,
        attempts: 1,
        solve_time: Duration::ZERO,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let report = InfeasibilityReport {
            reason: "too much".into(),
            demand_peak: Kilowatts(50_000.0),
            deliverable: Kilowatts(45_000.0),
            diagnostics: Diagnostics::new(),
        };
        assert_eq!(
            OptimizeError::Infeasible(report.clone()).status(),
            SolveStatus::Infeasible
        );
        assert_eq!(
            OptimizeError::Solver {
                message: "timeout".into(),
                attempts: 2
            }
            .status(),
            SolveStatus::SolverError
        );
        let config = OptimizeError::Configuration("min_soc above max_soc".into());
        assert_eq!(config.status(), SolveStatus::ConfigurationError);
        assert_eq!(config.status().to_string(), "ConfigurationError");
        let text = OptimizeError::Infeasible(report).to_string();
        assert!(text.contains("50000.00 kW"));
    }

    #[test]
    fn test_relaxed_settings() {
        let settings = SearchSettings::from_config(&SolverConfig::default());
        let relaxed = settings.relaxed(100.0);
        assert!((relaxed.mip_gap - 1e-2).abs() < 1e-12);
        assert_eq!(relaxed.time_limit, settings.time_limit * 2);
        assert!(relaxed.tolerate_failures);
        assert!(!settings.tolerate_failures);
    }

    #[test]
    fn test_fee_curve_reuses_fitting_schedule() {
        let dispatch = Dispatch {
            grid: vec![Kilowatts(900.0)],
            charge: vec![Kilowatts::ZERO],
            discharge: vec![Kilowatts::ZERO],
            soc: vec![hubgrid_core::KilowattHours::ZERO],
            battery_capacity: hubgrid_core::KilowattHours::ZERO,
            battery_power: Kilowatts::ZERO,
            peak: Kilowatts(900.0),
            capacity_cost: Euros(900.0),
            battery_cost: Euros::ZERO,
        };
        let results = vec![dispatch];
        let curve = FeeCurve {
            points: vec![(f64::INFINITY, Some(0)), (500.0, None)],
        };
        assert!(matches!(curve.lookup(1000.0, &results), Lookup::Known(Some(0))));
        assert!(matches!(curve.lookup(400.0, &results), Lookup::Known(None)));
        match curve.lookup(800.0, &results) {
            Lookup::Bound(lower) => assert_eq!(lower, Euros(900.0)),
            Lookup::Known(_) => panic!("800 kW is below the stored peak"),
        }
    }
}
