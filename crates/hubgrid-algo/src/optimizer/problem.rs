//! Planning problem definition and layout enumeration

use super::solver::OptimizeError;
use crate::cable::{cable_tiers, size_cable, size_internal_cabling, CableTier, InternalCabling};
use crate::candidates::{candidates_from_config, CandidateSet, ConnectionCandidate};
use crate::transformer::{arrangements, TransformerArrangement};
use hubgrid_core::{
    CableMaterial, DemandProfile, Diagnostics, DispatchMode, Euros, HubGridConfig, Kilowatts,
    Meters,
};

/// Everything one optimizer run needs.
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    pub demand: DemandProfile,
    pub config: HubGridConfig,
    pub candidates: CandidateSet,
    /// Charger units plus internal cabling, carried into the total unchanged
    pub charger_cost: Euros,
    /// Feeder layout, when the charger cost was derived from the fleet
    pub internal_cabling: Option<InternalCabling>,
}

impl PlanningProblem {
    /// Peak of the demand profile
    pub fn demand_peak(&self) -> Kilowatts {
        self.demand.peak()
    }

    /// Lowest grid capacity any layout must offer: the battery can cover
    /// at most its power rating of the peak.
    pub fn capacity_floor(&self) -> Kilowatts {
        (self.demand_peak() - self.config.battery.available_power()).max(Kilowatts::ZERO)
    }
}

/// Builder for [`PlanningProblem`]
pub struct PlanningProblemBuilder {
    demand: DemandProfile,
    config: HubGridConfig,
    candidates: Option<CandidateSet>,
    charger_cost: Option<Euros>,
}

impl PlanningProblemBuilder {
    pub fn new(demand: DemandProfile, config: HubGridConfig) -> Self {
        Self {
            demand,
            config,
            candidates: None,
            charger_cost: None,
        }
    }

    /// Use prepared candidates instead of generating them from the config
    pub fn candidates(mut self, candidates: CandidateSet) -> Self {
        self.candidates = Some(candidates);
        self
    }

    /// Fixed charger cost; derived from the fleet when not set
    pub fn charger_cost(mut self, cost: Euros) -> Self {
        self.charger_cost = Some(cost);
        self
    }

    pub fn include_battery(mut self, include: bool) -> Self {
        self.config.battery.include_battery = include;
        self
    }

    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.config.battery.dispatch = mode;
        self
    }

    /// Validate the inputs and assemble the problem.
    pub fn build(self) -> Result<PlanningProblem, OptimizeError> {
        self.config
            .validate()
            .map_err(|e| OptimizeError::Configuration(e.to_string()))?;

        let candidates = match self.candidates {
            Some(candidates) => candidates,
            None => candidates_from_config(&self.config)
                .map_err(|e| OptimizeError::Configuration(e.to_string()))?,
        };

        let (charger_cost, internal_cabling) = match self.charger_cost {
            Some(cost) => (cost, None),
            None => {
                let cabling =
                    size_internal_cabling(&self.config.chargers, &self.config.internal_cabling)
                        .map_err(|e| OptimizeError::Configuration(e.to_string()))?;
                (
                    self.config.chargers.units_cost() + cabling.total_cost,
                    Some(cabling),
                )
            }
        };
        if !charger_cost.is_finite() || charger_cost < Euros::ZERO {
            return Err(OptimizeError::Configuration(format!(
                "charger cost must be finite and non-negative, got {}",
                charger_cost.value()
            )));
        }

        Ok(PlanningProblem {
            demand: self.demand,
            config: self.config,
            candidates,
            charger_cost,
            internal_cabling,
        })
    }
}

// =============================================================================
// Layouts
// =============================================================================

/// Cable choice of a layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CableChoice {
    pub material: CableMaterial,
    pub tier: CableTier,
}

/// One point of the discrete choice set.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layout {
    pub candidate: ConnectionCandidate,
    pub expanded: bool,
    pub cable: Option<CableChoice>,
    pub transformer: TransformerArrangement,
    /// Largest grid import the layout allows
    pub capacity: Kilowatts,
    /// Everything except the capacity fee and the battery
    pub fixed_cost: Euros,
    /// Enumeration position, the final tie-breaker
    pub ordinal: usize,
}

impl Layout {
    pub fn fee(&self) -> Euros {
        self.candidate.capacity_fee_per_kw
    }
}

/// Enumerated layouts plus what was learned on the way.
#[derive(Debug, Clone)]
pub(crate) struct LayoutSet {
    pub layouts: Vec<Layout>,
    /// Most any available candidate could import, ignoring cost
    pub deliverable: Kilowatts,
    pub total_enumerated: usize,
    pub diagnostics: Diagnostics,
}

/// Keep the steps that clear `floor`, up to and including the first one
/// that covers `peak`. Larger steps only cost more.
fn useful_steps<T: Clone>(steps: &[T], limit: impl Fn(&T) -> Kilowatts, floor: Kilowatts, peak: Kilowatts) -> Vec<T> {
    let mut kept = Vec::new();
    for step in steps.iter().filter(|s| limit(s) >= floor) {
        kept.push(step.clone());
        if limit(step) >= peak {
            break;
        }
    }
    kept
}

/// Enumerate the non-dominated layouts of every available candidate.
pub(crate) fn enumerate_layouts(problem: &PlanningProblem) -> LayoutSet {
    let config = &problem.config;
    let peak = problem.demand_peak();
    let floor = problem.capacity_floor();
    let mut diagnostics = Diagnostics::new();

    let transformer_front = arrangements(&config.transformers);
    let transformers = useful_steps(&transformer_front, |a| a.capacity, floor, peak);
    let transformer_max = transformer_front
        .last()
        .map_or(Kilowatts::ZERO, |a| a.capacity);

    let mut layouts = Vec::new();
    let mut deliverable = Kilowatts::ZERO;
    let mut total_enumerated = 0;

    for candidate in problem.candidates.available() {
        let kind = candidate.kind;
        let distance = candidate.distance.unwrap_or(Meters::ZERO);
        let level = config.grid.voltage_level(candidate.voltage_class());

        let mut cables: Vec<Option<CableChoice>> = Vec::new();
        let mut cable_max = Kilowatts::ZERO;
        if kind.needs_cable() {
            for material in CableMaterial::ALL {
                let catalog = config.cables.catalog(material);
                let tiers = cable_tiers(catalog, distance, level, &config.cables);
                if let Some(strongest) = tiers.last() {
                    cable_max = cable_max.max(strongest.limit);
                }
                if let Err(err) = size_cable(floor, distance, level, catalog) {
                    diagnostics.add_warning_with_entity(
                        "sizing",
                        &err.to_string(),
                        &format!("{}/{}", kind.label(), material.label()),
                    );
                    continue;
                }
                cables.extend(
                    useful_steps(&tiers, |t| t.limit, floor, peak)
                        .into_iter()
                        .map(|tier| Some(CableChoice { material, tier })),
                );
            }
        } else {
            cables.push(None);
            cable_max = Kilowatts(f64::INFINITY);
        }

        deliverable = deliverable.max(candidate.max_capacity().min(cable_max).min(transformer_max));
        if cables.is_empty() {
            continue;
        }

        let expansions: &[bool] = if candidate.can_expand() && candidate.capacity_limit < peak {
            &[false, true]
        } else {
            &[false]
        };

        let mut own: Vec<Layout> = Vec::new();
        for &expanded in expansions {
            let (connection_cap, connection_cost) = if expanded {
                (
                    candidate.max_capacity(),
                    candidate.fixed_cost + candidate.expansion_fixed_cost,
                )
            } else {
                (candidate.capacity_limit, candidate.fixed_cost)
            };
            for cable in &cables {
                let (cable_cap, cable_cost) = match cable {
                    Some(choice) => (choice.tier.limit, choice.tier.cost),
                    None => (Kilowatts(f64::INFINITY), Euros::ZERO),
                };
                for transformer in &transformers {
                    total_enumerated += 1;
                    let capacity = connection_cap.min(cable_cap).min(transformer.capacity);
                    if capacity < floor {
                        continue;
                    }
                    own.push(Layout {
                        candidate: *candidate,
                        expanded,
                        cable: *cable,
                        transformer: transformer.clone(),
                        capacity,
                        fixed_cost: connection_cost
                            + cable_cost
                            + transformer.cost
                            + problem.charger_cost,
                        ordinal: 0,
                    });
                }
            }
        }
        layouts.extend(pareto_front(own));
    }

    for (ordinal, layout) in layouts.iter_mut().enumerate() {
        layout.ordinal = ordinal;
    }

    LayoutSet {
        layouts,
        deliverable: deliverable + config.battery.available_power(),
        total_enumerated,
        diagnostics,
    }
}

/// Drop layouts that cost at least as much as another one offering at
/// least as much capacity.
fn pareto_front(mut layouts: Vec<Layout>) -> Vec<Layout> {
    layouts.sort_by(|a, b| {
        a.fixed_cost
            .value()
            .total_cmp(&b.fixed_cost.value())
            .then(b.capacity.value().total_cmp(&a.capacity.value()))
    });
    let mut front: Vec<Layout> = Vec::with_capacity(layouts.len());
    for layout in layouts {
        if front.last().map_or(true, |best| layout.capacity > best.capacity) {
            front.push(layout);
        }
    }
    front
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubgrid_core::ConnectionType;

    fn flat(power: f64, steps: usize) -> DemandProfile {
        DemandProfile::uniform(15, &vec![Kilowatts(power); steps]).unwrap()
    }

    #[test]
    fn test_builder_derives_charger_cost_from_fleet() {
        let problem = PlanningProblemBuilder::new(flat(500.0, 8), HubGridConfig::default())
            .build()
            .unwrap();
        let cabling = problem.internal_cabling.as_ref().unwrap();
        assert_eq!(
            problem.charger_cost,
            Euros(1_550_000.0) + cabling.total_cost
        );
        assert!(cabling.total_cost > Euros::ZERO);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = HubGridConfig::default();
        config.transformers.catalog.clear();
        let err = PlanningProblemBuilder::new(flat(500.0, 8), config)
            .build()
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Configuration(_)));
    }

    #[test]
    fn test_builder_rejects_negative_charger_cost() {
        let err = PlanningProblemBuilder::new(flat(500.0, 8), HubGridConfig::default())
            .charger_cost(Euros(-1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Configuration(_)));
    }

    #[test]
    fn test_layouts_cover_only_available_candidates() {
        let problem = PlanningProblemBuilder::new(flat(500.0, 8), HubGridConfig::default())
            .charger_cost(Euros::ZERO)
            .build()
            .unwrap();
        let set = enumerate_layouts(&problem);
        assert!(!set.layouts.is_empty());
        assert!(set.layouts.iter().all(|l| matches!(
            l.candidate.kind,
            ConnectionType::ExistingMv | ConnectionType::Distribution
        )));
        assert!(set
            .layouts
            .iter()
            .filter(|l| l.candidate.kind == ConnectionType::ExistingMv)
            .all(|l| l.cable.is_none()));
        assert!(set
            .layouts
            .iter()
            .filter(|l| l.candidate.kind == ConnectionType::Distribution)
            .all(|l| l.cable.is_some()));
    }

    #[test]
    fn test_layouts_are_pareto_per_candidate() {
        let problem = PlanningProblemBuilder::new(flat(6_000.0, 8), HubGridConfig::default())
            .charger_cost(Euros::ZERO)
            .build()
            .unwrap();
        let set = enumerate_layouts(&problem);
        for kind in [ConnectionType::ExistingMv, ConnectionType::Distribution] {
            let own: Vec<&Layout> = set
                .layouts
                .iter()
                .filter(|l| l.candidate.kind == kind)
                .collect();
            for pair in own.windows(2) {
                assert!(pair[1].fixed_cost > pair[0].fixed_cost);
                assert!(pair[1].capacity > pair[0].capacity);
            }
        }
    }

    #[test]
    fn test_expansion_only_when_base_capacity_short() {
        let problem = PlanningProblemBuilder::new(flat(500.0, 8), HubGridConfig::default())
            .charger_cost(Euros::ZERO)
            .build()
            .unwrap();
        assert!(enumerate_layouts(&problem).layouts.iter().all(|l| !l.expanded));

        let problem = PlanningProblemBuilder::new(flat(30_000.0, 8), HubGridConfig::default())
            .charger_cost(Euros::ZERO)
            .include_battery(false)
            .build()
            .unwrap();
        let set = enumerate_layouts(&problem);
        assert!(set
            .layouts
            .iter()
            .any(|l| l.expanded && l.capacity >= Kilowatts(30_000.0)));
    }

    #[test]
    fn test_layout_fixed_cost_adds_components() {
        let problem = PlanningProblemBuilder::new(flat(500.0, 8), HubGridConfig::default())
            .charger_cost(Euros(1000.0))
            .build()
            .unwrap();
        for layout in enumerate_layouts(&problem).layouts {
            let cable = layout.cable.map_or(Euros::ZERO, |c| c.tier.cost);
            let expected =
                layout.candidate.fixed_cost + cable + layout.transformer.cost + Euros(1000.0);
            assert!((layout.fixed_cost - expected).value().abs() < 1e-9);
        }
    }

    #[test]
    fn test_unsizable_material_recorded() {
        // 60 MW at 20 kV exceeds every copper cross-section
        let mut config = HubGridConfig::default();
        config.grid.distribution.capacity_limit = Kilowatts(80_000.0);
        let problem = PlanningProblemBuilder::new(flat(60_000.0, 8), config)
            .charger_cost(Euros::ZERO)
            .include_battery(false)
            .build()
            .unwrap();
        let set = enumerate_layouts(&problem);
        assert!(set
            .diagnostics
            .issues_by_category("sizing")
            .any(|i| i.entity.as_deref() == Some("Distribution/copper")));
    }
}
