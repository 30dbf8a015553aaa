//! # hubgrid-algo: grid-connection planning for charging hubs
//!
//! - [`candidates`]: one connection candidate per type, with route lengths
//! - [`cable`]: connection cable and internal feeder sizing
//! - [`transformer`]: parallel transformer arrangements
//! - [`battery`]: greedy peak shaving for a fixed battery
//! - [`optimizer`]: the cost-minimizing selection of connection, cable,
//!   transformer and battery
//!
//! ```no_run
//! use hubgrid_algo::optimizer::{optimize, PlanningProblemBuilder};
//! use hubgrid_core::{DemandProfile, HubGridConfig, Kilowatts};
//!
//! let demand = DemandProfile::uniform(15, &vec![Kilowatts(800.0); 672])?;
//! let problem = PlanningProblemBuilder::new(demand, HubGridConfig::default()).build()?;
//! let solution = optimize(&problem)?;
//! println!("{}", solution.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod battery;
pub mod cable;
pub mod candidates;
pub mod optimizer;
pub mod transformer;

pub use battery::{evaluate_battery, BatteryDispatch, BatteryError, BatterySpec};
pub use cable::{
    cable_tiers, carrying_limit, required_current, run_cost, size_cable, size_internal_cabling,
    voltage_drop, CableTier, FeederCable, InternalCabling, SizedCable, SizingError,
};
pub use candidates::{
    candidates_from_config, generate_candidates, haversine, CandidateError, CandidateSet,
    ConnectionCandidate, DistanceProvider, NearestSite,
};
pub use optimizer::{
    optimize, CostBreakdown, InfeasibilityReport, OptimizeError, PlanningProblem,
    PlanningProblemBuilder, SolveStatus, Solution,
};
pub use transformer::{arrangements, cheapest_covering, TransformerArrangement, TransformerUnits};
