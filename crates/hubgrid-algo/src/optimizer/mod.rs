//! Cost-minimizing selection of the hub's grid connection
//!
//! ## Problem Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HUB CONNECTION PLANNING                                                 │
//! │  ───────────────────────                                                 │
//! │                                                                          │
//! │  Given:                                                                  │
//! │    • Demand profile of the hub (kW per step)                             │
//! │    • One connection candidate per type, with tariffs and distances       │
//! │    • Cable, transformer and battery catalogs                            │
//! │                                                                          │
//! │  Decide:                                                                 │
//! │    • Connection type (exactly one) and whether to expand it              │
//! │    • Cable material and cross-section                                    │
//! │    • Transformer arrangement                                             │
//! │    • Battery energy, power and schedule (continuous)                     │
//! │                                                                          │
//! │  Minimize:                                                               │
//! │    fixed + expansion + fee · peak + cable + transformer                  │
//! │          + battery + chargers                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Formulation
//!
//! The discrete choices form a finite set of layouts. Each layout fixes a
//! capacity `C` (the smallest of connection, cable and transformer limits)
//! and a fixed cost. What remains is a linear program in the schedule:
//!
//! ```text
//! minimize    fee · p + c_E · E + c_P · P_b + ε · Σ (c_t + d_t) Δt
//!
//! subject to:
//!   g_t + d_t − c_t = demand_t                       Power balance
//!   0 ≤ g_t ≤ min(p, C)                              Peak and capacity
//!   0 ≤ c_t, d_t ≤ P_b                               Power rating
//!   s_t = s_{t−1} + η c_t Δt − d_t Δt                SOC, s_{−1} = soc₀ · E
//!   min_soc · E ≤ s_t ≤ max_soc · E                  SOC window
//!   s_{T−1} ≥ soc₀ · E                               Cyclic horizon
//! ```
//!
//! The LP optimum `g(C)` is non-increasing in `C`, so `fixed + g(∞)` bounds
//! every layout from below. Layouts are explored in order of that bound and
//! a layout is only solved while its bound can still beat the incumbent,
//! which makes the search exact. Solved LPs double as bounds for other
//! layouts of the same fee: a schedule whose peak fits under `C` is optimal
//! for `C` as well.
//!
//! The `ε` term keeps charge and discharge from overlapping and unused
//! battery capacity at zero. It is not part of any reported cost.

mod dispatch;
mod problem;
mod solution;
mod solver;

pub use dispatch::Dispatch;
pub use problem::{PlanningProblem, PlanningProblemBuilder};
pub use solution::{ConnectionSelector, CostBreakdown, Solution};
pub use solver::{optimize, InfeasibilityReport, OptimizeError, SolveStatus};
