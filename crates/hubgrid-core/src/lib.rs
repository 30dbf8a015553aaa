//! # hubgrid-core: inputs of charging-hub grid planning
//!
//! Shared data structures for the planning pipeline:
//!
//! - [`units`]: typed quantities (kW, kWh, m, mm², V, A, EUR, fractions)
//! - [`profile`]: the validated hub demand profile
//! - [`connection`]: connection types and voltage classes
//! - [`charger`]: charger kinds and the installed fleet
//! - [`config`]: the per-run configuration object and its validation
//! - [`diagnostics`]: recoverable issues collected along a run
//! - [`error`]: the crate error type
//!
//! Everything here is plain data. The optimization itself lives in
//! `hubgrid-algo`.

pub mod charger;
pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod profile;
pub mod units;

pub use charger::{ChargerConfig, ChargerCounts, ChargerKind, ChargerRating};
pub use config::{
    BatteryConfig, CableCatalog, CableConfig, CableMaterial, CableOption, ConnectionTariff,
    DispatchMode, DistanceConfig, DistanceSource, GridConfig, GridSite, HubGridConfig,
    InternalCablingConfig, LvConductor, ManualDistances, SolverConfig, TransformerConfig,
    TransformerOption, VoltageLevel,
};
pub use connection::{ConnectionType, Coordinates, VoltageClass};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{HubGridError, HubGridResult};
pub use profile::{DemandPoint, DemandProfile, DemandSummary};
pub use units::*;
