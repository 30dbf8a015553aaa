//! Grid connection types and their voltage classes.

use serde::{Deserialize, Serialize};

/// The ways a charging hub can be tied into the grid.
///
/// Variants are declared in tie-break order: when two options cost the same,
/// the one declared first wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Tie-in to an existing medium-voltage line next to the site
    ExistingMv,
    /// New feeder from a distribution substation
    Distribution,
    /// New feeder from a transmission substation
    Transmission,
    /// New HV substation fed from a high-voltage line
    HighVoltage,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 4] = [
        ConnectionType::ExistingMv,
        ConnectionType::Distribution,
        ConnectionType::Transmission,
        ConnectionType::HighVoltage,
    ];

    /// Position in the tie-break order (lower is preferred)
    pub fn rank(self) -> u8 {
        match self {
            ConnectionType::ExistingMv => 0,
            ConnectionType::Distribution => 1,
            ConnectionType::Transmission => 2,
            ConnectionType::HighVoltage => 3,
        }
    }

    pub fn voltage_class(self) -> VoltageClass {
        match self {
            ConnectionType::ExistingMv
            | ConnectionType::Distribution
            | ConnectionType::Transmission => VoltageClass::Medium,
            ConnectionType::HighVoltage => VoltageClass::High,
        }
    }

    /// Whether the connection needs a new cable run from a remote site
    pub fn needs_cable(self) -> bool {
        match self {
            ConnectionType::ExistingMv => false,
            ConnectionType::Distribution
            | ConnectionType::Transmission
            | ConnectionType::HighVoltage => true,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionType::ExistingMv => "ExistingMV",
            ConnectionType::Distribution => "Distribution",
            ConnectionType::Transmission => "Transmission",
            ConnectionType::HighVoltage => "HV",
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Voltage class of a connection, selecting cable parameters and fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageClass {
    /// Hub-internal low voltage (400 V)
    Low,
    /// Medium voltage (20 kV)
    Medium,
    /// High voltage (110 kV)
    High,
}

impl std::fmt::Display for VoltageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoltageClass::Low => f.write_str("LV"),
            VoltageClass::Medium => f.write_str("MV"),
            VoltageClass::High => f.write_str("HV"),
        }
    }
}

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
