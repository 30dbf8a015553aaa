//! Compile-time unit safety for hub planning quantities.
//!
//! Prevents mixing incompatible units like kW and kWh, or a fraction and a
//! percentage.
//!
//! # Design Philosophy
//!
//! Grid connection planning mixes many physical and economic quantities:
//! - Power (kW) and energy (kWh), tied together by a time step (h)
//! - Cable geometry (m, mm²) and electrical ratings (V, A)
//! - Money (EUR) and dimensionless shares (SOC bounds, efficiency)
//!
//! Using raw `f64` values throughout makes it easy to add a kWh to a kW or
//! to feed a percentage where a fraction is expected. The newtypes below turn
//! those mistakes into compile errors.
//!
//! # Zero Runtime Overhead
//!
//! All types use `#[repr(transparent)]` and serialize as plain numbers.
//!
//! # Usage
//!
//! ```
//! use hubgrid_core::units::{Hours, KilowattHours, Kilowatts};
//!
//! let p = Kilowatts(400.0);
//! let e: KilowattHours = p * Hours(0.25);
//! assert_eq!(e.value(), 100.0);
//!
//! // This would NOT compile - different units
//! // let wrong = p + e;
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal, $precision:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $type {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.*} {}", $precision, self.0, $unit_name)
            }
        }

        impl $type {
            /// Zero of this unit
            pub const ZERO: Self = Self(0.0);

            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Minimum of two values
            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// Clamp value to range
            #[inline]
            pub fn clamp(self, min: Self, max: Self) -> Self {
                Self(self.0.clamp(min.0, max.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Power and Energy
// =============================================================================

/// Active power in kilowatts (kW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilowatts(pub f64);

impl_unit_ops!(Kilowatts, "kW", 2);

/// Energy in kilowatt-hours (kWh)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KilowattHours(pub f64);

impl_unit_ops!(KilowattHours, "kWh", 2);

/// Duration in hours (h)
///
/// Used as the length of one profile step when converting between power and
/// energy.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hours(pub f64);

impl_unit_ops!(Hours, "h", 4);

impl Mul<Hours> for Kilowatts {
    type Output = KilowattHours;
    fn mul(self, rhs: Hours) -> Self::Output {
        KilowattHours(self.0 * rhs.0)
    }
}

impl Div<Hours> for KilowattHours {
    type Output = Kilowatts;
    fn div(self, rhs: Hours) -> Self::Output {
        Kilowatts(self.0 / rhs.0)
    }
}

impl Hours {
    /// Convert a whole number of minutes to hours
    #[inline]
    pub fn from_minutes(minutes: u32) -> Self {
        Hours(f64::from(minutes) / 60.0)
    }
}

// =============================================================================
// Electrical Ratings
// =============================================================================

/// Line-to-line voltage in volts (V)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Volts(pub f64);

impl_unit_ops!(Volts, "V", 1);

/// Current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A", 2);

// =============================================================================
// Geometry
// =============================================================================

/// Length in meters (m)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Meters(pub f64);

impl_unit_ops!(Meters, "m", 1);

/// Conductor cross-section in square millimeters (mm²)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SquareMillimeters(pub f64);

impl_unit_ops!(SquareMillimeters, "mm²", 0);

// =============================================================================
// Money and Shares
// =============================================================================

/// Money in euros (EUR)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Euros(pub f64);

impl_unit_ops!(Euros, "EUR", 2);

impl Euros {
    /// Round to whole cents
    #[inline]
    pub fn to_cents(self) -> Self {
        Euros((self.0 * 100.0).round() / 100.0)
    }

    /// Whether two amounts agree within `tolerance`
    #[inline]
    pub fn approx_eq(self, other: Self, tolerance: Euros) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }
}

/// Dimensionless share in `[0, 1]` (efficiency, SOC bounds, voltage-drop limits)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Fraction(pub f64);

impl_unit_ops!(Fraction, "", 4);

impl Fraction {
    /// One (100 %)
    pub const ONE: Self = Self(1.0);

    /// Build from a percentage value (e.g. `3.0` for 3 %)
    #[inline]
    pub fn from_percent(percent: f64) -> Self {
        Fraction(percent / 100.0)
    }

    /// Express as a percentage
    #[inline]
    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }

    /// True when the share lies within `[0, 1]`
    #[inline]
    pub fn is_unit_interval(self) -> bool {
        (0.0..=1.0).contains(&self.0)
    }
}

impl Mul<KilowattHours> for Fraction {
    type Output = KilowattHours;
    fn mul(self, rhs: KilowattHours) -> Self::Output {
        KilowattHours(self.0 * rhs.0)
    }
}

impl Mul<Kilowatts> for Fraction {
    type Output = Kilowatts;
    fn mul(self, rhs: Kilowatts) -> Self::Output {
        Kilowatts(self.0 * rhs.0)
    }
}

impl Mul<Volts> for Fraction {
    type Output = Volts;
    fn mul(self, rhs: Volts) -> Self::Output {
        Volts(self.0 * rhs.0)
    }
}
