//! Time-resolved demand profile of a charging hub.
//!
//! A profile is a fixed-resolution series of aggregate power draws, usually
//! one representative week at 15-minute steps (672 points). It is validated
//! once on construction and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{HubGridError, HubGridResult};
use crate::units::{Hours, KilowattHours, Kilowatts};

/// One sample of the demand profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    /// Offset from the start of the horizon in minutes
    pub offset_minutes: u32,
    /// Aggregate hub demand during the step starting at `offset_minutes`
    pub power: Kilowatts,
}

/// Validated demand profile.
///
/// Invariants: at least one point, strictly increasing offsets with a
/// uniform step, finite non-negative power.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandProfile {
    points: Vec<DemandPoint>,
    step_minutes: u32,
}

/// Peak/energy statistics of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DemandSummary {
    pub peak: Kilowatts,
    pub mean: Kilowatts,
    pub energy: KilowattHours,
    pub duration: Hours,
    pub steps: usize,
}

impl DemandProfile {
    /// Build a profile from explicit points.
    ///
    /// A single-point profile has no observable step; pass it through
    /// [`DemandProfile::uniform`] to state the resolution explicitly.
    pub fn new(points: Vec<DemandPoint>) -> HubGridResult<Self> {
        let step_minutes = match points.as_slice() {
            [] => return Err(HubGridError::Profile("profile has no points".into())),
            [_] => 15,
            [first, second, ..] => second.offset_minutes.saturating_sub(first.offset_minutes),
        };
        Self::with_step(points, step_minutes)
    }

    /// Build a profile from powers sampled every `step_minutes`, starting at 0.
    pub fn uniform(step_minutes: u32, powers: &[Kilowatts]) -> HubGridResult<Self> {
        let points = powers
            .iter()
            .enumerate()
            .map(|(i, &power)| DemandPoint {
                offset_minutes: i as u32 * step_minutes,
                power,
            })
            .collect();
        Self::with_step(points, step_minutes)
    }

    fn with_step(points: Vec<DemandPoint>, step_minutes: u32) -> HubGridResult<Self> {
        if points.is_empty() {
            return Err(HubGridError::Profile("profile has no points".into()));
        }
        if step_minutes == 0 {
            return Err(HubGridError::Profile(
                "step size must be positive and offsets strictly increasing".into(),
            ));
        }
        for (i, pair) in points.windows(2).enumerate() {
            let delta = pair[1].offset_minutes as i64 - pair[0].offset_minutes as i64;
            if delta <= 0 {
                return Err(HubGridError::Profile(format!(
                    "offsets not strictly increasing at index {}",
                    i + 1
                )));
            }
            if delta != step_minutes as i64 {
                return Err(HubGridError::Profile(format!(
                    "non-uniform step at index {}: {} min instead of {} min",
                    i + 1,
                    delta,
                    step_minutes
                )));
            }
        }
        if let Some((i, p)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| !p.power.is_finite() || p.power < Kilowatts::ZERO)
        {
            return Err(HubGridError::Profile(format!(
                "power at offset {} min (index {}) must be finite and non-negative, got {}",
                p.offset_minutes, i, p.power.0
            )));
        }
        Ok(Self {
            points,
            step_minutes,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    /// Length of one step in hours
    pub fn step(&self) -> Hours {
        Hours::from_minutes(self.step_minutes)
    }

    /// Power values in chronological order
    pub fn powers(&self) -> Vec<Kilowatts> {
        self.points.iter().map(|p| p.power).collect()
    }

    pub fn peak(&self) -> Kilowatts {
        self.points
            .iter()
            .map(|p| p.power)
            .fold(Kilowatts::ZERO, Kilowatts::max)
    }

    pub fn energy(&self) -> KilowattHours {
        self.points.iter().map(|p| p.power).sum::<Kilowatts>() * self.step()
    }

    pub fn summary(&self) -> DemandSummary {
        let steps = self.len();
        let duration = self.step() * steps as f64;
        let energy = self.energy();
        DemandSummary {
            peak: self.peak(),
            mean: energy / duration,
            energy,
            duration,
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(values: &[f64]) -> Vec<Kilowatts> {
        values.iter().copied().map(Kilowatts).collect()
    }

    #[test]
    fn test_week_at_quarter_hours() {
        let profile = DemandProfile::uniform(15, &vec![Kilowatts(500.0); 672]).unwrap();
        let summary = profile.summary();
        assert_eq!(summary.steps, 672);
        assert_eq!(summary.duration, Hours(168.0));
        assert_eq!(summary.peak, Kilowatts(500.0));
        assert!((summary.energy.value() - 500.0 * 168.0).abs() < 1e-6);
        assert!((summary.mean.value() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_uniform_step() {
        let points = vec![
            DemandPoint { offset_minutes: 0, power: Kilowatts(1.0) },
            DemandPoint { offset_minutes: 15, power: Kilowatts(1.0) },
            DemandPoint { offset_minutes: 45, power: Kilowatts(1.0) },
        ];
        let err = DemandProfile::new(points).unwrap_err();
        assert!(err.to_string().contains("non-uniform step"));
    }

    #[test]
    fn test_rejects_decreasing_offsets() {
        let points = vec![
            DemandPoint { offset_minutes: 15, power: Kilowatts(1.0) },
            DemandPoint { offset_minutes: 0, power: Kilowatts(1.0) },
        ];
        assert!(matches!(
            DemandProfile::new(points),
            Err(HubGridError::Profile(_))
        ));
    }

    #[test]
    fn test_rejects_negative_and_nan_power() {
        assert!(DemandProfile::uniform(15, &kw(&[1.0, -0.5])).is_err());
        assert!(DemandProfile::uniform(15, &kw(&[f64::NAN])).is_err());
        assert!(DemandProfile::uniform(15, &[]).is_err());
    }

    #[test]
    fn test_offsets_need_not_start_at_zero() {
        let points = vec![
            DemandPoint { offset_minutes: 60, power: Kilowatts(2.0) },
            DemandPoint { offset_minutes: 90, power: Kilowatts(4.0) },
        ];
        let profile = DemandProfile::new(points).unwrap();
        assert_eq!(profile.step_minutes(), 30);
        assert_eq!(profile.energy(), KilowattHours(3.0));
    }
}
