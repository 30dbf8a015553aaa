//! Connection candidate generation.
//!
//! Every run sees exactly one [`ConnectionCandidate`] per [`ConnectionType`].
//! Nothing is filtered for capacity here: a candidate that cannot carry the
//! peak stays in the set and the optimizer rules it out, so a run can report
//! "no feasible connection" instead of silently returning an empty choice.
//!
//! Distances come from a [`DistanceProvider`]. A provider that finds no site
//! of a kind within its search radius reports the candidate as unavailable,
//! and the optimizer pins its selector to zero.

use hubgrid_core::{
    ConnectionType, Coordinates, Diagnostics, DistanceSource, Euros, GridSite, HubGridConfig,
    Kilowatts, ManualDistances, Meters, VoltageClass,
};
use serde::Serialize;
use thiserror::Error;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS: Meters = Meters(6_371_000.0);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CandidateError {
    #[error("invalid distance for {kind}: {value} m")]
    InvalidDistance { kind: ConnectionType, value: f64 },

    #[error("nearest-site lookup needs the hub position")]
    MissingHubPosition,
}

/// One way of connecting the hub, with its cost structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionCandidate {
    pub kind: ConnectionType,
    pub capacity_limit: Kilowatts,
    pub expansion_max: Kilowatts,
    pub expansion_fixed_cost: Euros,
    pub fixed_cost: Euros,
    pub capacity_fee_per_kw: Euros,
    /// Route length of the connection cable; `None` marks the candidate unavailable
    pub distance: Option<Meters>,
}

impl ConnectionCandidate {
    pub fn is_available(&self) -> bool {
        self.distance.is_some()
    }

    pub fn voltage_class(&self) -> VoltageClass {
        self.kind.voltage_class()
    }

    /// Capacity with the largest permitted expansion
    pub fn max_capacity(&self) -> Kilowatts {
        self.capacity_limit + self.expansion_max
    }

    pub fn can_expand(&self) -> bool {
        self.expansion_max > Kilowatts::ZERO
    }
}

/// Source of route lengths from the hub to the nearest site of each kind.
pub trait DistanceProvider {
    /// `Ok(None)` when no site of this kind is reachable.
    fn distance(&self, kind: ConnectionType) -> Result<Option<Meters>, CandidateError>;
}

impl DistanceProvider for ManualDistances {
    fn distance(&self, kind: ConnectionType) -> Result<Option<Meters>, CandidateError> {
        let value = match kind {
            ConnectionType::ExistingMv => Some(Meters::ZERO),
            ConnectionType::Distribution => self.distribution,
            ConnectionType::Transmission => self.transmission,
            ConnectionType::HighVoltage => self.high_voltage,
        };
        match value {
            Some(d) if !d.is_finite() || d < Meters::ZERO => Err(CandidateError::InvalidDistance {
                kind,
                value: d.value(),
            }),
            other => Ok(other),
        }
    }
}

/// Great-circle distance to the closest known site of each kind.
#[derive(Debug, Clone)]
pub struct NearestSite<'a> {
    pub hub: Coordinates,
    pub sites: &'a [GridSite],
    pub search_radius: Meters,
}

impl DistanceProvider for NearestSite<'_> {
    fn distance(&self, kind: ConnectionType) -> Result<Option<Meters>, CandidateError> {
        if !kind.needs_cable() {
            return Ok(Some(Meters::ZERO));
        }
        let nearest = self
            .sites
            .iter()
            .filter(|site| site.kind == kind)
            .map(|site| haversine(self.hub, site.position))
            .fold(None, |best: Option<Meters>, d| {
                Some(best.map_or(d, |b| b.min(d)))
            });
        Ok(nearest.filter(|d| *d <= self.search_radius))
    }
}

/// Haversine distance between two WGS84 points.
pub fn haversine(a: Coordinates, b: Coordinates) -> Meters {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS * (2.0 * h.sqrt().atan2((1.0 - h).sqrt()))
}

/// Candidates of one run plus the issues met while building them.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub candidates: Vec<ConnectionCandidate>,
    pub diagnostics: Diagnostics,
}

impl CandidateSet {
    pub fn get(&self, kind: ConnectionType) -> Option<&ConnectionCandidate> {
        self.candidates.iter().find(|c| c.kind == kind)
    }

    pub fn available(&self) -> impl Iterator<Item = &ConnectionCandidate> {
        self.candidates.iter().filter(|c| c.is_available())
    }
}

/// Build one candidate per connection type.
pub fn generate_candidates(
    config: &HubGridConfig,
    distances: &dyn DistanceProvider,
) -> Result<CandidateSet, CandidateError> {
    let mut diagnostics = Diagnostics::new();
    let mut candidates = Vec::with_capacity(ConnectionType::ALL.len());

    for kind in ConnectionType::ALL {
        let tariff = config.grid.tariff(kind);
        let distance = if config.distances.unavailable.contains(&kind) {
            None
        } else {
            distances.distance(kind)?
        };
        if distance.is_none() {
            diagnostics.add_warning_with_entity(
                "candidate",
                "no connection site within search radius",
                kind.label(),
            );
        }
        candidates.push(ConnectionCandidate {
            kind,
            capacity_limit: tariff.capacity_limit,
            expansion_max: tariff.expansion_max,
            expansion_fixed_cost: tariff.expansion_fixed_cost,
            fixed_cost: tariff.fixed_cost,
            capacity_fee_per_kw: tariff.capacity_fee_per_kw,
            distance,
        });
    }

    Ok(CandidateSet {
        candidates,
        diagnostics,
    })
}

/// Build candidates using the distance source named in the configuration.
pub fn candidates_from_config(config: &HubGridConfig) -> Result<CandidateSet, CandidateError> {
    match config.distances.source {
        DistanceSource::Manual => generate_candidates(config, &config.distances.manual),
        DistanceSource::Nearest => {
            let hub = config
                .distances
                .hub_position
                .ok_or(CandidateError::MissingHubPosition)?;
            let provider = NearestSite {
                hub,
                sites: &config.distances.sites,
                search_radius: config.distances.search_radius,
            };
            generate_candidates(config, &provider)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(kind: ConnectionType, latitude: f64, longitude: f64) -> GridSite {
        GridSite {
            kind,
            name: None,
            position: Coordinates {
                latitude,
                longitude,
            },
        }
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let a = Coordinates {
            latitude: 51.0,
            longitude: 6.6,
        };
        let b = Coordinates {
            latitude: 52.0,
            longitude: 6.6,
        };
        // 6371 km · π / 180
        assert!((haversine(a, b).value() - 111_194.93).abs() < 1.0);
        assert_eq!(haversine(a, a), Meters(0.0));
    }

    #[test]
    fn test_default_manual_distances() {
        let set = candidates_from_config(&HubGridConfig::default()).unwrap();
        assert_eq!(set.candidates.len(), 4);
        assert_eq!(
            set.get(ConnectionType::ExistingMv).unwrap().distance,
            Some(Meters(0.0))
        );
        assert_eq!(
            set.get(ConnectionType::Distribution).unwrap().distance,
            Some(Meters(10.0))
        );
        assert!(!set.get(ConnectionType::Transmission).unwrap().is_available());
        assert!(!set.get(ConnectionType::HighVoltage).unwrap().is_available());
        assert_eq!(set.available().count(), 2);
        assert_eq!(set.diagnostics.warning_count(), 2);
    }

    #[test]
    fn test_tariffs_copied_into_candidates() {
        let set = candidates_from_config(&HubGridConfig::default()).unwrap();
        let dist = set.get(ConnectionType::Distribution).unwrap();
        assert_eq!(dist.max_capacity(), Kilowatts(40_000.0));
        assert!(dist.can_expand());
        let hv = set.get(ConnectionType::HighVoltage).unwrap();
        assert_eq!(hv.fixed_cost, Euros(2_500_000.0));
        assert_eq!(hv.capacity_fee_per_kw, Euros(111.14));
        assert!(!hv.can_expand());
    }

    #[test]
    fn test_nearest_site_respects_radius() {
        let mut config = HubGridConfig::default();
        config.distances.source = DistanceSource::Nearest;
        config.distances.hub_position = Some(Coordinates {
            latitude: 51.12994,
            longitude: 6.60414,
        });
        config.distances.search_radius = Meters(5_000.0);
        config.distances.sites = vec![
            site(ConnectionType::Distribution, 51.14, 6.60414),
            site(ConnectionType::Distribution, 51.20, 6.60414),
            site(ConnectionType::Transmission, 51.40, 6.60414),
        ];

        let set = candidates_from_config(&config).unwrap();
        let dist = set.get(ConnectionType::Distribution).unwrap().distance.unwrap();
        assert!((dist.value() - 1_118.6).abs() < 5.0);
        assert!(!set.get(ConnectionType::Transmission).unwrap().is_available());
        assert!(!set.get(ConnectionType::HighVoltage).unwrap().is_available());
        assert!(set.get(ConnectionType::ExistingMv).unwrap().is_available());
    }

    #[test]
    fn test_explicit_unavailable_overrides_distance() {
        let mut config = HubGridConfig::default();
        config.distances.unavailable = vec![ConnectionType::ExistingMv];
        let set = candidates_from_config(&config).unwrap();
        assert!(!set.get(ConnectionType::ExistingMv).unwrap().is_available());
    }

    #[test]
    fn test_nearest_without_hub_position() {
        let mut config = HubGridConfig::default();
        config.distances.source = DistanceSource::Nearest;
        assert_eq!(
            candidates_from_config(&config).unwrap_err(),
            CandidateError::MissingHubPosition
        );
    }

    #[test]
    fn test_negative_manual_distance_rejected() {
        let mut config = HubGridConfig::default();
        config.distances.manual.distribution = Some(Meters(-3.0));
        assert!(matches!(
            candidates_from_config(&config),
            Err(CandidateError::InvalidDistance {
                kind: ConnectionType::Distribution,
                ..
            })
        ));
    }
}
